//! Property-Based Tests for Graph Composition
//!
//! Verifies the invariants the composition layer promises for all inputs:
//!
//! - Pairing two distinct groups always yields exactly one rule per side,
//!   and repeating the identical pairing never adds resources
//! - Bootstrap payloads keep one line per declared variable, in order
//! - Threshold wiring registers four resources or none

use proptest::prelude::*;
use serde_json::json;

use topology_composer::compose::{
    pair_security_groups, wire_thresholds, BootstrapBuilder, GroupEndpoint, MetricRef, PortRange,
    ThresholdScalingConfig,
};
use topology_composer::resources::ec2::SecurityGroup;
use topology_composer::resources::sqs::Queue;
use topology_composer::template::{ResourceId, Value};
use topology_composer::Topology;

/// Lower-camel-case labels of the kind tier builders produce.
fn label() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{1,12}"
}

fn add_group(topology: &mut Topology, name: &str) -> ResourceId {
    topology
        .add_resource(
            name,
            &SecurityGroup::new("property test group", Value::reference("vpcId")),
        )
        .unwrap()
}

proptest! {
    /// Distinct-group pairing always creates exactly one egress and one
    /// ingress rule with ports rendered from the given range.
    #[test]
    fn pairing_creates_exactly_one_rule_per_side(
        (source_label, dest_label) in (label(), label())
            .prop_filter("labels must differ", |(a, b)| a != b),
        from in 1u16..=60000,
        span in 0u16..=400,
    ) {
        let mut topology = Topology::new();
        let source = add_group(&mut topology, &format!("{source_label}SecurityGroup"));
        let dest = add_group(&mut topology, &format!("{dest_label}SecurityGroup"));
        let before = topology.resource_count();

        pair_security_groups(
            &mut topology,
            Some(&GroupEndpoint::group(&source_label, &source)),
            Some(&GroupEndpoint::group(&dest_label, &dest)),
            PortRange::new(from, from + span),
        )
        .unwrap();

        prop_assert_eq!(topology.resource_count(), before + 2);
        prop_assert_eq!(
            topology.resources_of_kind("AWS::EC2::SecurityGroupEgress").count(),
            1
        );
        prop_assert_eq!(
            topology.resources_of_kind("AWS::EC2::SecurityGroupIngress").count(),
            1
        );

        let (_, egress) = topology
            .resources_of_kind("AWS::EC2::SecurityGroupEgress")
            .next()
            .unwrap();
        prop_assert_eq!(&egress.properties()["FromPort"], &json!(from.to_string()));
        prop_assert_eq!(&egress.properties()["ToPort"], &json!((from + span).to_string()));
    }

    /// Repeating an identical pairing is idempotent.
    #[test]
    fn repeated_pairing_adds_no_resources(
        (source_label, dest_label) in (label(), label())
            .prop_filter("labels must differ", |(a, b)| a != b),
        port in 1u16..=65535,
        repeats in 1usize..5,
    ) {
        let mut topology = Topology::new();
        let source = add_group(&mut topology, &format!("{source_label}SecurityGroup"));
        let dest = add_group(&mut topology, &format!("{dest_label}SecurityGroup"));
        let source_endpoint = GroupEndpoint::group(&source_label, &source);
        let dest_endpoint = GroupEndpoint::group(&dest_label, &dest);

        pair_security_groups(&mut topology, Some(&source_endpoint), Some(&dest_endpoint), port)
            .unwrap();
        let after_first = topology.resource_count();

        for _ in 0..repeats {
            pair_security_groups(
                &mut topology,
                Some(&source_endpoint),
                Some(&dest_endpoint),
                port,
            )
            .unwrap();
        }
        prop_assert_eq!(topology.resource_count(), after_first);
    }

    /// A bootstrap payload holds the shebang plus one line per declared
    /// variable, in declaration order.
    #[test]
    fn bootstrap_payload_keeps_one_ordered_line_per_variable(
        keys in proptest::collection::hash_set("[A-Z][A-Z0-9_]{1,16}", 1..12),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let mut builder = BootstrapBuilder::for_tier("worker");
        for (index, key) in keys.iter().enumerate() {
            builder = builder.var(key, index.to_string()).unwrap();
        }

        let payload = serde_json::to_value(builder.into_user_data()).unwrap();
        let lines = payload["Fn::Base64"]["Fn::Join"][1].as_array().unwrap();
        prop_assert_eq!(lines.len(), keys.len() + 1);
        prop_assert_eq!(&lines[0], &json!("#!/bin/bash"));
        for (index, key) in keys.iter().enumerate() {
            prop_assert_eq!(
                &lines[index + 1],
                &json!({"Fn::Join": ["=", [key, index.to_string()]]})
            );
        }
    }

    /// Threshold wiring is atomic: four resources for a valid threshold
    /// pair, zero for an invalid one.
    #[test]
    fn threshold_wiring_registers_four_resources_or_none(
        high in -10000i64..10000,
        low in -10000i64..10000,
    ) {
        let mut topology = Topology::new();
        let queue = topology.add_resource("loggingQueue", &Queue::new()).unwrap();
        let group = topology.add_resource("workerGroup", &Queue::new()).unwrap();
        let before = topology.resource_count();

        let result = wire_thresholds(
            &mut topology,
            "worker",
            &group,
            &MetricRef::queue_depth(&queue),
            ThresholdScalingConfig::for_thresholds(high, low),
        );

        if high > low {
            prop_assert!(result.is_ok());
            prop_assert_eq!(topology.resource_count(), before + 4);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(topology.resource_count(), before);
        }
    }
}
