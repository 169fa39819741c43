//! Integration tests for topology composition
//!
//! These tests exercise the complete flow through the public API:
//! 1. Declare network surroundings → build tiers → pair groups
//! 2. Wire threshold autoscaling to a queue-depth metric
//! 3. Serialize the validated graph to the provider template form

use pretty_assertions::assert_eq;
use serde_json::json;

use topology_composer::compose::tier::{AsgSpec, InstanceType, MaxSize};
use topology_composer::compose::{
    pair_security_groups, wire_thresholds, GroupEndpoint, MetricRef, PortRange,
    ThresholdScalingConfig, REGION_AMI_MAPPING,
};
use topology_composer::resources::sqs::Queue;
use topology_composer::template::{Output, Parameter, Value};
use topology_composer::{ComposeError, NetworkContext, TierBuilder, Topology};

fn network(topology: &mut Topology) -> NetworkContext {
    NetworkContext::from_parameters(topology, "10.0.0.0/16").unwrap()
}

// ============================================================================
// Queue-scaled worker tier scenario
// ============================================================================

/// A queue-consuming tier scaled on queue depth registers exactly two
/// scaling policies and two alarms, with the documented deltas and cooldown.
#[test]
fn queue_scaled_tier_wires_two_policies_and_two_alarms() {
    let mut topology = Topology::new();
    let network = network(&mut topology);
    topology
        .add_mapping(REGION_AMI_MAPPING, json!({"us-west-2": {"worker": "ami-1234"}}))
        .unwrap();
    let queue = topology.add_resource("loggingQueue", &Queue::new()).unwrap();

    let mut builder = TierBuilder::new(&mut topology, &network, "worker");
    let group = builder
        .create_asg(AsgSpec {
            ami_name: "worker".to_string(),
            instance_type: InstanceType::default("c3.large"),
            security_groups: vec![],
            instance_profile: None,
            user_data: None,
            min_size: 1,
            max_size: MaxSize::Literal(4),
            load_balancer: None,
            instance_monitoring: true,
            root_volume_type: "gp2".to_string(),
            custom_tags: vec![],
        })
        .unwrap();

    let handles = wire_thresholds(
        &mut topology,
        "worker",
        &group,
        &MetricRef::queue_depth(&queue),
        ThresholdScalingConfig::for_thresholds(10000, 1000),
    )
    .unwrap();

    assert_eq!(
        topology
            .resources_of_kind("AWS::AutoScaling::ScalingPolicy")
            .count(),
        2
    );
    assert_eq!(
        topology.resources_of_kind("AWS::CloudWatch::Alarm").count(),
        2
    );

    let up = topology.resource(handles.scale_up_policy.name()).unwrap();
    assert_eq!(up.properties()["ScalingAdjustment"], json!("2"));
    assert_eq!(up.properties()["Cooldown"], json!("600"));
    let down = topology.resource(handles.scale_down_policy.name()).unwrap();
    assert_eq!(down.properties()["ScalingAdjustment"], json!("-1"));

    let high = topology.resource("workerHighAlarm").unwrap();
    assert_eq!(high.properties()["Namespace"], json!("AWS/SQS"));
    assert_eq!(
        high.properties()["MetricName"],
        json!("ApproximateNumberOfMessagesVisible")
    );
    assert_eq!(
        high.properties()["Dimensions"],
        json!([{"Name": "QueueName", "Value": {"Ref": "loggingQueue"}}])
    );

    // The whole graph still serializes
    assert!(topology.to_json().is_ok());
}

// ============================================================================
// Reciprocal pairing scenario
// ============================================================================

/// Pairing a frontend tier against a backing tier's balancer yields exactly
/// one egress on the frontend side and one ingress on the backing side, and
/// no reverse-direction rules.
#[test]
fn frontend_to_backing_pairing_is_directional() {
    let mut topology = Topology::new();
    let net = network(&mut topology);

    let mut frontend = TierBuilder::new(&mut topology, &net, "frontend");
    let frontend_sg = frontend
        .instance_security_group("Frontend instances", vec![])
        .unwrap();
    let mut backing = TierBuilder::new(&mut topology, &net, "backing");
    let backing_elb_sg = backing
        .elb_security_group("Backing balancer", vec![])
        .unwrap();

    pair_security_groups(
        &mut topology,
        Some(&GroupEndpoint::group("frontendInstance", &frontend_sg)),
        Some(&GroupEndpoint::group("backingElb", &backing_elb_sg)),
        9200,
    )
    .unwrap();

    let egress = topology
        .resource("frontendInstanceToBackingElbEgress9200")
        .unwrap();
    assert_eq!(
        egress.properties()["GroupId"],
        json!({"Ref": "frontendInstanceSecurityGroup"})
    );
    assert_eq!(
        egress.properties()["DestinationSecurityGroupId"],
        json!({"Ref": "backingElbSecurityGroup"})
    );
    let ingress = topology
        .resource("frontendInstanceToBackingElbIngress9200")
        .unwrap();
    assert_eq!(
        ingress.properties()["GroupId"],
        json!({"Ref": "backingElbSecurityGroup"})
    );

    assert!(topology
        .resource("backingElbToFrontendInstanceEgress9200")
        .is_none());
    assert!(topology
        .resource("backingElbToFrontendInstanceIngress9200")
        .is_none());
}

/// A port span pairing names its rules with the range suffix.
#[test]
fn range_pairing_uses_span_suffix_in_rule_names() {
    let mut topology = Topology::new();
    let net = network(&mut topology);
    let mut tier = TierBuilder::new(&mut topology, &net, "cluster");
    let sg = tier.instance_security_group("Cluster instances", vec![]).unwrap();
    let endpoint = GroupEndpoint::group("clusterInstance", &sg);

    pair_security_groups(
        &mut topology,
        Some(&endpoint),
        Some(&endpoint),
        PortRange::new(9200, 9400),
    )
    .unwrap();

    let ingress = topology
        .resource("clusterInstanceSelfIngress9200To9400")
        .unwrap();
    assert_eq!(ingress.properties()["FromPort"], json!("9200"));
    assert_eq!(ingress.properties()["ToPort"], json!("9400"));
}

// ============================================================================
// Cross-stack embedding scenario
// ============================================================================

/// A child topology's outputs are reachable only after it is embedded, and
/// only the outputs it actually declares resolve.
#[test]
fn child_outputs_reachable_only_after_embedding() {
    let mut child = Topology::new();
    let queue = child.add_resource("loggingQueue", &Queue::new()).unwrap();
    child
        .add_output(Output::new("logShipperQueueName", queue.get_att("QueueName")))
        .unwrap();

    let mut parent = Topology::new();
    assert!(parent.child_output("loggingStack", "logShipperQueueName").is_err());

    let stack = parent
        .embed_child(
            "loggingStack",
            &child,
            Value::from("https://bucket.example/templates/logging.json"),
            vec![("vpcId".to_string(), Value::reference("vpcId"))],
        )
        .unwrap();

    let value = parent
        .child_output(stack.name(), "logShipperQueueName")
        .unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({"Fn::GetAtt": ["loggingStack", "Outputs.logShipperQueueName"]})
    );

    let err = parent
        .child_output(stack.name(), "unknownOutput")
        .unwrap_err();
    assert!(matches!(err, ComposeError::ReferenceResolution { ref name, .. }
        if name == "unknownOutput"));
}

/// Importing the same parameter declaration twice reuses it; a conflicting
/// redeclaration is rejected.
#[test]
fn imported_parameters_are_deduplicated_by_declaration() {
    let mut topology = Topology::new();
    let declaration =
        || Parameter::string("bastionSecurityGroup").description("ID of the Bastion Host security group.");
    let first = topology.import_parameter(declaration()).unwrap();
    let second = topology.import_parameter(declaration()).unwrap();
    assert_eq!(first.name(), second.name());

    let err = topology
        .import_parameter(Parameter::number("bastionSecurityGroup"))
        .unwrap_err();
    assert!(matches!(err, ComposeError::DeclarationMismatch { kind: "parameter", .. }));
}

// ============================================================================
// Serialization gate
// ============================================================================

/// Serialization is all-or-nothing: one dangling reference anywhere in the
/// graph fails the whole emission.
#[test]
fn dangling_reference_blocks_all_output() {
    let mut topology = Topology::new();
    topology.add_resource("loggingQueue", &Queue::new()).unwrap();
    topology
        .add_output(Output::new("queueUrl", Value::reference("missingQueue")))
        .unwrap();

    let err = topology.to_json().unwrap_err();
    assert!(matches!(err, ComposeError::ReferenceResolution { ref name, .. }
        if name == "missingQueue"));
    assert!(topology.to_json_string().is_err());
}

/// Registration order is template order for every section.
#[test]
fn template_sections_preserve_registration_order() {
    let mut topology = Topology::new();
    topology.add_parameter(Parameter::string("zeta")).unwrap();
    topology.add_parameter(Parameter::string("alpha")).unwrap();
    topology.add_resource("secondQueue", &Queue::new()).unwrap();
    topology.add_resource("firstQueue", &Queue::new()).unwrap();

    let json = topology.to_json().unwrap();
    let parameters: Vec<&String> = json["Parameters"].as_object().unwrap().keys().collect();
    assert_eq!(parameters, ["zeta", "alpha"]);
    let resources: Vec<&String> = json["Resources"].as_object().unwrap().keys().collect();
    assert_eq!(resources, ["secondQueue", "firstQueue"]);
}
