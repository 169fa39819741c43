//! Launch configuration, autoscaling group and scaling policy resources

use serde::Serialize;

use crate::template::{ResourceProperties, Value};

/// EBS settings for a block device mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ebs {
    volume_type: String,
}

/// Block device mapping for the launch configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockDeviceMapping {
    device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ebs: Option<Ebs>,
}

impl BlockDeviceMapping {
    /// Root volume mapping with the configured volume type.
    pub fn root_volume(volume_type: impl Into<String>) -> Self {
        Self {
            device_name: "/dev/sda1".to_string(),
            ebs: Some(Ebs {
                volume_type: volume_type.into(),
            }),
        }
    }
}

/// Launch configuration for a tier's instances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LaunchConfiguration {
    image_id: Value,
    instance_type: Value,
    security_groups: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iam_instance_profile: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<Value>,
    instance_monitoring: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    block_device_mappings: Vec<BlockDeviceMapping>,
}

impl LaunchConfiguration {
    pub fn new(image_id: Value, instance_type: Value, security_groups: Vec<Value>) -> Self {
        Self {
            image_id,
            instance_type,
            security_groups,
            iam_instance_profile: None,
            user_data: None,
            instance_monitoring: false,
            block_device_mappings: Vec::new(),
        }
    }

    pub fn iam_instance_profile(mut self, profile: Value) -> Self {
        self.iam_instance_profile = Some(profile);
        self
    }

    pub fn user_data(mut self, payload: Value) -> Self {
        self.user_data = Some(payload);
        self
    }

    pub fn instance_monitoring(mut self, enabled: bool) -> Self {
        self.instance_monitoring = enabled;
        self
    }

    pub fn block_device_mapping(mut self, mapping: BlockDeviceMapping) -> Self {
        self.block_device_mappings.push(mapping);
        self
    }
}

impl ResourceProperties for LaunchConfiguration {
    const KIND: &'static str = "AWS::AutoScaling::LaunchConfiguration";
}

/// Autoscaling group tag, optionally propagated to launched instances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    key: String,
    value: String,
    propagate_at_launch: bool,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>, propagate_at_launch: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            propagate_at_launch,
        }
    }
}

/// Autoscaling group bound to a launch configuration.
///
/// `max_size` may be a literal or a deferred parameter reference; literal
/// min/max consistency is validated by the tier builder before this struct
/// is ever constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingGroup {
    #[serde(rename = "VPCZoneIdentifier")]
    vpc_zone_identifier: Value,
    launch_configuration_name: Value,
    min_size: String,
    max_size: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    load_balancer_names: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
}

impl AutoScalingGroup {
    pub fn new(
        vpc_zone_identifier: Value,
        launch_configuration: Value,
        min_size: u32,
        max_size: Value,
    ) -> Self {
        Self {
            vpc_zone_identifier,
            launch_configuration_name: launch_configuration,
            min_size: min_size.to_string(),
            max_size,
            load_balancer_names: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn load_balancer(mut self, load_balancer: Value) -> Self {
        self.load_balancer_names.push(load_balancer);
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }
}

impl ResourceProperties for AutoScalingGroup {
    const KIND: &'static str = "AWS::AutoScaling::AutoScalingGroup";
}

/// Delta-based scaling policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScalingPolicy {
    adjustment_type: String,
    auto_scaling_group_name: Value,
    cooldown: String,
    scaling_adjustment: String,
}

impl ScalingPolicy {
    /// Capacity-delta policy on the given group.
    pub fn change_in_capacity(group: Value, adjustment: i64, cooldown_seconds: u32) -> Self {
        Self {
            adjustment_type: "ChangeInCapacity".to_string(),
            auto_scaling_group_name: group,
            cooldown: cooldown_seconds.to_string(),
            scaling_adjustment: adjustment.to_string(),
        }
    }
}

impl ResourceProperties for ScalingPolicy {
    const KIND: &'static str = "AWS::AutoScaling::ScalingPolicy";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn asg_serializes_deferred_max_size() {
        let asg = AutoScalingGroup::new(
            Value::reference("privateSubnets"),
            Value::reference("logstashIndexerLaunchConfiguration"),
            1,
            Value::reference("logstashIndexerMaxClusterSize"),
        )
        .tag(Tag::new("InstanceRole", "Elasticsearch", true));

        assert_eq!(
            serde_json::to_value(&asg).unwrap(),
            json!({
                "VPCZoneIdentifier": {"Ref": "privateSubnets"},
                "LaunchConfigurationName": {"Ref": "logstashIndexerLaunchConfiguration"},
                "MinSize": "1",
                "MaxSize": {"Ref": "logstashIndexerMaxClusterSize"},
                "Tags": [{
                    "Key": "InstanceRole",
                    "Value": "Elasticsearch",
                    "PropagateAtLaunch": true
                }]
            })
        );
    }

    #[test]
    fn scaling_policy_matches_documented_literals() {
        let policy =
            ScalingPolicy::change_in_capacity(Value::reference("indexerAsg"), -1, 600);
        assert_eq!(
            serde_json::to_value(&policy).unwrap(),
            json!({
                "AdjustmentType": "ChangeInCapacity",
                "AutoScalingGroupName": {"Ref": "indexerAsg"},
                "Cooldown": "600",
                "ScalingAdjustment": "-1"
            })
        );
    }
}
