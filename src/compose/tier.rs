//! Tier Builder
//!
//! Per-tier construction: instance (and optional ELB) security groups, tier
//! parameters, IAM role composition, launch configuration and autoscaling
//! group, returning the handles later tiers reference.
//!
//! Step order is fixed: security groups, bounds validation, parameters,
//! IAM role, bootstrap payload, autoscaling group. Bounds violations abort
//! before anything for the failing piece is registered.

use indexmap::IndexMap;
use tracing::info;

use crate::compose::NetworkContext;
use crate::errors::{ComposeError, ComposeResult};
use crate::resources::autoscaling::{
    AutoScalingGroup, BlockDeviceMapping, LaunchConfiguration, Tag,
};
use crate::resources::ec2::{SecurityGroup, SecurityGroupRule};
use crate::resources::iam::{InstanceProfile, Policy, Role};
use crate::template::{Parameter, ParameterId, ResourceId, Topology, Value, PSEUDO_REGION};

/// Name of the provided region-to-AMI lookup table.
pub const REGION_AMI_MAPPING: &str = "RegionMap";

/// Maximum size of an autoscaling group: a literal, or deferred to a
/// Number parameter the operator can change without recomposition.
#[derive(Debug, Clone)]
pub enum MaxSize {
    Literal(u32),
    Parameter(ParameterId),
}

/// Instance type source for a tier's launch configuration.
#[derive(Debug, Clone)]
pub enum InstanceType {
    /// Declare a `{tier}InstanceType` parameter with this default
    Default {
        default: String,
        allowed_values: Option<Vec<String>>,
        constraint_description: Option<String>,
    },
    /// Use an already-declared parameter
    Parameter(ParameterId),
}

impl InstanceType {
    /// Declare the tier's instance-type parameter with a plain default.
    pub fn default(default: impl Into<String>) -> Self {
        InstanceType::Default {
            default: default.into(),
            allowed_values: None,
            constraint_description: None,
        }
    }

    /// Declare the parameter with an allowed-value set and violation message.
    pub fn constrained(
        default: impl Into<String>,
        allowed_values: Vec<String>,
        constraint_description: impl Into<String>,
    ) -> Self {
        InstanceType::Default {
            default: default.into(),
            allowed_values: Some(allowed_values),
            constraint_description: Some(constraint_description.into()),
        }
    }
}

/// Everything the tier builder needs to create one autoscaling group.
#[derive(Debug, Clone)]
pub struct AsgSpec {
    /// Key into the region-AMI lookup table
    pub ami_name: String,
    pub instance_type: InstanceType,
    /// Instance security groups; the shared common group is appended
    pub security_groups: Vec<Value>,
    pub instance_profile: Option<Value>,
    /// Rendered bootstrap payload, if the tier has one
    pub user_data: Option<Value>,
    pub min_size: u32,
    pub max_size: MaxSize,
    pub load_balancer: Option<ResourceId>,
    pub instance_monitoring: bool,
    pub root_volume_type: String,
    pub custom_tags: Vec<Tag>,
}

/// Handles a built tier exposes to later tiers, read-only.
#[derive(Debug, Clone, Default)]
pub struct TierHandles {
    pub instance_security_group: Option<ResourceId>,
    pub elb_security_group: Option<ResourceId>,
    pub load_balancer: Option<ResourceId>,
    pub auto_scaling_group: Option<ResourceId>,
    pub instance_profile: Option<ResourceId>,
    extras: IndexMap<String, ResourceId>,
}

impl TierHandles {
    /// Expose an additional named handle (e.g. a queue) to later tiers.
    pub fn insert_extra(&mut self, name: impl Into<String>, id: ResourceId) {
        self.extras.insert(name.into(), id);
    }

    /// Named extra handle; absent names are a resolution error.
    pub fn extra(&self, name: &str) -> ComposeResult<&ResourceId> {
        self.extras
            .get(name)
            .ok_or_else(|| ComposeError::unresolved(name, "tier exposes no such handle"))
    }

    /// The tier's instance security group; required by pairing callers.
    pub fn require_instance_security_group(&self) -> ComposeResult<&ResourceId> {
        self.instance_security_group
            .as_ref()
            .ok_or_else(|| ComposeError::unresolved(
                "instance_security_group",
                "tier was built without an instance security group",
            ))
    }

    /// The tier's load balancer; required by downstream consumers.
    pub fn require_load_balancer(&self) -> ComposeResult<&ResourceId> {
        self.load_balancer.as_ref().ok_or_else(|| {
            ComposeError::unresolved("load_balancer", "tier was built without a load balancer")
        })
    }
}

/// Builder driving one tier's construction against the enclosing topology.
pub struct TierBuilder<'a> {
    topology: &'a mut Topology,
    network: &'a NetworkContext,
    name: String,
}

impl<'a> TierBuilder<'a> {
    /// Builder for the named tier.
    pub fn new(topology: &'a mut Topology, network: &'a NetworkContext, name: impl Into<String>) -> Self {
        Self {
            topology,
            network,
            name: name.into(),
        }
    }

    /// Tier name, used as the prefix for every resource this builder names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enclosing topology, for tier-specific registrations.
    pub fn topology(&mut self) -> &mut Topology {
        self.topology
    }

    /// Network surroundings shared by every tier.
    pub fn network(&self) -> &NetworkContext {
        self.network
    }

    /// Validate a literal min/max pair before anything is registered.
    pub fn validate_sizes(&self, min_size: u32, max_size: u32) -> ComposeResult<()> {
        if min_size > max_size {
            return Err(ComposeError::configuration(
                &self.name,
                "min_size",
                format!("min size {min_size} is larger than max size {max_size}"),
            ));
        }
        Ok(())
    }

    /// Create the tier's instance security group
    /// (`{tier}InstanceSecurityGroup`) with optional inline rules.
    pub fn instance_security_group(
        &mut self,
        description: impl Into<String>,
        inline_ingress: Vec<SecurityGroupRule>,
    ) -> ComposeResult<ResourceId> {
        let mut group = SecurityGroup::new(description, self.network.vpc_id.clone());
        for rule in inline_ingress {
            group = group.ingress(rule);
        }
        self.topology
            .add_resource(format!("{}InstanceSecurityGroup", self.name), &group)
    }

    /// Create the tier's balancer security group (`{tier}ElbSecurityGroup`)
    /// for externally reachable tiers.
    pub fn elb_security_group(
        &mut self,
        description: impl Into<String>,
        inline_ingress: Vec<SecurityGroupRule>,
    ) -> ComposeResult<ResourceId> {
        let mut group = SecurityGroup::new(description, self.network.vpc_id.clone());
        for rule in inline_ingress {
            group = group.ingress(rule);
        }
        self.topology
            .add_resource(format!("{}ElbSecurityGroup", self.name), &group)
    }

    /// Compose the tier's IAM role (`{tier}Role`) from the given policy
    /// statements and bind it to an instance profile
    /// (`{tier}InstanceProfile`).
    pub fn instance_profile(&mut self, policies: Vec<Policy>) -> ComposeResult<ResourceId> {
        let role = self
            .topology
            .add_resource(format!("{}Role", self.name), &Role::for_instances(policies))?;
        self.topology.add_resource(
            format!("{}InstanceProfile", self.name),
            &InstanceProfile::for_role(role.reference()),
        )
    }

    /// Create the tier's launch configuration and autoscaling group.
    ///
    /// Validates literal min/max consistency first; a violation registers
    /// nothing. Returns the autoscaling group handle.
    pub fn create_asg(&mut self, spec: AsgSpec) -> ComposeResult<ResourceId> {
        if let MaxSize::Literal(max) = spec.max_size {
            self.validate_sizes(spec.min_size, max)?;
        }

        let instance_type = match &spec.instance_type {
            InstanceType::Parameter(parameter) => parameter.reference(),
            InstanceType::Default {
                default,
                allowed_values,
                constraint_description,
            } => {
                let mut parameter = Parameter::string(format!("{}InstanceType", self.name))
                    .default(default)
                    .description(format!(
                        "Instance type to use when launching instances for the {} tier",
                        self.name
                    ));
                if let Some(allowed) = allowed_values {
                    parameter = parameter.allowed_values(allowed.clone());
                }
                if let Some(message) = constraint_description {
                    parameter = parameter.constraint_description(message);
                }
                self.topology.add_parameter(parameter)?.reference()
            }
        };

        let image_id = Value::find_in_map(
            REGION_AMI_MAPPING,
            Value::reference(PSEUDO_REGION),
            spec.ami_name.clone(),
        );
        let mut security_groups = spec.security_groups;
        security_groups.push(self.network.common_security_group.clone());

        let mut launch_configuration =
            LaunchConfiguration::new(image_id, instance_type, security_groups)
                .instance_monitoring(spec.instance_monitoring)
                .block_device_mapping(BlockDeviceMapping::root_volume(spec.root_volume_type));
        if let Some(profile) = spec.instance_profile {
            launch_configuration = launch_configuration.iam_instance_profile(profile);
        }
        if let Some(user_data) = spec.user_data {
            launch_configuration = launch_configuration.user_data(user_data);
        }
        let launch_configuration = self.topology.add_resource(
            format!("{}LaunchConfiguration", self.name),
            &launch_configuration,
        )?;

        let max_size = match &spec.max_size {
            MaxSize::Literal(max) => Value::String(max.to_string()),
            MaxSize::Parameter(parameter) => parameter.reference(),
        };
        let mut group = AutoScalingGroup::new(
            self.network.private_subnets.clone(),
            launch_configuration.reference(),
            spec.min_size,
            max_size,
        );
        if let Some(load_balancer) = &spec.load_balancer {
            group = group.load_balancer(load_balancer.reference());
        }
        for tag in spec.custom_tags {
            group = group.tag(tag);
        }
        let group = self
            .topology
            .add_resource(format!("{}AutoScalingGroup", self.name), &group)?;
        info!(tier = %self.name, group = %group.name(), "created autoscaling group");
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn network(topology: &mut Topology) -> NetworkContext {
        NetworkContext::from_parameters(topology, "10.0.0.0/16").unwrap()
    }

    #[test]
    fn min_greater_than_max_registers_zero_tier_resources() {
        let mut topology = Topology::new();
        let network = network(&mut topology);
        let before = topology.resource_count();

        let mut builder = TierBuilder::new(&mut topology, &network, "logstashIndexer");
        let err = builder
            .create_asg(AsgSpec {
                ami_name: "ubuntuElkLogstash".to_string(),
                instance_type: InstanceType::default("c3.large"),
                security_groups: vec![],
                instance_profile: None,
                user_data: None,
                min_size: 5,
                max_size: MaxSize::Literal(1),
                load_balancer: None,
                instance_monitoring: true,
                root_volume_type: "gp2".to_string(),
                custom_tags: vec![],
            })
            .unwrap_err();

        assert!(matches!(err, ComposeError::Configuration { ref tier, ref field, .. }
            if tier == "logstashIndexer" && field == "min_size"));
        assert_eq!(topology.resource_count(), before);
    }

    #[test]
    fn asg_binds_launch_configuration_profile_and_ami_lookup() {
        let mut topology = Topology::new();
        let network = network(&mut topology);
        topology
            .add_mapping(REGION_AMI_MAPPING, json!({"us-east-1": {"ubuntuElk": "ami-1234"}}))
            .unwrap();

        let mut builder = TierBuilder::new(&mut topology, &network, "elasticsearch");
        let instance_sg = builder
            .instance_security_group("Instance group for the search tier", vec![])
            .unwrap();
        let profile = builder.instance_profile(vec![]).unwrap();
        let group = builder
            .create_asg(AsgSpec {
                ami_name: "ubuntuElk".to_string(),
                instance_type: InstanceType::default("c3.large"),
                security_groups: vec![instance_sg.reference()],
                instance_profile: Some(profile.reference()),
                user_data: None,
                min_size: 5,
                max_size: MaxSize::Literal(5),
                load_balancer: None,
                instance_monitoring: true,
                root_volume_type: "gp2".to_string(),
                custom_tags: vec![Tag::new("InstanceRole", "Elasticsearch", true)],
            })
            .unwrap();
        assert_eq!(group.name(), "elasticsearchAutoScalingGroup");

        let launch = topology.resource("elasticsearchLaunchConfiguration").unwrap();
        assert_eq!(
            launch.properties()["ImageId"],
            json!({"Fn::FindInMap": ["RegionMap", {"Ref": "AWS::Region"}, "ubuntuElk"]})
        );
        assert_eq!(
            launch.properties()["SecurityGroups"],
            json!([
                {"Ref": "elasticsearchInstanceSecurityGroup"},
                {"Ref": "commonSecurityGroup"}
            ])
        );
        assert_eq!(
            launch.properties()["IamInstanceProfile"],
            json!({"Ref": "elasticsearchInstanceProfile"})
        );

        assert!(topology.has_parameter("elasticsearchInstanceType"));
        let asg = topology.resource("elasticsearchAutoScalingGroup").unwrap();
        assert_eq!(asg.properties()["MinSize"], json!("5"));
        assert_eq!(asg.properties()["MaxSize"], json!("5"));

        // Whole graph resolves
        assert!(topology.to_json().is_ok());
    }

    #[test]
    fn deferred_max_size_references_the_parameter() {
        let mut topology = Topology::new();
        let network = network(&mut topology);
        let max_parameter = topology
            .add_parameter(
                Parameter::number("logstashIndexerMaxClusterSize")
                    .min_value(1)
                    .max_value(20)
                    .default("20"),
            )
            .unwrap();

        let mut builder = TierBuilder::new(&mut topology, &network, "logstashIndexer");
        builder
            .create_asg(AsgSpec {
                ami_name: "ubuntuElkLogstash".to_string(),
                instance_type: InstanceType::default("c3.large"),
                security_groups: vec![],
                instance_profile: None,
                user_data: None,
                min_size: 1,
                max_size: MaxSize::Parameter(max_parameter),
                load_balancer: None,
                instance_monitoring: true,
                root_volume_type: "gp2".to_string(),
                custom_tags: vec![],
            })
            .unwrap();

        let asg = topology.resource("logstashIndexerAutoScalingGroup").unwrap();
        assert_eq!(
            asg.properties()["MaxSize"],
            json!({"Ref": "logstashIndexerMaxClusterSize"})
        );
    }
}
