//! Remote-Access Deployment Profile
//!
//! The dependent composition: an HA bastion behind a public TCP balancer,
//! the only SSH path into the private subnets. Composes against a running
//! log-analytics deployment when one is present in the same topology and
//! degrades to imported parameters when it is not.

use serde::Deserialize;
use serde_json::{json, Value as Json};
use tracing::info;

use crate::compose::{NetworkContext, TierBuilder, TierHandles, REGION_AMI_MAPPING};
use crate::compose::tier::{AsgSpec, InstanceType, MaxSize};
use crate::errors::ComposeResult;
use crate::resources::ec2::{SecurityGroup, SecurityGroupEgress, SecurityGroupRule};
use crate::resources::elb::{HealthCheck, Listener, LoadBalancer};
use crate::resources::iam::{Policy, Statement};
use crate::template::{Parameter, Topology, Value, PSEUDO_ACCOUNT_ID};

/// General-purpose instance types accepted for the bastion host.
const VALID_INSTANCE_TYPES: [&str; 14] = [
    "t1.micro", "m1.small", "m1.medium", "m1.large", "m1.xlarge", "m3.medium", "m3.large",
    "m3.xlarge", "m3.2xlarge", "c3.large", "c3.xlarge", "c3.2xlarge", "c3.4xlarge", "c3.8xlarge",
];

const VALID_INSTANCE_TYPE_MESSAGE: &str = "must be a valid EC2 instance type.";

/// Bastion composition options with their documented defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessProfileConfig {
    pub instance_type_default: String,
    /// Port the balancer accepts public SSH on
    pub public_ssh_port: u16,
    /// Port the instance itself listens on
    pub ssh_port: u16,
    pub remote_access_cidr_default: String,
    pub instance_monitoring: bool,
    pub root_volume_type: String,
    /// Region-to-AMI lookup entries merged into the shared AMI table
    pub region_ami_map: Json,
}

impl Default for AccessProfileConfig {
    fn default() -> Self {
        Self {
            instance_type_default: "t1.micro".to_string(),
            public_ssh_port: 2222,
            ssh_port: 22,
            remote_access_cidr_default: "0.0.0.0/0".to_string(),
            instance_monitoring: false,
            root_volume_type: "gp2".to_string(),
            region_ami_map: Json::Null,
        }
    }
}

/// The composed remote-access profile.
#[derive(Debug, Clone, Default)]
pub struct AccessProfile {
    pub config: AccessProfileConfig,
    /// Opaque boot script text for the bastion instance
    pub bootstrap: String,
}

impl AccessProfile {
    /// Compose the bastion onto `topology`.
    ///
    /// When a log-analytics deployment was composed into the same topology
    /// its queue outputs are used directly; otherwise `logShipperQueueName`
    /// and `logShipperQueueRegion` are imported as parameters so the bastion
    /// can still publish its logs to a queue composed elsewhere.
    pub fn compose(
        &self,
        topology: &mut Topology,
        network: &NetworkContext,
    ) -> ComposeResult<TierHandles> {
        let config = &self.config;
        let ami_map = if config.region_ami_map.is_null() {
            json!({})
        } else {
            config.region_ami_map.clone()
        };
        topology.merge_mapping(REGION_AMI_MAPPING, ami_map)?;

        let mut builder = TierBuilder::new(topology, network, "bastion");

        let remote_access = builder.topology().import_parameter(
            Parameter::string("remoteAccessLocation")
                .default(&config.remote_access_cidr_default)
                .description(
                    "CIDR block identifying the network address range allowed remote access \
                     to the environment",
                ),
        )?;

        let elb_sg = builder.topology().add_resource(
            "bastionElbSecurityGroup",
            &SecurityGroup::new(
                "Security group allowing ingress via SSH to this instance along with other \
                 standard accessbility port rules",
                network.vpc_id.clone(),
            )
            .ingress(SecurityGroupRule::tcp_cidr(
                config.public_ssh_port,
                config.public_ssh_port,
                remote_access.reference(),
            )),
        )?;

        // Instance group keeps its published name: the logging profile's
        // degraded-path check looks it up by resource name.
        let instance_sg = builder.topology().add_resource(
            "bastionSecurityGroup",
            &SecurityGroup::new(
                "Security group allowing ingress via SSH to this instance along with other \
                 standard accessbility port rules",
                network.vpc_id.clone(),
            )
            .ingress(SecurityGroupRule::tcp_from_group(
                config.ssh_port,
                config.ssh_port,
                elb_sg.reference(),
            ))
            .egress(SecurityGroupRule::tcp_cidr(
                config.ssh_port,
                config.ssh_port,
                network.vpc_cidr.clone(),
            ))
            .egress(SecurityGroupRule::tcp_cidr(80, 80, "0.0.0.0/0"))
            .egress(SecurityGroupRule::tcp_cidr(443, 443, "0.0.0.0/0")),
        )?;

        builder.topology().add_resource(
            "bastionElbSecurityGroupEgressSSHToInstance",
            &SecurityGroupEgress::tcp_to_group(
                elb_sg.reference(),
                config.ssh_port,
                config.ssh_port,
                instance_sg.reference(),
            ),
        )?;

        let load_balancer = builder.topology().add_resource(
            "bastionElb",
            &LoadBalancer::new(
                network.public_subnets.clone(),
                elb_sg.reference(),
                HealthCheck::with_interval(format!("TCP:{}", config.ssh_port), 60),
            )
            .access_logging(network.utility_bucket.clone())
            .listener(Listener::new(config.public_ssh_port, config.ssh_port, "TCP")),
        )?;

        // Degraded path: reuse the composed queue outputs' parameters when
        // composing standalone against a queue deployed elsewhere.
        let log_queue = builder.topology().import_parameter(
            Parameter::string("logShipperQueueName")
                .description("Name of the SQS queue used for logging"),
        )?;
        let log_region = builder.topology().import_parameter(
            Parameter::string("logShipperQueueRegion")
                .description("Region of the SQS queue used for logging"),
        )?;
        let log_queue_arn = Value::join(
            "",
            vec![
                Value::from("arn:aws:sqs:"),
                log_region.reference(),
                Value::from(":"),
                Value::reference(PSEUDO_ACCOUNT_ID),
                Value::from(":"),
                log_queue.reference(),
            ],
        );

        let instance_profile = builder.instance_profile(vec![
            Policy::new(
                "logQueueWrite",
                vec![Statement::allow(["sqs:SendMessage"], vec![log_queue_arn])],
            ),
            Policy::new(
                "logReadQueues",
                vec![Statement::allow(["sqs:Get*", "sqs:List*"], Value::from("*"))],
            ),
            Policy::new(
                "cloudWatchPostData",
                vec![Statement::allow(
                    ["cloudwatch:PutMetricData"],
                    Value::from("*"),
                )],
            ),
        ])?;

        let user_data = if self.bootstrap.is_empty() {
            None
        } else {
            Some(
                crate::compose::BootstrapBuilder::for_tier("bastion")
                    .script(&self.bootstrap)
                    .into_user_data(),
            )
        };

        let group = builder.create_asg(AsgSpec {
            ami_name: "ubuntuPuppet".to_string(),
            instance_type: InstanceType::constrained(
                &config.instance_type_default,
                VALID_INSTANCE_TYPES.iter().map(|t| t.to_string()).collect(),
                VALID_INSTANCE_TYPE_MESSAGE,
            ),
            security_groups: vec![instance_sg.reference()],
            instance_profile: Some(instance_profile.reference()),
            user_data,
            min_size: 1,
            max_size: MaxSize::Literal(1),
            load_balancer: Some(load_balancer.clone()),
            instance_monitoring: config.instance_monitoring,
            root_volume_type: config.root_volume_type.clone(),
            custom_tags: vec![],
        })?;
        info!(group = %group.name(), "composed bastion access tier");

        let mut handles = TierHandles::default();
        handles.instance_security_group = Some(instance_sg);
        handles.elb_security_group = Some(elb_sg);
        handles.load_balancer = Some(load_balancer);
        handles.auto_scaling_group = Some(group);
        handles.instance_profile = Some(instance_profile);
        Ok(handles)
    }
}
