//! Composition Layer
//!
//! Builders that turn typed tier configurations into the wired resource
//! graph: security-group pairing, bootstrap payload assembly, threshold
//! autoscaling, per-tier construction, cross-stack references and the
//! ordered assembly pipeline.

pub mod assembler;
pub mod bootstrap;
pub mod crossstack;
pub mod pairing;
pub mod scaling;
pub mod tier;

pub use assembler::{Assembler, BuiltTiers};
pub use bootstrap::BootstrapBuilder;
pub use pairing::{pair_security_groups, GroupEndpoint, PortRange};
pub use scaling::{wire_thresholds, MetricRef, ScalingHandles, ThresholdScalingConfig};
pub use tier::{AsgSpec, InstanceType, MaxSize, TierBuilder, TierHandles, REGION_AMI_MAPPING};

use serde_json::json;

use crate::errors::ComposeResult;
use crate::template::{Parameter, Topology, Value};

/// Name of the provided network-address mapping table.
pub const NETWORK_ADDRESSES_MAPPING: &str = "networkAddresses";

/// Pre-existing network surroundings consumed by every tier.
///
/// The base VPC, subnets, common security group and utility bucket are
/// provisioned outside this composer and arrive as parameters.
#[derive(Debug, Clone)]
pub struct NetworkContext {
    /// VPC the tiers deploy into
    pub vpc_id: Value,
    /// CIDR of the VPC, for network-local rules
    pub vpc_cidr: Value,
    /// Public subnet set, for externally reachable balancers
    pub public_subnets: Value,
    /// Private subnet set, for instances and internal balancers
    pub private_subnets: Value,
    /// Security group shared by every instance in the environment
    pub common_security_group: Value,
    /// Shared bucket for access logs and backups
    pub utility_bucket: Value,
}

impl NetworkContext {
    /// Declare the network surroundings as parameters on the topology and
    /// register the network-address mapping with the given VPC base CIDR.
    pub fn from_parameters(topology: &mut Topology, vpc_base_cidr: &str) -> ComposeResult<Self> {
        let vpc_id = topology
            .add_parameter(Parameter::string("vpcId").description("ID of the pre-provisioned VPC to deploy into."))?
            .reference();
        let public_subnets = topology
            .add_parameter(
                Parameter::list("publicSubnets")
                    .description("Public subnet IDs for externally reachable load balancers."),
            )?
            .reference();
        let private_subnets = topology
            .add_parameter(
                Parameter::list("privateSubnets")
                    .description("Private subnet IDs for instances and internal load balancers."),
            )?
            .reference();
        let common_security_group = topology
            .add_parameter(
                Parameter::string("commonSecurityGroup")
                    .description("ID of the security group shared by all instances in the environment."),
            )?
            .reference();
        let utility_bucket = topology
            .add_parameter(
                Parameter::string("utilityBucket")
                    .description("Name of the shared bucket for access logs and backups."),
            )?
            .reference();
        topology.add_mapping(
            NETWORK_ADDRESSES_MAPPING,
            json!({"vpcBase": {"cidr": vpc_base_cidr}}),
        )?;

        Ok(Self {
            vpc_id,
            vpc_cidr: Value::find_in_map(NETWORK_ADDRESSES_MAPPING, "vpcBase", "cidr"),
            public_subnets,
            private_subnets,
            common_security_group,
            utility_bucket,
        })
    }
}
