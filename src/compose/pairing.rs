//! Security Group Pairing Engine
//!
//! Reciprocal ingress/egress rule creation between two security groups, so
//! two tiers can communicate on a port range without manual double-entry.
//! Rules are emitted as standalone rule resources: that is the provider's
//! only valid encoding for mutually referencing groups, and the only way to
//! attach a rule to a group supplied as a parameter.
//!
//! Pure, synchronous graph construction with no I/O.

use tracing::debug;

use crate::errors::{ComposeError, ComposeResult};
use crate::resources::ec2::{SecurityGroupEgress, SecurityGroupIngress};
use crate::template::{ResourceId, Topology, Value};

/// Inclusive TCP port range for a pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    /// A single port.
    pub fn single(port: u16) -> Self {
        Self {
            from: port,
            to: port,
        }
    }

    /// An inclusive range, e.g. a clustering port span.
    pub fn new(from: u16, to: u16) -> Self {
        Self { from, to }
    }

    pub fn from_port(&self) -> u16 {
        self.from
    }

    pub fn to_port(&self) -> u16 {
        self.to
    }

    /// Suffix used in rule-resource names: `9200` or `9200To9400`.
    fn name_suffix(&self) -> String {
        if self.from == self.to {
            self.from.to_string()
        } else {
            format!("{}To{}", self.from, self.to)
        }
    }
}

impl From<u16> for PortRange {
    fn from(port: u16) -> Self {
        Self::single(port)
    }
}

/// One side of a pairing: a labeled security-group identity.
///
/// The group may be a resource of this topology or an externally supplied id
/// (e.g. a bastion group arriving as a parameter).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEndpoint {
    label: String,
    id: Value,
}

impl GroupEndpoint {
    /// Endpoint backed by a security-group resource in this topology.
    pub fn group(label: impl Into<String>, group: &ResourceId) -> Self {
        Self {
            label: label.into(),
            id: group.reference(),
        }
    }

    /// Endpoint backed by an externally supplied group id.
    pub fn external(label: impl Into<String>, id: Value) -> Self {
        Self {
            label: label.into(),
            id,
        }
    }

    /// Label with the first letter upper-cased, for rule-resource names.
    fn capitalized(&self) -> String {
        let mut chars = self.label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }
}

/// Create the reciprocal rule pair letting `source` reach `dest` on `ports`:
/// an egress rule on the source group and an ingress rule on the destination
/// group. When both endpoints name the same group a single self-referencing
/// ingress+egress pair is created instead.
///
/// Either endpoint may be caller-checked-optional: `None` raises a
/// [`ComposeError::Configuration`] naming the missing side, which callers
/// use as a "skip if tier absent" guard while deciding themselves whether
/// absence is fatal.
///
/// Re-invoking the same (source, dest, ports) pairing reuses the identical
/// rule resources; a conflicting redeclaration under the same rule names is
/// an error.
pub fn pair_security_groups(
    topology: &mut Topology,
    source: Option<&GroupEndpoint>,
    dest: Option<&GroupEndpoint>,
    ports: impl Into<PortRange>,
) -> ComposeResult<()> {
    let ports = ports.into();
    let (source, dest) = match (source, dest) {
        (Some(source), Some(dest)) => (source, dest),
        (None, Some(dest)) => {
            return Err(ComposeError::configuration(
                &dest.label,
                "source",
                "source security group is unresolved",
            ))
        }
        (Some(source), None) => {
            return Err(ComposeError::configuration(
                &source.label,
                "destination",
                "destination security group is unresolved",
            ))
        }
        (None, None) => {
            return Err(ComposeError::configuration(
                "pairing",
                "source",
                "both security groups are unresolved",
            ))
        }
    };

    let suffix = ports.name_suffix();
    if source.id == dest.id {
        // Self-referencing pair, e.g. a clustering port span
        let ingress_name = format!("{}SelfIngress{}", source.label, suffix);
        let egress_name = format!("{}SelfEgress{}", source.label, suffix);
        topology.get_or_create_resource(
            &ingress_name,
            &SecurityGroupIngress::tcp_from_group(
                source.id.clone(),
                ports.from_port(),
                ports.to_port(),
                source.id.clone(),
            ),
        )?;
        topology.get_or_create_resource(
            &egress_name,
            &SecurityGroupEgress::tcp_to_group(
                source.id.clone(),
                ports.from_port(),
                ports.to_port(),
                source.id.clone(),
            ),
        )?;
        debug!(group = %source.label, ports = %suffix, "paired security group with itself");
        return Ok(());
    }

    let egress_name = format!("{}To{}Egress{}", source.label, dest.capitalized(), suffix);
    let ingress_name = format!("{}To{}Ingress{}", source.label, dest.capitalized(), suffix);
    topology.get_or_create_resource(
        &egress_name,
        &SecurityGroupEgress::tcp_to_group(
            source.id.clone(),
            ports.from_port(),
            ports.to_port(),
            dest.id.clone(),
        ),
    )?;
    topology.get_or_create_resource(
        &ingress_name,
        &SecurityGroupIngress::tcp_from_group(
            dest.id.clone(),
            ports.from_port(),
            ports.to_port(),
            source.id.clone(),
        ),
    )?;
    debug!(
        source = %source.label,
        dest = %dest.label,
        ports = %suffix,
        "paired security groups"
    );
    Ok(())
}
