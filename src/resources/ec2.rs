//! Security group resources and rules

use serde::Serialize;

use crate::template::{ResourceProperties, Value};

/// A single ingress or egress rule carried inline on a security group.
///
/// The peer is exactly one of a CIDR block or another security group;
/// constructors enforce the exclusivity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupRule {
    ip_protocol: String,
    from_port: String,
    to_port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cidr_ip: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_security_group_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_security_group_id: Option<Value>,
}

impl SecurityGroupRule {
    /// TCP rule with a CIDR peer. The CIDR may be a literal or a lookup
    /// (e.g. the VPC base CIDR from the network mapping).
    pub fn tcp_cidr(from_port: u16, to_port: u16, cidr: impl Into<Value>) -> Self {
        Self {
            ip_protocol: "tcp".to_string(),
            from_port: from_port.to_string(),
            to_port: to_port.to_string(),
            cidr_ip: Some(cidr.into()),
            source_security_group_id: None,
            destination_security_group_id: None,
        }
    }

    /// TCP ingress rule whose peer is a source security group.
    pub fn tcp_from_group(from_port: u16, to_port: u16, group: Value) -> Self {
        Self {
            ip_protocol: "tcp".to_string(),
            from_port: from_port.to_string(),
            to_port: to_port.to_string(),
            cidr_ip: None,
            source_security_group_id: Some(group),
            destination_security_group_id: None,
        }
    }

    /// TCP egress rule whose peer is a destination security group.
    pub fn tcp_to_group(from_port: u16, to_port: u16, group: Value) -> Self {
        Self {
            ip_protocol: "tcp".to_string(),
            from_port: from_port.to_string(),
            to_port: to_port.to_string(),
            cidr_ip: None,
            source_security_group_id: None,
            destination_security_group_id: Some(group),
        }
    }
}

/// A security group with its creation-time inline rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    group_description: String,
    vpc_id: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    security_group_ingress: Vec<SecurityGroupRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    security_group_egress: Vec<SecurityGroupRule>,
}

impl SecurityGroup {
    /// Security group in the given VPC with no inline rules.
    pub fn new(description: impl Into<String>, vpc_id: Value) -> Self {
        Self {
            group_description: description.into(),
            vpc_id,
            security_group_ingress: Vec::new(),
            security_group_egress: Vec::new(),
        }
    }

    /// Append an inline ingress rule.
    pub fn ingress(mut self, rule: SecurityGroupRule) -> Self {
        self.security_group_ingress.push(rule);
        self
    }

    /// Append an inline egress rule.
    pub fn egress(mut self, rule: SecurityGroupRule) -> Self {
        self.security_group_egress.push(rule);
        self
    }
}

impl ResourceProperties for SecurityGroup {
    const KIND: &'static str = "AWS::EC2::SecurityGroup";
}

/// Standalone ingress rule attached to an existing group by id.
///
/// The standalone form is the provider's only valid encoding for rules
/// between mutually referencing groups, and the only way to attach a rule to
/// a group supplied as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupIngress {
    group_id: Value,
    ip_protocol: String,
    from_port: String,
    to_port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cidr_ip: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_security_group_id: Option<Value>,
}

impl SecurityGroupIngress {
    /// TCP ingress from a source group.
    pub fn tcp_from_group(group_id: Value, from_port: u16, to_port: u16, source: Value) -> Self {
        Self {
            group_id,
            ip_protocol: "tcp".to_string(),
            from_port: from_port.to_string(),
            to_port: to_port.to_string(),
            cidr_ip: None,
            source_security_group_id: Some(source),
        }
    }
}

impl ResourceProperties for SecurityGroupIngress {
    const KIND: &'static str = "AWS::EC2::SecurityGroupIngress";
}

/// Standalone egress rule attached to an existing group by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupEgress {
    group_id: Value,
    ip_protocol: String,
    from_port: String,
    to_port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cidr_ip: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_security_group_id: Option<Value>,
}

impl SecurityGroupEgress {
    /// TCP egress to a destination group.
    pub fn tcp_to_group(group_id: Value, from_port: u16, to_port: u16, destination: Value) -> Self {
        Self {
            group_id,
            ip_protocol: "tcp".to_string(),
            from_port: from_port.to_string(),
            to_port: to_port.to_string(),
            cidr_ip: None,
            destination_security_group_id: Some(destination),
        }
    }
}

impl ResourceProperties for SecurityGroupEgress {
    const KIND: &'static str = "AWS::EC2::SecurityGroupEgress";
}
