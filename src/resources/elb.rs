//! Classic load balancer resources

use serde::Serialize;

use crate::template::{ResourceProperties, Value};

/// Listener forwarding a front-end port to an instance port.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Listener {
    load_balancer_port: String,
    instance_port: String,
    protocol: String,
}

impl Listener {
    pub fn new(load_balancer_port: u16, instance_port: u16, protocol: impl Into<String>) -> Self {
        Self {
            load_balancer_port: load_balancer_port.to_string(),
            instance_port: instance_port.to_string(),
            protocol: protocol.into(),
        }
    }
}

/// Health check probing instances behind the balancer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    healthy_threshold: u32,
    unhealthy_threshold: u32,
    interval: u32,
    target: String,
    timeout: u32,
}

impl HealthCheck {
    /// Health check with the composer's standard probe cadence
    /// (3 healthy / 5 unhealthy, 30 s interval, 5 s timeout).
    pub fn standard(target: impl Into<String>) -> Self {
        Self {
            healthy_threshold: 3,
            unhealthy_threshold: 5,
            interval: 30,
            target: target.into(),
            timeout: 5,
        }
    }

    /// Health check with an explicit interval.
    pub fn with_interval(target: impl Into<String>, interval: u32) -> Self {
        Self {
            interval,
            ..Self::standard(target)
        }
    }
}

/// Access-log shipping to the shared utility bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessLoggingPolicy {
    emit_interval: u32,
    enabled: bool,
    s3_bucket_name: Value,
}

impl AccessLoggingPolicy {
    pub fn to_bucket(bucket: Value) -> Self {
        Self {
            emit_interval: 5,
            enabled: true,
            s3_bucket_name: bucket,
        }
    }
}

/// Classic load balancer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancer {
    subnets: Value,
    security_groups: Vec<Value>,
    cross_zone: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_logging_policy: Option<AccessLoggingPolicy>,
    health_check: HealthCheck,
    listeners: Vec<Listener>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheme: Option<String>,
}

impl LoadBalancer {
    /// Cross-zone balancer in the given subnets.
    pub fn new(subnets: Value, security_group: Value, health_check: HealthCheck) -> Self {
        Self {
            subnets,
            security_groups: vec![security_group],
            cross_zone: true,
            access_logging_policy: None,
            health_check,
            listeners: Vec::new(),
            scheme: None,
        }
    }

    /// Append a listener.
    pub fn listener(mut self, listener: Listener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Ship access logs to the given bucket.
    pub fn access_logging(mut self, bucket: Value) -> Self {
        self.access_logging_policy = Some(AccessLoggingPolicy::to_bucket(bucket));
        self
    }

    /// Mark the balancer internal (private subnets, no public address).
    pub fn internal(mut self) -> Self {
        self.scheme = Some("internal".to_string());
        self
    }
}

impl ResourceProperties for LoadBalancer {
    const KIND: &'static str = "AWS::ElasticLoadBalancing::LoadBalancer";
}
