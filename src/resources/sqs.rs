//! Queue resources for the log transport layer

use serde::Serialize;

use crate::resources::iam::PolicyDocument;
use crate::template::{ResourceProperties, Value};

/// A plain queue with provider-default settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Queue {}

impl Queue {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProperties for Queue {
    const KIND: &'static str = "AWS::SQS::Queue";
}

/// Policy attached to one or more queues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueuePolicy {
    policy_document: PolicyDocument,
    queues: Vec<Value>,
}

impl QueuePolicy {
    pub fn new(document: PolicyDocument, queues: Vec<Value>) -> Self {
        Self {
            policy_document: document,
            queues,
        }
    }
}

impl ResourceProperties for QueuePolicy {
    const KIND: &'static str = "AWS::SQS::QueuePolicy";
}
