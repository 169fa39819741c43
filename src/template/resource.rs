//! Resource Envelope and Typed Property Contracts
//!
//! Typed property structs (see [`crate::resources`]) are serialized once at
//! registration time into a [`Resource`] envelope holding the provider's
//! resource type identifier and the property JSON. Registration hands back a
//! [`ResourceId`] used for all later references.

use serde::Serialize;
use serde_json::Value as Json;

use crate::errors::ComposeResult;
use crate::template::Value;

/// Contract for typed resource property structs.
///
/// `KIND` is the provider's resource type identifier, e.g.
/// `"AWS::EC2::SecurityGroup"`.
pub trait ResourceProperties: Serialize {
    /// Provider resource type identifier
    const KIND: &'static str;
}

/// A registered resource: provider type plus serialized properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    kind: String,
    properties: Json,
}

impl Resource {
    /// Serialize typed properties into an envelope.
    pub fn new<P: ResourceProperties>(properties: &P) -> ComposeResult<Self> {
        Ok(Self {
            kind: P::KIND.to_string(),
            properties: serde_json::to_value(properties)?,
        })
    }

    /// Envelope from an already-serialized property tree (embedded stacks).
    pub(crate) fn from_parts(kind: impl Into<String>, properties: Json) -> Self {
        Self {
            kind: kind.into(),
            properties,
        }
    }

    /// Provider resource type identifier.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Serialized property tree.
    pub fn properties(&self) -> &Json {
        &self.properties
    }

    /// Template form: `{"Type": ..., "Properties": ...}`.
    pub(crate) fn to_json(&self) -> Json {
        serde_json::json!({
            "Type": self.kind,
            "Properties": self.properties,
        })
    }
}

/// Handle to a registered resource, used for downstream references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Logical name of the resource.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// `Ref` expression for this resource.
    pub fn reference(&self) -> Value {
        Value::reference(&self.0)
    }

    /// `GetAtt` expression for an attribute of this resource.
    pub fn get_att(&self, attr: impl Into<String>) -> Value {
        Value::get_att(&self.0, attr)
    }
}

/// Handle to a registered parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterId(String);

impl ParameterId {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Logical name of the parameter.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// `Ref` expression for this parameter.
    pub fn reference(&self) -> Value {
        Value::reference(&self.0)
    }
}
