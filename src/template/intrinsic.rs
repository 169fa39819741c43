//! Template Value Expressions
//!
//! A [`Value`] is either a literal or one of the provider's intrinsic
//! reference expressions. Intrinsics serialize to the provider's exact JSON
//! forms (`{"Ref": ...}`, `{"Fn::GetAtt": [...]}`) and are the only way one
//! part of the composed graph refers to another; dangling names are caught
//! by [`Topology::to_json`](crate::template::Topology::to_json) before any
//! template is emitted.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Pseudo-parameter for the deployment region, always resolvable.
pub const PSEUDO_REGION: &str = "AWS::Region";

/// Pseudo-parameter for the deploying account id, always resolvable.
pub const PSEUDO_ACCOUNT_ID: &str = "AWS::AccountId";

/// A literal or intrinsic expression usable anywhere a template property,
/// output value or bootstrap variable expects a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Literal string
    String(String),
    /// Literal integer
    Long(i64),
    /// Reference to a parameter, resource or pseudo-parameter by name
    Ref(String),
    /// Attribute of a named resource, e.g. `("loggingQueue", "Arn")`
    GetAtt(String, String),
    /// Concatenation of parts with a separator
    Join(String, Vec<Value>),
    /// Two-level lookup into a named mapping; keys may themselves be
    /// expressions (e.g. the region pseudo-parameter)
    FindInMap(String, Box<Value>, Box<Value>),
    /// Base64 encoding of the inner expression, applied at deploy time
    Base64(Box<Value>),
}

impl Value {
    /// Reference a parameter, resource or pseudo-parameter by name.
    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    /// Attribute-style reference to a named resource.
    pub fn get_att(name: impl Into<String>, attr: impl Into<String>) -> Self {
        Value::GetAtt(name.into(), attr.into())
    }

    /// Join parts with a separator.
    pub fn join(separator: impl Into<String>, parts: Vec<Value>) -> Self {
        Value::Join(separator.into(), parts)
    }

    /// Look a value up in a registered mapping.
    pub fn find_in_map(
        map: impl Into<String>,
        top_key: impl Into<Value>,
        second_key: impl Into<Value>,
    ) -> Self {
        Value::FindInMap(
            map.into(),
            Box::new(top_key.into()),
            Box::new(second_key.into()),
        )
    }

    /// Base64-encode the inner expression at deploy time.
    pub fn base64(inner: Value) -> Self {
        Value::Base64(Box::new(inner))
    }

    /// The name this expression refers to, if it is a direct reference.
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            Value::Ref(name) | Value::GetAtt(name, _) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Long(i64::from(n))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Long(n) => serializer.serialize_i64(*n),
            Value::Ref(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", name)?;
                map.end()
            }
            Value::GetAtt(name, attr) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[name.as_str(), attr.as_str()])?;
                map.end()
            }
            Value::Join(separator, parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(separator, parts))?;
                map.end()
            }
            Value::FindInMap(map_name, top, second) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    "Fn::FindInMap",
                    &(&Value::String(map_name.clone()), top, second),
                )?;
                map.end()
            }
            Value::Base64(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Base64", inner)?;
                map.end()
            }
        }
    }
}
