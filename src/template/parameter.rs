//! Parameter Value Object with Declaration Constraints
//!
//! Parameters are the topology's externally supplied inputs. Each carries its
//! documented default and constraints so validation happens at declaration
//! time, not at every access site.

use serde::Serialize;

/// Parameter type as understood by the deployment provider.
///
/// `Secret` is a string parameter whose supplied value is masked in any
/// provider console or API echo (`NoEcho`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Number,
    /// Comma-delimited list, e.g. a pre-provisioned subnet id set
    CommaDelimitedList,
    /// String parameter with value echo suppressed
    Secret,
}

/// A named topology input with constraints.
///
/// Constructed fluently:
///
/// ```rust
/// use topology_composer::template::Parameter;
///
/// let param = Parameter::number("elasticsearchSnapshotFrequency")
///     .default("60")
///     .min_value(5)
///     .max_value(60)
///     .description("Interval in minutes to run the snapshot process")
///     .constraint_description("must be at least 5 and no more than 60.");
/// assert_eq!(param.name(), "elasticsearchSnapshotFrequency");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    #[serde(skip)]
    name: String,

    #[serde(rename = "Type")]
    type_name: &'static str,

    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    default: Option<String>,

    #[serde(rename = "AllowedValues", skip_serializing_if = "Option::is_none")]
    allowed_values: Option<Vec<String>>,

    #[serde(rename = "MinValue", skip_serializing_if = "Option::is_none")]
    min_value: Option<i64>,

    #[serde(rename = "MaxValue", skip_serializing_if = "Option::is_none")]
    max_value: Option<i64>,

    #[serde(rename = "MinLength", skip_serializing_if = "Option::is_none")]
    min_length: Option<u64>,

    #[serde(rename = "MaxLength", skip_serializing_if = "Option::is_none")]
    max_length: Option<u64>,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(rename = "ConstraintDescription", skip_serializing_if = "Option::is_none")]
    constraint_description: Option<String>,

    #[serde(rename = "NoEcho", skip_serializing_if = "Option::is_none")]
    no_echo: Option<bool>,
}

impl Parameter {
    /// Create a parameter of the given type.
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        let (type_name, no_echo) = match parameter_type {
            ParameterType::String => ("String", None),
            ParameterType::Number => ("Number", None),
            ParameterType::CommaDelimitedList => ("CommaDelimitedList", None),
            ParameterType::Secret => ("String", Some(true)),
        };
        Self {
            name: name.into(),
            type_name,
            default: None,
            allowed_values: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            description: None,
            constraint_description: None,
            no_echo,
        }
    }

    /// String-typed parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::String)
    }

    /// Number-typed parameter.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Number)
    }

    /// Comma-delimited list parameter.
    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::CommaDelimitedList)
    }

    /// Masked string parameter for secrets.
    pub fn secret(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Secret)
    }

    /// Default value supplied when the operator provides none.
    pub fn default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restrict the parameter to an allowed-value set.
    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Lower numeric bound (Number parameters).
    pub fn min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Upper numeric bound (Number parameters).
    pub fn max_value(mut self, max: i64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Minimum value length (String parameters).
    pub fn min_length(mut self, min: u64) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Maximum value length (String parameters).
    pub fn max_length(mut self, max: u64) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Human description shown to the operator.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Message shown when the supplied value violates a constraint.
    pub fn constraint_description(mut self, message: impl Into<String>) -> Self {
        self.constraint_description = Some(message.into());
        self
    }

    /// Logical name of this parameter.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn string_parameter_serializes_declared_fields_only() {
        let param = Parameter::string("bastionSecurityGroup")
            .description("ID of the Bastion Host security group.");
        assert_eq!(
            serde_json::to_value(&param).unwrap(),
            json!({
                "Type": "String",
                "Description": "ID of the Bastion Host security group."
            })
        );
    }

    #[test]
    fn number_parameter_carries_bounds() {
        let param = Parameter::number("logstashIndexerMaxClusterSize")
            .min_value(1)
            .max_value(20)
            .default("20");
        assert_eq!(
            serde_json::to_value(&param).unwrap(),
            json!({
                "Type": "Number",
                "Default": "20",
                "MinValue": 1,
                "MaxValue": 20
            })
        );
    }

    #[test]
    fn secret_parameter_sets_no_echo() {
        let param = Parameter::secret("kibanaAccessPassword")
            .default("P@ssword!")
            .min_length(4)
            .max_length(20);
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["Type"], json!("String"));
        assert_eq!(json["NoEcho"], json!(true));
        assert_eq!(json["MinLength"], json!(4));
    }

    #[test]
    fn identical_declarations_compare_equal() {
        let a = Parameter::string("logShipperQueueName").description("Queue name");
        let b = Parameter::string("logShipperQueueName").description("Queue name");
        let c = Parameter::string("logShipperQueueName").description("Different");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
