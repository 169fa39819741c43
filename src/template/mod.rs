//! Composed Topology and Registries
//!
//! A [`Topology`] owns the ordered registries of named Parameters, Resources
//! and Outputs making up one environment's deployment graph, plus the
//! Mappings consumed as provided lookup tables (e.g. the AMI-name table).
//!
//! # Invariants
//!
//! - Every name is unique within its registry
//! - Registration is append-only; nothing is removed once added
//! - Serialization is all-or-nothing: [`Topology::to_json`] validates that
//!   every emitted reference resolves before producing any output
//!
//! Cross-stack embedding and parameter imports live in
//! [`crate::compose::crossstack`].

pub mod intrinsic;
pub mod parameter;
pub mod resource;

pub use intrinsic::{Value, PSEUDO_ACCOUNT_ID, PSEUDO_REGION};
pub use parameter::{Parameter, ParameterType};
pub use resource::{ParameterId, Resource, ResourceId, ResourceProperties};

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::debug;

use crate::errors::{ComposeError, ComposeResult};

/// A named stack output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    name: String,
    value: Value,
    description: Option<String>,
}

impl Output {
    /// Create an output with a value expression.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
        }
    }

    /// Human description of the output.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Logical name of this output.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn to_json(&self) -> Json {
        let mut map = serde_json::Map::new();
        map.insert("Value".to_string(), serde_json::json!(self.value));
        if let Some(description) = &self.description {
            map.insert("Description".to_string(), Json::String(description.clone()));
        }
        Json::Object(map)
    }
}

/// Record of an embedded child topology: which outputs it exposes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EmbeddedChild {
    pub(crate) outputs: Vec<String>,
}

/// The composed deployment graph for one environment.
#[derive(Debug, Default)]
pub struct Topology {
    description: Option<String>,
    parameters: IndexMap<String, Parameter>,
    mappings: IndexMap<String, Json>,
    resources: IndexMap<String, Resource>,
    outputs: IndexMap<String, Output>,
    pub(crate) children: IndexMap<String, EmbeddedChild>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty topology with a template description.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Register a parameter. Errors if the name is taken.
    pub fn add_parameter(&mut self, parameter: Parameter) -> ComposeResult<ParameterId> {
        let name = parameter.name().to_string();
        if self.parameters.contains_key(&name) {
            return Err(ComposeError::DuplicateName {
                kind: "parameter",
                name,
            });
        }
        debug!(parameter = %name, "registered parameter");
        self.parameters.insert(name.clone(), parameter);
        Ok(ParameterId::new(name))
    }

    /// Register a parameter, reusing an existing identical declaration.
    ///
    /// An existing declaration that differs in any field is a
    /// [`ComposeError::DeclarationMismatch`].
    pub fn get_or_create_parameter(&mut self, parameter: Parameter) -> ComposeResult<ParameterId> {
        let name = parameter.name().to_string();
        match self.parameters.get(&name) {
            Some(existing) if *existing == parameter => Ok(ParameterId::new(name)),
            Some(_) => Err(ComposeError::DeclarationMismatch {
                kind: "parameter",
                name,
            }),
            None => self.add_parameter(parameter),
        }
    }

    /// Register a typed resource. Errors if the name is taken.
    pub fn add_resource<P: ResourceProperties>(
        &mut self,
        name: impl Into<String>,
        properties: &P,
    ) -> ComposeResult<ResourceId> {
        let name = name.into();
        if self.resources.contains_key(&name) {
            return Err(ComposeError::DuplicateName {
                kind: "resource",
                name,
            });
        }
        let resource = Resource::new(properties)?;
        debug!(resource = %name, kind = %resource.kind(), "registered resource");
        self.resources.insert(name.clone(), resource);
        Ok(ResourceId::new(name))
    }

    /// Register a typed resource, reusing an existing identical declaration.
    pub fn get_or_create_resource<P: ResourceProperties>(
        &mut self,
        name: impl Into<String>,
        properties: &P,
    ) -> ComposeResult<ResourceId> {
        let name = name.into();
        let resource = Resource::new(properties)?;
        match self.resources.get(&name) {
            Some(existing) if *existing == resource => Ok(ResourceId::new(name)),
            Some(_) => Err(ComposeError::DeclarationMismatch {
                kind: "resource",
                name,
            }),
            None => {
                debug!(resource = %name, kind = %resource.kind(), "registered resource");
                self.resources.insert(name.clone(), resource);
                Ok(ResourceId::new(name))
            }
        }
    }

    /// Register a raw-properties resource (used for embedded child stacks).
    pub(crate) fn add_raw_resource(
        &mut self,
        name: impl Into<String>,
        resource: Resource,
    ) -> ComposeResult<ResourceId> {
        let name = name.into();
        if self.resources.contains_key(&name) {
            return Err(ComposeError::DuplicateName {
                kind: "resource",
                name,
            });
        }
        self.resources.insert(name.clone(), resource);
        Ok(ResourceId::new(name))
    }

    /// Register a named mapping table (e.g. the AMI-name lookup table).
    pub fn add_mapping(&mut self, name: impl Into<String>, table: Json) -> ComposeResult<()> {
        let name = name.into();
        if self.mappings.contains_key(&name) {
            return Err(ComposeError::DuplicateName {
                kind: "mapping",
                name,
            });
        }
        self.mappings.insert(name, table);
        Ok(())
    }

    /// Get-or-create a named mapping table, merging top-level entries.
    ///
    /// A table shared by independently composed profiles (the AMI lookup
    /// table) is created by whichever profile composes first; later callers
    /// merge their entries into it. Re-declaring an entry with a different
    /// value is a [`ComposeError::DeclarationMismatch`], as is merging into
    /// a table that is not an object.
    pub fn merge_mapping(&mut self, name: impl Into<String>, table: Json) -> ComposeResult<()> {
        let name = name.into();
        let Some(existing) = self.mappings.get_mut(&name) else {
            self.mappings.insert(name, table);
            return Ok(());
        };
        let mismatch = || ComposeError::DeclarationMismatch {
            kind: "mapping",
            name: name.clone(),
        };
        let (Json::Object(existing), Json::Object(additions)) = (existing, table) else {
            return Err(mismatch());
        };
        for (key, value) in additions {
            match existing.get(&key) {
                None => {
                    existing.insert(key, value);
                }
                Some(current) if *current == value => {}
                Some(_) => return Err(mismatch()),
            }
        }
        Ok(())
    }

    /// Register a stack output. Errors if the name is taken.
    pub fn add_output(&mut self, output: Output) -> ComposeResult<()> {
        let name = output.name().to_string();
        if self.outputs.contains_key(&name) {
            return Err(ComposeError::DuplicateName {
                kind: "output",
                name,
            });
        }
        debug!(output = %name, "registered output");
        self.outputs.insert(name, output);
        Ok(())
    }

    /// Whether a resource with this name is registered.
    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Whether a parameter with this name is registered.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Whether an output with this name is declared.
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    /// Registered resource by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Names of all declared outputs, in declaration order.
    pub fn output_names(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }

    /// Number of registered resources.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Resources of a given provider kind, in registration order.
    pub fn resources_of_kind<'a>(
        &'a self,
        kind: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, resource)| resource.kind() == kind)
            .map(|(name, resource)| (name.as_str(), resource))
    }

    /// Validate the graph and serialize it to the provider template form.
    ///
    /// All-or-nothing: any dangling `Ref`/`GetAtt` aborts with
    /// [`ComposeError::ReferenceResolution`] before a single byte is emitted.
    pub fn to_json(&self) -> ComposeResult<Json> {
        self.validate_references()?;

        let mut template = serde_json::Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_string(),
            Json::String("2010-09-09".to_string()),
        );
        if let Some(description) = &self.description {
            template.insert("Description".to_string(), Json::String(description.clone()));
        }
        if !self.parameters.is_empty() {
            let parameters: serde_json::Map<String, Json> = self
                .parameters
                .iter()
                .map(|(name, parameter)| {
                    Ok((name.clone(), serde_json::to_value(parameter)?))
                })
                .collect::<ComposeResult<_>>()?;
            template.insert("Parameters".to_string(), Json::Object(parameters));
        }
        if !self.mappings.is_empty() {
            let mappings: serde_json::Map<String, Json> = self
                .mappings
                .iter()
                .map(|(name, table)| (name.clone(), table.clone()))
                .collect();
            template.insert("Mappings".to_string(), Json::Object(mappings));
        }
        let resources: serde_json::Map<String, Json> = self
            .resources
            .iter()
            .map(|(name, resource)| (name.clone(), resource.to_json()))
            .collect();
        template.insert("Resources".to_string(), Json::Object(resources));
        if !self.outputs.is_empty() {
            let outputs: serde_json::Map<String, Json> = self
                .outputs
                .iter()
                .map(|(name, output)| (name.clone(), output.to_json()))
                .collect();
            template.insert("Outputs".to_string(), Json::Object(outputs));
        }
        Ok(Json::Object(template))
    }

    /// Validate and serialize to a pretty-printed template string.
    pub fn to_json_string(&self) -> ComposeResult<String> {
        let json = self.to_json()?;
        serde_json::to_string_pretty(&json).map_err(Into::into)
    }

    /// Whether a name resolves to a parameter, resource or pseudo-parameter.
    fn resolves(&self, name: &str) -> bool {
        name.starts_with("AWS::")
            || self.parameters.contains_key(name)
            || self.resources.contains_key(name)
    }

    fn validate_references(&self) -> ComposeResult<()> {
        for (name, resource) in &self.resources {
            self.validate_json(resource.properties(), name)?;
        }
        for (name, output) in &self.outputs {
            let value = serde_json::to_value(&output.value)?;
            self.validate_json(&value, &format!("output '{name}'"))?;
        }
        Ok(())
    }

    /// Walk a serialized property tree and check every intrinsic reference.
    fn validate_json(&self, json: &Json, context: &str) -> ComposeResult<()> {
        match json {
            Json::Object(map) => {
                if map.len() == 1 {
                    if let Some(Json::String(target)) = map.get("Ref") {
                        if !self.resolves(target) {
                            return Err(ComposeError::unresolved(target, context));
                        }
                        return Ok(());
                    }
                    if let Some(Json::Array(args)) = map.get("Fn::GetAtt") {
                        if let Some(Json::String(target)) = args.first() {
                            if !self.resources.contains_key(target) {
                                return Err(ComposeError::unresolved(target, context));
                            }
                        }
                        return Ok(());
                    }
                    if let Some(Json::Array(args)) = map.get("Fn::FindInMap") {
                        if let Some(Json::String(map_name)) = args.first() {
                            if !self.mappings.contains_key(map_name) {
                                return Err(ComposeError::unresolved(map_name, context));
                            }
                        }
                        return Ok(());
                    }
                }
                for value in map.values() {
                    self.validate_json(value, context)?;
                }
                Ok(())
            }
            Json::Array(items) => {
                for item in items {
                    self.validate_json(item, context)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Empty {}

    impl ResourceProperties for Empty {
        const KIND: &'static str = "AWS::SQS::Queue";
    }

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct WithRef {
        queue: Value,
    }

    impl ResourceProperties for WithRef {
        const KIND: &'static str = "AWS::SQS::QueuePolicy";
    }

    #[test]
    fn duplicate_resource_name_is_rejected() {
        let mut topology = Topology::new();
        topology.add_resource("loggingQueue", &Empty {}).unwrap();
        let err = topology.add_resource("loggingQueue", &Empty {}).unwrap_err();
        assert_eq!(
            err,
            ComposeError::DuplicateName {
                kind: "resource",
                name: "loggingQueue".to_string()
            }
        );
    }

    #[test]
    fn get_or_create_parameter_reuses_identical_declaration() {
        let mut topology = Topology::new();
        let declaration =
            || Parameter::string("logShipperQueueName").description("Queue name");
        topology.get_or_create_parameter(declaration()).unwrap();
        topology.get_or_create_parameter(declaration()).unwrap();
        let conflicting = Parameter::number("logShipperQueueName");
        assert_eq!(
            topology.get_or_create_parameter(conflicting).unwrap_err(),
            ComposeError::DeclarationMismatch {
                kind: "parameter",
                name: "logShipperQueueName".to_string()
            }
        );
    }

    #[test]
    fn merged_mapping_accumulates_entries_from_independent_callers() {
        let mut topology = Topology::new();
        topology
            .merge_mapping("RegionMap", json!({"us-west-2": {"bastion": "ami-1234"}}))
            .unwrap();
        topology.merge_mapping("RegionMap", json!({})).unwrap();
        topology
            .merge_mapping("RegionMap", json!({"us-east-1": {"worker": "ami-5678"}}))
            .unwrap();
        // Identical re-declaration of an entry is reuse, not a conflict
        topology
            .merge_mapping("RegionMap", json!({"us-west-2": {"bastion": "ami-1234"}}))
            .unwrap();
        assert_eq!(
            topology.to_json().unwrap()["Mappings"]["RegionMap"],
            json!({
                "us-west-2": {"bastion": "ami-1234"},
                "us-east-1": {"worker": "ami-5678"}
            })
        );

        let conflict = topology
            .merge_mapping("RegionMap", json!({"us-west-2": {"bastion": "ami-9999"}}))
            .unwrap_err();
        assert_eq!(
            conflict,
            ComposeError::DeclarationMismatch {
                kind: "mapping",
                name: "RegionMap".to_string()
            }
        );
    }

    #[test]
    fn dangling_reference_fails_serialization() {
        let mut topology = Topology::new();
        topology
            .add_resource(
                "fileQueuePolicy",
                &WithRef {
                    queue: Value::reference("missingQueue"),
                },
            )
            .unwrap();
        let err = topology.to_json().unwrap_err();
        assert!(matches!(err, ComposeError::ReferenceResolution { ref name, .. } if name == "missingQueue"));
    }

    #[test]
    fn pseudo_parameters_always_resolve() {
        let mut topology = Topology::new();
        topology
            .add_resource(
                "fileQueuePolicy",
                &WithRef {
                    queue: Value::reference(PSEUDO_REGION),
                },
            )
            .unwrap();
        assert!(topology.to_json().is_ok());
    }

    #[test]
    fn serialization_preserves_registration_order() {
        let mut topology = Topology::with_description("ordering check");
        topology.add_resource("bQueue", &Empty {}).unwrap();
        topology.add_resource("aQueue", &Empty {}).unwrap();
        let json = topology.to_json().unwrap();
        let names: Vec<&String> = json["Resources"].as_object().unwrap().keys().collect();
        assert_eq!(names, ["bQueue", "aQueue"]);
    }

    #[test]
    fn outputs_are_validated_and_emitted() {
        let mut topology = Topology::new();
        let queue = topology.add_resource("loggingQueue", &Empty {}).unwrap();
        topology
            .add_output(
                Output::new("logShipperQueueName", queue.get_att("QueueName"))
                    .description("Name of the queue for log shipping"),
            )
            .unwrap();
        let json = topology.to_json().unwrap();
        assert_eq!(
            json["Outputs"]["logShipperQueueName"]["Value"],
            json!({"Fn::GetAtt": ["loggingQueue", "QueueName"]})
        );

        let mut broken = Topology::new();
        broken
            .add_output(Output::new("dangling", Value::reference("nothing")))
            .unwrap();
        assert!(broken.to_json().is_err());
    }
}
