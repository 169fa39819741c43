//! Cross-Stack Reference Resolver
//!
//! Two channels exist for values crossing topology boundaries:
//!
//! 1. **Embedding**: a child topology registered as a child-stack resource
//!    makes each of its declared outputs addressable from the parent as an
//!    attribute reference. Use-before-embed and unknown output names are
//!    rejected.
//! 2. **Degraded sibling path**: with no embedding relationship, the
//!    dependent side declares a plain parameter the operator supplies
//!    out-of-band (get-or-create, so a composition that already provides
//!    the value wins over the fallback declaration).

use serde_json::json;
use tracing::info;

use crate::errors::ComposeResult;
use crate::template::resource::Resource;
use crate::template::{EmbeddedChild, Parameter, ParameterId, ResourceId, Topology, Value};

impl Topology {
    /// Embed a child topology as a nested-stack resource.
    ///
    /// The child's declared outputs become addressable through
    /// [`Topology::child_output`]. `template_location` is where the child's
    /// serialized template will live at deploy time (upload is out of
    /// scope); `parameters` are the values the parent feeds the child.
    pub fn embed_child(
        &mut self,
        name: impl Into<String>,
        child: &Topology,
        template_location: Value,
        parameters: Vec<(String, Value)>,
    ) -> ComposeResult<ResourceId> {
        let name = name.into();
        let mut properties = serde_json::Map::new();
        properties.insert("TemplateURL".to_string(), json!(template_location));
        if !parameters.is_empty() {
            let map: serde_json::Map<String, serde_json::Value> = parameters
                .into_iter()
                .map(|(key, value)| (key, json!(value)))
                .collect();
            properties.insert("Parameters".to_string(), serde_json::Value::Object(map));
        }
        let resource = Resource::from_parts(
            "AWS::CloudFormation::Stack",
            serde_json::Value::Object(properties),
        );
        let id = self.add_raw_resource(name.clone(), resource)?;
        self.children.insert(
            name.clone(),
            EmbeddedChild {
                outputs: child.output_names(),
            },
        );
        info!(child = %name, "embedded child topology");
        Ok(id)
    }

    /// Attribute reference to an embedded child's declared output.
    ///
    /// Rejects stacks that were never embedded and outputs the child never
    /// declared, so use-before-define surfaces as a composition error rather
    /// than a deploy-time surprise.
    pub fn child_output(&self, stack: &str, output: &str) -> ComposeResult<Value> {
        let child = self.children.get(stack).ok_or_else(|| {
            crate::errors::ComposeError::unresolved(stack, "no embedded child stack with this name")
        })?;
        if !child.outputs.iter().any(|name| name == output) {
            return Err(crate::errors::ComposeError::unresolved(
                output,
                format!("output not declared by embedded stack '{stack}'"),
            ));
        }
        Ok(Value::get_att(stack, format!("Outputs.{output}")))
    }

    /// Degraded sibling path: declare (or reuse) a plain parameter for a
    /// value produced by a topology this one does not embed.
    pub fn import_parameter(&mut self, parameter: Parameter) -> ComposeResult<ParameterId> {
        self.get_or_create_parameter(parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ComposeError;
    use crate::resources::sqs::Queue;
    use crate::template::Output;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn child_with_queue_outputs() -> Topology {
        let mut child = Topology::new();
        let queue = child.add_resource("loggingQueue", &Queue::new()).unwrap();
        child
            .add_output(
                Output::new("logShipperQueueName", queue.get_att("QueueName"))
                    .description("Name of the queue for log shipping"),
            )
            .unwrap();
        child
            .add_output(
                Output::new("logShipperQueueRegion", Value::reference("AWS::Region"))
                    .description("Region where the log shipping queue is deployed"),
            )
            .unwrap();
        child
    }

    #[test]
    fn child_outputs_resolve_only_after_embedding() {
        let child = child_with_queue_outputs();
        let mut parent = Topology::new();

        // Not reachable before embedding
        let err = parent.child_output("loggingStack", "logShipperQueueName").unwrap_err();
        assert!(matches!(err, ComposeError::ReferenceResolution { ref name, .. } if name == "loggingStack"));

        parent
            .embed_child(
                "loggingStack",
                &child,
                Value::from("https://templates.example.com/logging.template"),
                vec![],
            )
            .unwrap();

        let reference = parent
            .child_output("loggingStack", "logShipperQueueName")
            .unwrap();
        assert_eq!(
            serde_json::to_value(&reference).unwrap(),
            json!({"Fn::GetAtt": ["loggingStack", "Outputs.logShipperQueueName"]})
        );
    }

    #[test]
    fn undeclared_child_output_is_rejected() {
        let child = child_with_queue_outputs();
        let mut parent = Topology::new();
        parent
            .embed_child("loggingStack", &child, Value::from("https://t/l.template"), vec![])
            .unwrap();

        let err = parent.child_output("loggingStack", "missingOutput").unwrap_err();
        assert!(matches!(err, ComposeError::ReferenceResolution { ref name, .. } if name == "missingOutput"));
    }

    #[test]
    fn embedded_stack_resource_carries_parameters() {
        let child = child_with_queue_outputs();
        let mut parent = Topology::new();
        parent
            .embed_child(
                "loggingStack",
                &child,
                Value::from("https://t/l.template"),
                vec![("bastionSecurityGroup".to_string(), Value::reference("AWS::Region"))],
            )
            .unwrap();
        let resource = parent.resource("loggingStack").unwrap();
        assert_eq!(resource.kind(), "AWS::CloudFormation::Stack");
        assert_eq!(
            resource.properties()["Parameters"]["bastionSecurityGroup"],
            json!({"Ref": "AWS::Region"})
        );
    }

    #[test]
    fn import_parameter_reuses_existing_declaration() {
        let mut topology = Topology::new();
        let declaration =
            || Parameter::string("logShipperQueueName").description("Name of the SQS queue used for logging");
        topology.import_parameter(declaration()).unwrap();
        topology.import_parameter(declaration()).unwrap();
        assert!(topology.has_parameter("logShipperQueueName"));
    }
}
