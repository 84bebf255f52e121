// Copyright (c) 2025 - Cowboy AI, Inc.
//! Template Synthesis
//!
//! Renders a [`Stack`] into a CloudFormation [`Template`] for the external
//! provisioning engine. Synthesis is a pure function of the stack:
//!
//! ```text
//! Stack ──synthesize()──> Template ──engine──> change set / apply
//!   │                        │
//!   │ declarations           │ Resources, Parameters, Outputs
//!   ▼                        ▼
//! [CfnResource]   ──>   {LogicalId: {Type, Properties, DependsOn}}
//! ```
//!
//! The only failure the declaration itself can produce surfaces here: a
//! `Ref` or `Fn::GetAtt` naming a logical id that is not declared.

pub mod template;

pub use template::{Template, TemplateResource};

use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::errors::{TopologyError, TopologyResult};
use crate::stack::Stack;

/// Metadata key recording the construct path of each resource
pub const PATH_METADATA_KEY: &str = "topology:path";

/// Pseudo parameters are `Ref`s the engine resolves itself
const PSEUDO_PREFIX: &str = "AWS::";

/// Collect every logical id referenced through `Ref` or `Fn::GetAtt`
pub(crate) fn collect_references<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !target.starts_with(PSEUDO_PREFIX) {
                        out.push(target);
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = args.first() {
                        out.push(target);
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

fn check_references(from: &str, value: &Value, declared: &BTreeSet<&str>) -> TopologyResult<()> {
    let mut refs = Vec::new();
    collect_references(value, &mut refs);

    match refs.into_iter().find(|target| !declared.contains(target)) {
        Some(target) => Err(TopologyError::DanglingReference {
            from: from.to_string(),
            to: target.to_string(),
        }),
        None => Ok(()),
    }
}

/// Render a stack into a template
///
/// # Errors
/// - [`TopologyError::DanglingReference`] when a resource, dependency or
///   output names an undeclared logical id
pub fn synthesize(stack: &Stack) -> TopologyResult<Template> {
    let declared: BTreeSet<&str> = stack
        .resources()
        .iter()
        .map(|r| r.logical_id().as_str())
        .chain(stack.parameters().keys().map(String::as_str))
        .collect();

    let mut template = Template {
        format_version: Template::FORMAT_VERSION.to_string(),
        description: stack.description().map(str::to_string),
        parameters: Default::default(),
        resources: Default::default(),
        outputs: Default::default(),
    };

    for resource in stack.resources() {
        let id = resource.logical_id().as_str();
        check_references(id, resource.properties(), &declared)?;

        let depends_on: Vec<String> = resource
            .depends_on()
            .iter()
            .map(|dep| dep.to_string())
            .collect();
        for dep in &depends_on {
            if !declared.contains(dep.as_str()) {
                return Err(TopologyError::DanglingReference {
                    from: id.to_string(),
                    to: dep.clone(),
                });
            }
        }

        template.resources.insert(
            id.to_string(),
            TemplateResource {
                resource_type: resource.resource_type().as_str().to_string(),
                properties: resource.properties().clone(),
                depends_on,
                metadata: Some(json!({ PATH_METADATA_KEY: resource.path().to_string() })),
            },
        );
    }

    for (name, parameter) in stack.parameters() {
        template
            .parameters
            .insert(name.clone(), serde_json::to_value(parameter)?);
    }

    for (name, output) in stack.outputs() {
        let value = serde_json::to_value(output)?;
        check_references(&format!("Outputs.{}", name), &value, &declared)?;
        template.outputs.insert(name.clone(), value);
    }

    debug!(parameters = template.parameters.len(), outputs = template.outputs.len(), "rendered template sections");
    info!(stack = stack.name(), resources = template.resources.len(), "synthesized template");

    Ok(template)
}
