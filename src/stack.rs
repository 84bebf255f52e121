// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack - the ordered set of raw resource declarations
//!
//! Typed constructs in [`crate::domain`] render themselves into
//! [`CfnResource`]s and register them here. The stack only enforces
//! structural rules (unique logical ids); reference checking happens at
//! synthesis, once everything has been declared.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::domain::ResourceType;
use crate::errors::{TopologyError, TopologyResult};
use crate::token::{ConstructPath, LogicalId, Token};

/// Maximum CloudFormation stack name length
const MAX_STACK_NAME_LENGTH: usize = 128;

/// A single provider resource declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CfnResource {
    logical_id: LogicalId,
    path: ConstructPath,
    resource_type: ResourceType,
    properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<LogicalId>,
}

impl CfnResource {
    /// Create a declaration at `path`, rendering `properties` to JSON
    pub fn new(
        path: ConstructPath,
        resource_type: ResourceType,
        properties: impl Serialize,
    ) -> TopologyResult<Self> {
        Ok(Self {
            logical_id: path.logical_id()?,
            path,
            resource_type,
            properties: serde_json::to_value(properties)?,
            depends_on: Vec::new(),
        })
    }

    /// Add explicit creation-order dependencies
    pub fn with_depends_on(mut self, ids: impl IntoIterator<Item = LogicalId>) -> Self {
        for id in ids {
            if !self.depends_on.contains(&id) {
                self.depends_on.push(id);
            }
        }
        self
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn properties(&self) -> &Value {
        &self.properties
    }

    pub fn depends_on(&self) -> &[LogicalId] {
        &self.depends_on
    }
}

/// Template parameter supplied by the engine at apply time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,
    pub default: String,
}

/// Template output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Token,
}

/// Immutable-once-built collection of declarations
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: Vec<CfnResource>,
    parameters: BTreeMap<String, Parameter>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    /// Create an empty stack
    ///
    /// # Invariants
    /// - Name starts with a letter
    /// - Name contains only alphanumerics and hyphens, at most 128 characters
    pub fn new(name: impl Into<String>) -> TopologyResult<Self> {
        let name = name.into();

        let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

        if !starts_with_letter || !valid_chars || name.len() > MAX_STACK_NAME_LENGTH {
            return Err(TopologyError::Configuration(format!(
                "invalid stack name: {:?}",
                name
            )));
        }

        Ok(Self {
            name,
            description: None,
            resources: Vec::new(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
        })
    }

    /// Set the template description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Root construct path of this stack
    pub fn path(&self) -> ConstructPath {
        ConstructPath::root(&self.name)
    }

    /// Register a declaration
    ///
    /// # Invariants
    /// - Logical id unique across resources and parameters
    pub fn declare(&mut self, resource: CfnResource) -> TopologyResult<LogicalId> {
        let id = resource.logical_id().clone();

        if self.contains(&id) || self.parameters.contains_key(id.as_str()) {
            return Err(TopologyError::DuplicateLogicalId(id.to_string()));
        }

        debug!(
            logical_id = %id,
            resource_type = resource.resource_type().as_str(),
            path = %resource.path(),
            "declared resource"
        );

        self.resources.push(resource);
        Ok(id)
    }

    /// Register a template parameter
    ///
    /// Re-adding an identical parameter is a no-op, so several constructs
    /// can share one image lookup.
    pub fn add_parameter(&mut self, name: impl Into<String>, parameter: Parameter) -> TopologyResult<()> {
        let name = name.into();

        if self.resources.iter().any(|r| r.logical_id().as_str() == name) {
            return Err(TopologyError::DuplicateLogicalId(name));
        }

        match self.parameters.get(&name) {
            Some(existing) if *existing == parameter => Ok(()),
            Some(_) => Err(TopologyError::DuplicateLogicalId(name)),
            None => {
                self.parameters.insert(name, parameter);
                Ok(())
            }
        }
    }

    /// Register a template output
    pub fn add_output(&mut self, name: impl Into<String>, output: Output) -> TopologyResult<()> {
        let name = LogicalId::new(name.into())?;

        if self.outputs.contains_key(name.as_str()) {
            return Err(TopologyError::DuplicateLogicalId(name.to_string()));
        }

        self.outputs.insert(name.to_string(), output);
        Ok(())
    }

    /// New declaration version with one resource removed
    ///
    /// Anything that referenced the removed resource is left dangling and
    /// will fail synthesis.
    pub fn without(&self, id: &LogicalId) -> Stack {
        info!(logical_id = %id, stack = %self.name, "removing declaration");

        let mut stack = self.clone();
        stack.resources.retain(|r| r.logical_id() != id);
        stack
    }

    pub fn contains(&self, id: &LogicalId) -> bool {
        self.resources.iter().any(|r| r.logical_id() == id)
    }

    pub fn resource(&self, id: &LogicalId) -> Option<&CfnResource> {
        self.resources.iter().find(|r| r.logical_id() == id)
    }

    /// Declarations in declaration order
    pub fn resources(&self) -> &[CfnResource] {
        &self.resources
    }

    pub fn resources_of_type(&self, resource_type: ResourceType) -> Vec<&CfnResource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type() == resource_type)
            .collect()
    }

    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }
}
