// Copyright (c) 2025 - Cowboy AI, Inc.
//! CloudFormation Template Document

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::collect_references;
use crate::errors::{TopologyError, TopologyResult};

/// Synthesized template
///
/// All maps are ordered, so rendering the same stack twice yields
/// byte-identical JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub parameters: BTreeMap<String, Value>,
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub outputs: BTreeMap<String, Value>,
}

/// One entry of the `Resources` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<Value>,
}

impl Template {
    pub const FORMAT_VERSION: &'static str = "2010-09-09";

    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.get(logical_id)
    }

    /// Resources of one provider type, ordered by logical id
    pub fn resources_of_type(&self, provider_type: &str) -> Vec<(&str, &TemplateResource)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == provider_type)
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    /// Resource-to-resource edges from `Ref`, `Fn::GetAtt` and `DependsOn`
    ///
    /// Parameters are not part of the graph.
    pub fn dependencies(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.resources
            .iter()
            .map(|(id, resource)| {
                let mut refs = Vec::new();
                collect_references(&resource.properties, &mut refs);

                let edges = refs
                    .into_iter()
                    .chain(resource.depends_on.iter().map(String::as_str))
                    .filter(|target| self.resources.contains_key(*target))
                    .map(str::to_string)
                    .collect();

                (id.clone(), edges)
            })
            .collect()
    }

    /// Order in which the engine can create resources, dependencies first
    ///
    /// Ties are broken by logical id so the order is stable.
    pub fn creation_order(&self) -> TopologyResult<Vec<String>> {
        let dependencies = self.dependencies();

        let mut remaining: BTreeMap<&str, usize> = dependencies
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, pending)| **pending == 0)
                .map(|(id, _)| *id)
                .collect();

            if ready.is_empty() {
                let stuck: Vec<&str> = remaining.keys().copied().collect();
                return Err(TopologyError::CyclicDependency(stuck.join(", ")));
            }

            for id in ready {
                remaining.remove(id);
                for (dependent, deps) in &dependencies {
                    if deps.contains(id) {
                        if let Some(pending) = remaining.get_mut(dependent.as_str()) {
                            *pending -= 1;
                        }
                    }
                }
                order.push(id.to_string());
            }
        }

        Ok(order)
    }

    pub fn to_json_pretty(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> TopologyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the pretty JSON to `dir/file_name`, creating `dir` if needed
    pub fn write_to(&self, dir: &Path, file_name: &str) -> TopologyResult<PathBuf> {
        let json = self.to_json_pretty()?;
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let path = dir.join(file_name);
        fs::write(&path, json).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> TopologyError {
    TopologyError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
