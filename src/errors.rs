// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology declaration and synthesis

use thiserror::Error;

use crate::domain::{ComputeError, NetworkError, ValidationError};

/// Errors that can occur while declaring or synthesizing a topology
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Logical id is empty or contains characters CloudFormation rejects
    #[error("Invalid logical id: {0}")]
    InvalidLogicalId(String),

    /// Two declarations resolved to the same logical id
    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    /// A declaration references a resource that is not part of the stack
    #[error("Dangling reference: {from} references undeclared {to}")]
    DanglingReference { from: String, to: String },

    /// Declarations depend on each other in a cycle
    #[error("Cyclic dependency involving: {0}")]
    CyclicDependency(String),

    /// Subnet selection matched nothing
    #[error("Subnet selection error: {0}")]
    SubnetSelection(String),

    /// A construct property is out of range or inconsistent
    #[error("Invalid property on {resource}: {reason}")]
    InvalidProperty { resource: String, reason: String },

    /// Network value object error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Compute value object error
    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    /// Topology invariant violated
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Writing the template failed
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Serialization(err.to_string())
    }
}

impl TopologyError {
    pub(crate) fn invalid_property(resource: impl ToString, reason: impl Into<String>) -> Self {
        TopologyError::InvalidProperty {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }
}
