// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Business rules the declared PrivateLink topology must satisfy before it is
//! handed to the provisioning engine. All functions are pure (no side
//! effects) and return detailed validation results.
//!
//! # Invariants
//!
//! 1. **Address space**: producer and consumer networks never overlap
//! 2. **Targets**: exactly one target, the producer instance
//! 3. **Acceptance**: endpoint connections need manual approval
//! 4. **Binding**: the endpoint names the producer's service and listener port

use crate::domain::{
    Instance, InterfaceVpcEndpoint, Ipv4Cidr, Listener, TargetGroup, VpcEndpointService,
};
use crate::topology::{ConsumerSide, ProducerSide};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Address spaces overlap
    #[error("Networks overlap: {producer} and {consumer}")]
    OverlappingNetworks {
        producer: Ipv4Cidr,
        consumer: Ipv4Cidr,
    },

    /// Wrong number of targets registered
    #[error("Target group must have exactly {expected} target(s), found {actual}")]
    TargetCount { expected: usize, actual: usize },

    /// Target does not point at the declared instance
    #[error("Target {actual} does not reference instance {expected}")]
    TargetMismatch { expected: String, actual: String },

    /// Endpoint service accepts connections without approval
    #[error("Endpoint service {0} must require acceptance")]
    AcceptanceNotRequired(String),

    /// Endpoint points at some other service
    #[error("Endpoint service name {actual} does not match {expected}")]
    ServiceNameMismatch { expected: String, actual: String },

    /// Endpoint port differs from the listener port
    #[error("Endpoint port {endpoint} does not match listener port {listener}")]
    PortMismatch { listener: u16, endpoint: u16 },
}

/// Validate the producer and consumer networks are disjoint
///
/// # Rules
/// - No address may belong to both blocks
pub fn validate_disjoint_networks(producer: &Ipv4Cidr, consumer: &Ipv4Cidr) -> ValidationResult {
    if producer.overlaps(consumer) {
        return Err(ValidationError::OverlappingNetworks {
            producer: *producer,
            consumer: *consumer,
        });
    }
    Ok(())
}

/// Validate the target group's sole target is the instance
///
/// # Rules
/// - Exactly one target
/// - Its id token is the instance's id token
pub fn validate_single_target(target_group: &TargetGroup, instance: &Instance) -> ValidationResult {
    let targets = target_group.targets();

    if targets.len() != 1 {
        return Err(ValidationError::TargetCount {
            expected: 1,
            actual: targets.len(),
        });
    }

    let expected = instance.instance_id();
    if targets[0].instance_id != expected {
        return Err(ValidationError::TargetMismatch {
            expected: expected.to_string(),
            actual: targets[0].instance_id.to_string(),
        });
    }

    Ok(())
}

/// Validate the endpoint service requires manual acceptance
pub fn validate_acceptance_required(service: &VpcEndpointService) -> ValidationResult {
    if !service.acceptance_required() {
        return Err(ValidationError::AcceptanceNotRequired(
            service.path().to_string(),
        ));
    }
    Ok(())
}

/// Validate the endpoint is bound to the service and the listener port
///
/// # Rules
/// - Service name token equals the endpoint service's generated name
/// - Endpoint port equals the listener port
pub fn validate_endpoint_binding(
    endpoint: &InterfaceVpcEndpoint,
    service: &VpcEndpointService,
    listener: &Listener,
) -> ValidationResult {
    let expected = service.service_name();
    let bound = endpoint.service();

    if bound.name != expected {
        return Err(ValidationError::ServiceNameMismatch {
            expected: expected.to_string(),
            actual: bound.name.to_string(),
        });
    }

    if bound.port != listener.port() {
        return Err(ValidationError::PortMismatch {
            listener: listener.port(),
            endpoint: bound.port,
        });
    }

    Ok(())
}

/// Composite validation of a declared topology
pub fn validate_topology(producer: &ProducerSide, consumer: &ConsumerSide) -> ValidationResult {
    validate_disjoint_networks(&producer.vpc.cidr(), &consumer.vpc.cidr())?;
    validate_single_target(producer.listener.target_group(), &producer.instance)?;
    validate_acceptance_required(&producer.endpoint_service)?;
    validate_endpoint_binding(
        &consumer.endpoint,
        &producer.endpoint_service,
        &producer.listener,
    )?;
    Ok(())
}
