// Copyright (c) 2025 - Cowboy AI, Inc.
//! PrivateLink topology declaration
//!
//! Declares a two-VPC network: a producer VPC exposing an instance through a
//! Network Load Balancer and a VPC Endpoint Service, and a consumer VPC that
//! reaches it through an Interface VPC Endpoint. The declaration is a single
//! synchronous pass producing an immutable [`Stack`], which [`synth`] renders
//! into a CloudFormation template for an external provisioning engine.
//!
//! # Layers
//!
//! - [`token`] - logical ids and lazy references (`Ref`, `Fn::GetAtt`, ...)
//! - [`stack`] - the ordered set of raw resource declarations
//! - [`domain`] - typed constructs (VPC, security group, instance, NLB, ...)
//! - [`topology`] - the producer/consumer wiring and its invariants
//! - [`synth`] - template rendering and dangling-reference detection
//!
//! # Example
//!
//! ```rust
//! use privatelink_topology::{PrivateLinkTopology, TopologyConfig};
//!
//! let topology = PrivateLinkTopology::build(&TopologyConfig::default()).unwrap();
//! let template = topology.synthesize().unwrap();
//! assert_eq!(template.resources_of_type("AWS::EC2::VPCEndpoint").len(), 1);
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod stack;
pub mod synth;
pub mod token;
pub mod topology;

// Re-export commonly used types
pub use config::TopologyConfig;
pub use errors::{TopologyError, TopologyResult};
pub use stack::{CfnResource, Stack};
pub use synth::{synthesize, Template};
pub use token::{ConstructPath, LogicalId, Reference, Token};
pub use topology::{ConsumerSide, PrivateLinkTopology, ProducerSide};
