// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Typed constructs for the PrivateLink topology. Each construct validates its
//! own properties, renders one or more raw declarations into a
//! [`Stack`](crate::stack::Stack), and hands back a handle whose identifiers
//! are lazy [`Token`](crate::token::Token)s.
//!
//! # Value Objects with Invariants
//!
//! - [`Ipv4Cidr`] - IPv4 network block, no host bits
//! - [`InstanceType`] - `family.size` instance class
//! - [`ResourceType`] - provider resource taxonomy
//!
//! # Constructs
//!
//! - [`Vpc`] - network with per-AZ subnets
//! - [`SecurityGroup`] - ingress/egress rule set
//! - [`Instance`] - compute instance with role and profile
//! - [`NetworkLoadBalancer`], [`Listener`], [`TargetGroup`] - layer-4 load balancing
//! - [`VpcEndpointService`], [`InterfaceVpcEndpoint`] - PrivateLink producer and consumer
//!
//! # Late-bound References
//!
//! Only two references cross ownership: target group → instance id and
//! interface endpoint → endpoint service name. Both are tokens resolved by
//! the provisioning engine, not pointers.

pub mod compute;
pub mod endpoint;
pub mod invariants;
pub mod load_balancer;
pub mod network;
pub mod resource_type;

use serde::{Deserialize, Serialize};

use crate::token::ConstructPath;

// Re-export value objects and constructs
pub use compute::{
    ComputeError, IngressRule, Instance, InstanceProps, InstanceType, MachineImage, Peer, Port,
    SecurityGroup, SecurityGroupBuilder,
};
pub use endpoint::{
    InterfaceVpcEndpoint, InterfaceVpcEndpointProps, InterfaceVpcEndpointService,
    VpcEndpointService,
};
pub use invariants::{ValidationError, ValidationResult};
pub use load_balancer::{
    AddTargetsProps, HealthCheck, InstanceIdTarget, Listener, ListenerBuilder, ListenerProps,
    NetworkLoadBalancer, NetworkLoadBalancerProps, Protocol, TargetGroup,
};
pub use network::{Ipv4Cidr, NetworkError, SelectedSubnets, Subnet, SubnetType, Vpc, VpcProps};
pub use resource_type::{ResourceCategory, ResourceType};

/// Resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// `Name` tag carrying the construct path
pub(crate) fn name_tags(path: &ConstructPath) -> Vec<Tag> {
    vec![Tag::new("Name", path.to_string())]
}
