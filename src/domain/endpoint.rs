// Copyright (c) 2025 - Cowboy AI, Inc.
//! PrivateLink: Endpoint Service and Interface Endpoint
//!
//! The producer publishes its load balancer as a [`VpcEndpointService`]; the
//! consumer connects with an [`InterfaceVpcEndpoint`] that knows the service
//! only by its provider-generated name.

use serde_json::json;
use tracing::debug;

use super::compute::{Peer, Port, SecurityGroup};
use super::load_balancer::NetworkLoadBalancer;
use super::network::{SelectedSubnets, Vpc};
use super::ResourceType;
use crate::errors::{TopologyError, TopologyResult};
use crate::stack::{CfnResource, Stack};
use crate::token::{ConstructPath, PseudoParameter, Reference, Token};

/// A declared endpoint service
#[derive(Debug, Clone, PartialEq)]
pub struct VpcEndpointService {
    reference: Reference<VpcEndpointService>,
    path: ConstructPath,
    load_balancers: Vec<Reference<NetworkLoadBalancer>>,
    acceptance_required: bool,
}

impl VpcEndpointService {
    /// Declare a service fronted by the given load balancers
    pub fn declare(
        stack: &mut Stack,
        id: &str,
        load_balancers: &[&NetworkLoadBalancer],
        acceptance_required: bool,
    ) -> TopologyResult<VpcEndpointService> {
        let path = stack.path().child(id);

        if load_balancers.is_empty() {
            return Err(TopologyError::invalid_property(
                &path,
                "endpoint service needs at least one load balancer",
            ));
        }

        let arns: Vec<Token> = load_balancers.iter().map(|lb| lb.load_balancer_arn()).collect();

        let id = stack.declare(CfnResource::new(
            path.child("Resource"),
            ResourceType::VpcEndpointService,
            json!({
                "AcceptanceRequired": acceptance_required,
                "NetworkLoadBalancerArns": arns,
            }),
        )?)?;

        debug!(endpoint_service = %id, acceptance_required, "declared endpoint service");

        Ok(VpcEndpointService {
            reference: Reference::new(id),
            path,
            load_balancers: load_balancers
                .iter()
                .map(|lb| lb.reference().clone())
                .collect(),
            acceptance_required,
        })
    }

    pub fn reference(&self) -> &Reference<VpcEndpointService> {
        &self.reference
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// `com.amazonaws.vpce.<region>.<service id>`, known only after apply
    pub fn service_name(&self) -> Token {
        Token::Join {
            delimiter: String::new(),
            parts: vec![
                Token::literal("com.amazonaws.vpce."),
                Token::Pseudo(PseudoParameter::Region),
                Token::literal("."),
                self.reference.to_ref(),
            ],
        }
    }

    pub fn load_balancers(&self) -> &[Reference<NetworkLoadBalancer>] {
        &self.load_balancers
    }

    /// Whether connection requests wait for manual approval
    pub fn acceptance_required(&self) -> bool {
        self.acceptance_required
    }
}

/// Service an interface endpoint connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceVpcEndpointService {
    pub name: Token,
    pub port: u16,
}

impl InterfaceVpcEndpointService {
    pub fn new(name: Token, port: u16) -> Self {
        Self { name, port }
    }
}

/// Interface endpoint configuration
#[derive(Debug, Clone)]
pub struct InterfaceVpcEndpointProps<'a> {
    pub vpc: &'a Vpc,
    pub service: InterfaceVpcEndpointService,
    pub subnets: &'a SelectedSubnets,
    pub private_dns_enabled: bool,
}

/// A declared interface endpoint and its security group
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceVpcEndpoint {
    reference: Reference<InterfaceVpcEndpoint>,
    path: ConstructPath,
    service: InterfaceVpcEndpointService,
    vpc: Reference<Vpc>,
    security_group: SecurityGroup,
}

impl InterfaceVpcEndpoint {
    /// Declare the endpoint; its security group admits the service port from
    /// the whole VPC block
    pub fn declare(
        stack: &mut Stack,
        id: &str,
        props: InterfaceVpcEndpointProps<'_>,
    ) -> TopologyResult<InterfaceVpcEndpoint> {
        let path = stack.path().child(id);

        if props.service.port == 0 {
            return Err(TopologyError::invalid_property(&path, "port must be 1-65535"));
        }
        if props
            .subnets
            .subnets()
            .iter()
            .any(|s| !props.vpc.subnets().contains(s))
        {
            return Err(TopologyError::SubnetSelection(format!(
                "{}: selected subnets are not part of {}",
                path,
                props.vpc.path()
            )));
        }

        let peer = Peer::VpcCidr(props.vpc.reference().clone());
        let port = Port::Tcp(props.service.port);
        let description = Token::Join {
            delimiter: String::new(),
            parts: vec![
                Token::literal("from "),
                peer.cidr_ip(),
                Token::literal(format!(":{}", port)),
            ],
        };

        let security_group = SecurityGroup::builder("SecurityGroup", props.vpc)
            .scoped(path.clone())
            .add_ingress_rule(peer, port, description)
            .declare(stack)?;

        let id = stack.declare(CfnResource::new(
            path.child("Resource"),
            ResourceType::VpcEndpoint,
            json!({
                "PrivateDnsEnabled": props.private_dns_enabled,
                "SecurityGroupIds": [security_group.group_id()],
                "ServiceName": props.service.name,
                "SubnetIds": props.subnets.subnet_ids(),
                "VpcEndpointType": "Interface",
                "VpcId": props.vpc.vpc_id(),
            }),
        )?)?;

        debug!(endpoint = %id, service = %props.service.name, "declared interface endpoint");

        Ok(InterfaceVpcEndpoint {
            reference: Reference::new(id),
            path,
            service: props.service,
            vpc: props.vpc.reference().clone(),
            security_group,
        })
    }

    pub fn reference(&self) -> &Reference<InterfaceVpcEndpoint> {
        &self.reference
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn service(&self) -> &InterfaceVpcEndpointService {
        &self.service
    }

    pub fn vpc(&self) -> &Reference<Vpc> {
        &self.vpc
    }

    pub fn security_group(&self) -> &SecurityGroup {
        &self.security_group
    }
}
