// Copyright (c) 2025 - Cowboy AI, Inc.
//! Producer/consumer PrivateLink wiring
//!
//! Construction order:
//!
//! ```text
//! producer: Vpc -> SecurityGroup -> Instance -> NLB -> Listener/TargetGroup -> EndpointService
//! consumer: Vpc -> InterfaceEndpoint(service name, port)
//! ```
//!
//! The consumer learns the producer only through the endpoint service name
//! token, which the provisioning engine resolves after apply. Both VPCs are
//! built without an internet gateway.

use tracing::{debug, info};

use crate::config::TopologyConfig;
use crate::domain::invariants::validate_topology;
use crate::domain::{
    AddTargetsProps, Instance, InstanceIdTarget, InstanceProps, InterfaceVpcEndpoint,
    InterfaceVpcEndpointProps, InterfaceVpcEndpointService, Listener, ListenerProps,
    MachineImage, NetworkLoadBalancer, NetworkLoadBalancerProps, Peer, Port, Protocol,
    SecurityGroup, SubnetType, Vpc, VpcEndpointService, VpcProps,
};
use crate::errors::TopologyResult;
use crate::stack::{Output, Stack};
use crate::synth::{synthesize, Template};

/// Name of the output carrying the generated endpoint service name
pub const ENDPOINT_SERVICE_NAME_OUTPUT: &str = "EndpointServiceName";

const TARGET_GROUP_NAME: &str = "TargetGroup";

/// Service-owning side
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerSide {
    pub vpc: Vpc,
    pub security_group: SecurityGroup,
    pub instance: Instance,
    pub load_balancer: NetworkLoadBalancer,
    pub listener: Listener,
    pub endpoint_service: VpcEndpointService,
}

/// Service-using side
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerSide {
    pub vpc: Vpc,
    pub endpoint: InterfaceVpcEndpoint,
}

/// Declare the producer VPC, instance, load balancer and endpoint service
pub fn build_producer(stack: &mut Stack, config: &TopologyConfig) -> TopologyResult<ProducerSide> {
    let vpc = Vpc::declare(
        stack,
        "ProducerVpc",
        VpcProps::new(config.producer_cidr)
            .without_internet_gateway()
            .with_max_azs(config.max_azs),
    )?;
    let subnets = vpc.select_subnets(SubnetType::PrivateWithEgress)?;

    let security_group = SecurityGroup::builder("ProducerEC2SecurityGroup", &vpc)
        .add_ingress_rule(Peer::AnyIpv4, Port::AllTcp, "Allow all inbound")
        .declare(stack)?;

    let instance = Instance::declare(
        stack,
        "ProducerEC2",
        InstanceProps {
            vpc: &vpc,
            subnets: &subnets,
            instance_type: config.instance_type.clone(),
            machine_image: MachineImage::LatestAmazonLinux2,
            security_group: &security_group,
        },
    )?;

    let load_balancer = NetworkLoadBalancer::declare(
        stack,
        "NetworkLoadBalancer",
        NetworkLoadBalancerProps {
            vpc: &vpc,
            subnets: &subnets,
            internet_facing: false,
        },
    )?;

    let listener = load_balancer
        .listener(
            "NLB-Listener",
            ListenerProps {
                protocol: Protocol::Tcp,
                port: config.service_port,
            },
        )
        .add_targets(
            "NLB-Target",
            AddTargetsProps {
                protocol: Protocol::Tcp,
                port: config.service_port,
                target_group_name: Some(TARGET_GROUP_NAME.to_string()),
                targets: vec![InstanceIdTarget::new(
                    instance.instance_id(),
                    Some(config.service_port),
                )],
                health_check: None,
            },
        )
        .declare(stack)?;

    let endpoint_service =
        VpcEndpointService::declare(stack, "VpcEndpointService", &[&load_balancer], true)?;

    debug!(cidr = %config.producer_cidr, endpoint_service = %endpoint_service.path(), "producer side declared");

    Ok(ProducerSide {
        vpc,
        security_group,
        instance,
        load_balancer,
        listener,
        endpoint_service,
    })
}

/// Declare the consumer VPC and its interface endpoint to `service`
pub fn build_consumer(
    stack: &mut Stack,
    config: &TopologyConfig,
    service: &VpcEndpointService,
) -> TopologyResult<ConsumerSide> {
    let vpc = Vpc::declare(
        stack,
        "ConsumerVpc",
        VpcProps::new(config.consumer_cidr)
            .without_internet_gateway()
            .with_max_azs(config.max_azs),
    )?;
    let subnets = vpc.select_subnets(SubnetType::PrivateWithEgress)?;

    let endpoint = InterfaceVpcEndpoint::declare(
        stack,
        "VpcEndpoint",
        InterfaceVpcEndpointProps {
            vpc: &vpc,
            service: InterfaceVpcEndpointService::new(service.service_name(), config.service_port),
            subnets: &subnets,
            private_dns_enabled: false,
        },
    )?;

    debug!(cidr = %config.consumer_cidr, endpoint = %endpoint.path(), "consumer side declared");

    Ok(ConsumerSide { vpc, endpoint })
}

/// A fully declared and validated PrivateLink topology
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateLinkTopology {
    stack: Stack,
    producer: ProducerSide,
    consumer: ConsumerSide,
}

impl PrivateLinkTopology {
    /// Declare both sides in order and check the topology invariants
    ///
    /// # Errors
    /// - Configuration errors for an invalid stack name
    /// - Network errors for unusable CIDR blocks or AZ counts
    /// - [`crate::TopologyError::Validation`] when the producer and consumer
    ///   blocks overlap or the wiring is inconsistent
    pub fn build(config: &TopologyConfig) -> TopologyResult<Self> {
        let mut stack = Stack::new(config.stack_name.as_str())?.with_description(format!(
            "PrivateLink from {} (producer) to {} (consumer) on TCP/{}",
            config.producer_cidr, config.consumer_cidr, config.service_port
        ));

        let producer = build_producer(&mut stack, config)?;
        let consumer = build_consumer(&mut stack, config, &producer.endpoint_service)?;

        validate_topology(&producer, &consumer)?;

        stack.add_output(
            ENDPOINT_SERVICE_NAME_OUTPUT,
            Output {
                description: Some("Service name consumers connect to".to_string()),
                value: producer.endpoint_service.service_name(),
            },
        )?;

        info!(
            stack = stack.name(),
            resources = stack.resources().len(),
            "declared PrivateLink topology"
        );

        Ok(Self {
            stack,
            producer,
            consumer,
        })
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn producer(&self) -> &ProducerSide {
        &self.producer
    }

    pub fn consumer(&self) -> &ConsumerSide {
        &self.consumer
    }

    /// Render the template
    pub fn synthesize(&self) -> TopologyResult<Template> {
        synthesize(&self.stack)
    }
}
