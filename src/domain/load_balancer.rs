// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Load Balancer, Listener and Target Group
//!
//! The target group is built from a raw instance id rather than from the
//! instance construct, and its protocol is declared on its own instead of
//! being inherited from the listener. A mismatch between the two is logged
//! and kept as declared.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, warn};

use super::network::{SelectedSubnets, Vpc};
use super::ResourceType;
use crate::errors::{TopologyError, TopologyResult};
use crate::stack::{CfnResource, Stack};
use crate::token::{ConstructPath, Reference, Token};

/// Longest target group name the provider accepts
const MAX_TARGET_GROUP_NAME: usize = 32;

/// Layer-4 protocols understood by a network load balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Protocol {
    Tcp,
    Udp,
    TcpUdp,
    Tls,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::TcpUdp => "TCP_UDP",
            Self::Tls => "TLS",
        };
        write!(f, "{}", name)
    }
}

fn validate_port(path: &ConstructPath, port: u16) -> TopologyResult<()> {
    if port == 0 {
        return Err(TopologyError::invalid_property(path, "port must be 1-65535"));
    }
    Ok(())
}

/// Load balancer configuration
#[derive(Debug, Clone)]
pub struct NetworkLoadBalancerProps<'a> {
    pub vpc: &'a Vpc,
    pub subnets: &'a SelectedSubnets,
    pub internet_facing: bool,
}

/// A declared network load balancer
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLoadBalancer {
    reference: Reference<NetworkLoadBalancer>,
    path: ConstructPath,
    vpc: Reference<Vpc>,
    internet_facing: bool,
}

impl NetworkLoadBalancer {
    /// Declare a load balancer in the selected subnets
    ///
    /// # Invariants
    /// - Subnets belong to `vpc`
    /// - Internet-facing requires an internet gateway
    pub fn declare(
        stack: &mut Stack,
        id: &str,
        props: NetworkLoadBalancerProps<'_>,
    ) -> TopologyResult<NetworkLoadBalancer> {
        let path = stack.path().child(id);

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
        if props.internet_facing && !props.vpc.has_internet_gateway() {
            return Err(TopologyError::invalid_property(
                &path,
                "internet-facing load balancer in a VPC without an internet gateway",
            ));
        }

        let scheme = if props.internet_facing {
            "internet-facing"
        } else {
            "internal"
        };

        let id = stack.declare(CfnResource::new(
            path.child("Resource"),
            ResourceType::LoadBalancer,
            json!({
                "LoadBalancerAttributes": [
                    { "Key": "deletion_protection.enabled", "Value": "false" }
                ],
                "Scheme": scheme,
                "Subnets": props.subnets.subnet_ids(),
                "Type": "network",
            }),
        )?)?;

        debug!(load_balancer = %id, scheme, "declared network load balancer");

        Ok(NetworkLoadBalancer {
            reference: Reference::new(id),
            path,
            vpc: props.vpc.reference().clone(),
            internet_facing: props.internet_facing,
        })
    }

    pub fn reference(&self) -> &Reference<NetworkLoadBalancer> {
        &self.reference
    }

    pub fn load_balancer_arn(&self) -> Token {
        self.reference.to_ref()
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn vpc(&self) -> &Reference<Vpc> {
        &self.vpc
    }

    pub fn is_internet_facing(&self) -> bool {
        self.internet_facing
    }

    /// Start a listener; it is declared together with its targets
    pub fn listener(&self, id: impl Into<String>, props: ListenerProps) -> ListenerBuilder {
        ListenerBuilder {
            load_balancer: self.clone(),
            id: id.into(),
            props,
            targets: None,
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerProps {
    pub protocol: Protocol,
    pub port: u16,
}

/// Backend registered by raw instance id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdTarget {
    pub instance_id: Token,
    pub port: Option<u16>,
}

impl InstanceIdTarget {
    pub fn new(instance_id: Token, port: Option<u16>) -> Self {
        Self { instance_id, port }
    }
}

/// Explicit health check settings
///
/// Unset fields are left to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub enabled: bool,
    pub protocol: Option<Protocol>,
    pub port: Option<u16>,
    pub interval_seconds: Option<u16>,
    pub healthy_threshold: Option<u8>,
    pub unhealthy_threshold: Option<u8>,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            enabled: true,
            protocol: None,
            port: None,
            interval_seconds: None,
            healthy_threshold: None,
            unhealthy_threshold: None,
        }
    }
}

/// Target group configuration attached through a listener
#[derive(Debug, Clone, PartialEq)]
pub struct AddTargetsProps {
    pub protocol: Protocol,
    pub port: u16,
    pub target_group_name: Option<String>,
    pub targets: Vec<InstanceIdTarget>,
    /// `None` leaves health checking at provider defaults
    pub health_check: Option<HealthCheck>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct HealthCheckProperties {
    health_check_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_check_interval_seconds: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_check_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_check_protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    healthy_threshold_count: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unhealthy_threshold_count: Option<u8>,
}

impl From<&HealthCheck> for HealthCheckProperties {
    fn from(check: &HealthCheck) -> Self {
        Self {
            health_check_enabled: check.enabled,
            health_check_interval_seconds: check.interval_seconds,
            health_check_port: check.port.map(|p| p.to_string()),
            health_check_protocol: check.protocol,
            healthy_threshold_count: check.healthy_threshold,
            unhealthy_threshold_count: check.unhealthy_threshold,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TargetProperties {
    id: Token,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TargetGroupProperties {
    #[serde(flatten)]
    health_check: Option<HealthCheckProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    port: u16,
    protocol: Protocol,
    target_type: &'static str,
    targets: Vec<TargetProperties>,
    vpc_id: Token,
}

/// A declared target group
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroup {
    reference: Reference<TargetGroup>,
    path: ConstructPath,
    name: Option<String>,
    protocol: Protocol,
    port: u16,
    targets: Vec<InstanceIdTarget>,
    health_check: Option<HealthCheck>,
}

impl TargetGroup {
    fn validate_name(path: &ConstructPath, name: &str) -> TopologyResult<()> {
        let valid = !name.is_empty()
            && name.len() <= MAX_TARGET_GROUP_NAME
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !name.starts_with('-')
            && !name.ends_with('-');

        if !valid {
            return Err(TopologyError::invalid_property(
                path,
                format!("invalid target group name {:?}", name),
            ));
        }
        Ok(())
    }

    fn declare(
        stack: &mut Stack,
        path: ConstructPath,
        vpc: &Reference<Vpc>,
        props: AddTargetsProps,
    ) -> TopologyResult<TargetGroup> {
        validate_port(&path, props.port)?;
        if let Some(name) = &props.target_group_name {
            Self::validate_name(&path, name)?;
        }

        let properties = TargetGroupProperties {
            health_check: props.health_check.as_ref().map(HealthCheckProperties::from),
            name: props.target_group_name.clone(),
            port: props.port,
            protocol: props.protocol,
            target_type: "instance",
            targets: props
                .targets
                .iter()
                .map(|t| TargetProperties {
                    id: t.instance_id.clone(),
                    port: t.port,
                })
                .collect(),
            vpc_id: vpc.to_ref(),
        };

        let id = stack.declare(CfnResource::new(
            path.child("Resource"),
            ResourceType::TargetGroup,
            properties,
        )?)?;

        debug!(
            target_group = %id,
            targets = props.targets.len(),
            default_health_check = props.health_check.is_none(),
            "declared target group"
        );

        Ok(TargetGroup {
            reference: Reference::new(id),
            path,
            name: props.target_group_name,
            protocol: props.protocol,
            port: props.port,
            targets: props.targets,
            health_check: props.health_check,
        })
    }

    pub fn reference(&self) -> &Reference<TargetGroup> {
        &self.reference
    }

    pub fn target_group_arn(&self) -> Token {
        self.reference.to_ref()
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn targets(&self) -> &[InstanceIdTarget] {
        &self.targets
    }

    pub fn health_check(&self) -> Option<&HealthCheck> {
        self.health_check.as_ref()
    }
}

/// Listener not yet declared
#[derive(Debug, Clone)]
pub struct ListenerBuilder {
    load_balancer: NetworkLoadBalancer,
    id: String,
    props: ListenerProps,
    targets: Option<(String, AddTargetsProps)>,
}

impl ListenerBuilder {
    /// Attach the default target group
    pub fn add_targets(mut self, id: impl Into<String>, props: AddTargetsProps) -> Self {
        self.targets = Some((id.into(), props));
        self
    }

    /// Declare the target group, then the listener forwarding to it
    pub fn declare(self, stack: &mut Stack) -> TopologyResult<Listener> {
        let path = self.load_balancer.path.child(&self.id);
        validate_port(&path, self.props.port)?;

        let (target_id, target_props) = self.targets.ok_or_else(|| {
            TopologyError::invalid_property(
                &path,
                "listener needs at least one default action or target group",
            )
        })?;

        if target_props.protocol != self.props.protocol {
            warn!(
                listener = %path,
                listener_protocol = %self.props.protocol,
                target_protocol = %target_props.protocol,
                "target group protocol differs from listener protocol"
            );
        }

        let target_group = TargetGroup::declare(
            stack,
            path.child(format!("{}Group", target_id)),
            &self.load_balancer.vpc,
            target_props,
        )?;

        let id = stack.declare(CfnResource::new(
            path.child("Resource"),
            ResourceType::Listener,
            json!({
                "DefaultActions": [{
                    "TargetGroupArn": target_group.target_group_arn(),
                    "Type": "forward",
                }],
                "LoadBalancerArn": self.load_balancer.load_balancer_arn(),
                "Port": self.props.port,
                "Protocol": self.props.protocol,
            }),
        )?)?;

        debug!(listener = %id, port = self.props.port, "declared listener");

        Ok(Listener {
            reference: Reference::new(id),
            path,
            protocol: self.props.protocol,
            port: self.props.port,
            load_balancer: self.load_balancer.reference.clone(),
            target_group,
        })
    }
}

/// A declared listener and its default target group
#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    reference: Reference<Listener>,
    path: ConstructPath,
    protocol: Protocol,
    port: u16,
    load_balancer: Reference<NetworkLoadBalancer>,
    target_group: TargetGroup,
}

impl Listener {
    pub fn reference(&self) -> &Reference<Listener> {
        &self.reference
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn load_balancer(&self) -> &Reference<NetworkLoadBalancer> {
        &self.load_balancer
    }

    pub fn target_group(&self) -> &TargetGroup {
        &self.target_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::{Ipv4Cidr, SubnetType, VpcProps};
    use crate::token::LogicalId;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn load_balancer(stack: &mut Stack) -> NetworkLoadBalancer {
        let props = VpcProps::new(Ipv4Cidr::new("10.21.0.0/16").unwrap()).without_internet_gateway();
        let vpc = Vpc::declare(stack, "ProducerVpc", props).unwrap();
        let subnets = vpc.select_subnets(SubnetType::PrivateWithEgress).unwrap();
        NetworkLoadBalancer::declare(
            stack,
            "NetworkLoadBalancer",
            NetworkLoadBalancerProps {
                vpc: &vpc,
                subnets: &subnets,
                internet_facing: false,
            },
        )
        .unwrap()
    }

    fn instance_target() -> InstanceIdTarget {
        InstanceIdTarget::new(Token::Ref(LogicalId::new("ProducerEC2").unwrap()), Some(80))
    }

    fn tcp_targets(protocol: Protocol) -> AddTargetsProps {
        AddTargetsProps {
            protocol,
            port: 80,
            target_group_name: Some("TargetGroup".to_string()),
            targets: vec![instance_target()],
            health_check: None,
        }
    }

    #[test]
    fn test_listener_forwards_to_target_group() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);

        let listener = nlb
            .listener("NLB-Listener", ListenerProps { protocol: Protocol::Tcp, port: 80 })
            .add_targets("NLB-Target", tcp_targets(Protocol::Tcp))
            .declare(&mut stack)
            .unwrap();

        assert_eq!(
            listener.target_group().reference().logical_id().as_str(),
            "NetworkLoadBalancerNLBListenerNLBTargetGroup"
        );

        let resource = stack.resource(listener.reference().logical_id()).unwrap();
        assert_eq!(
            resource.properties()["DefaultActions"],
            json!([{
                "TargetGroupArn": {"Ref": "NetworkLoadBalancerNLBListenerNLBTargetGroup"},
                "Type": "forward",
            }])
        );
        assert_eq!(resource.properties()["Protocol"], json!("TCP"));
    }

    #[test]
    fn test_default_health_check_emits_nothing() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);

        let listener = nlb
            .listener("L", ListenerProps { protocol: Protocol::Tcp, port: 80 })
            .add_targets("T", tcp_targets(Protocol::Tcp))
            .declare(&mut stack)
            .unwrap();

        let group = stack
            .resource(listener.target_group().reference().logical_id())
            .unwrap();
        assert_eq!(
            group.properties(),
            &json!({
                "Name": "TargetGroup",
                "Port": 80,
                "Protocol": "TCP",
                "TargetType": "instance",
                "Targets": [{"Id": {"Ref": "ProducerEC2"}, "Port": 80}],
                "VpcId": {"Ref": "ProducerVpc"},
            })
        );
        assert!(listener.target_group().health_check().is_none());
    }

    #[test]
    fn test_explicit_health_check_rendered() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);
        let mut targets = tcp_targets(Protocol::Tcp);
        targets.health_check = Some(HealthCheck {
            protocol: Some(Protocol::Tcp),
            port: Some(80),
            interval_seconds: Some(10),
            ..HealthCheck::default()
        });

        let listener = nlb
            .listener("L", ListenerProps { protocol: Protocol::Tcp, port: 80 })
            .add_targets("T", targets)
            .declare(&mut stack)
            .unwrap();

        let props = stack
            .resource(listener.target_group().reference().logical_id())
            .unwrap()
            .properties();
        assert_eq!(props["HealthCheckEnabled"], json!(true));
        assert_eq!(props["HealthCheckPort"], json!("80"));
        assert_eq!(props["HealthCheckIntervalSeconds"], json!(10));
        assert!(props.get("HealthyThresholdCount").is_none());
    }

    #[test]
    fn test_target_protocol_kept_when_it_differs() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);

        let listener = nlb
            .listener("L", ListenerProps { protocol: Protocol::Tcp, port: 80 })
            .add_targets("T", tcp_targets(Protocol::TcpUdp))
            .declare(&mut stack)
            .unwrap();

        assert_eq!(listener.protocol(), Protocol::Tcp);
        assert_eq!(listener.target_group().protocol(), Protocol::TcpUdp);
    }

    #[test]
    fn test_udp_targets_behind_tcp_listener_rendered_as_declared() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);

        let listener = nlb
            .listener("L", ListenerProps { protocol: Protocol::Tcp, port: 53 })
            .add_targets("T", tcp_targets(Protocol::Udp))
            .declare(&mut stack)
            .unwrap();

        assert_eq!(listener.target_group().protocol(), Protocol::Udp);
        let group = stack
            .resource(listener.target_group().reference().logical_id())
            .unwrap();
        assert_eq!(group.properties()["Protocol"], json!("UDP"));
        let resource = stack.resource(listener.reference().logical_id()).unwrap();
        assert_eq!(resource.properties()["Protocol"], json!("TCP"));
    }

    #[test_case(Protocol::Tcp, "TCP")]
    #[test_case(Protocol::Udp, "UDP")]
    #[test_case(Protocol::TcpUdp, "TCP_UDP")]
    #[test_case(Protocol::Tls, "TLS")]
    fn test_protocol_names(protocol: Protocol, expected: &str) {
        assert_eq!(protocol.to_string(), expected);
        assert_eq!(serde_json::to_value(protocol).unwrap(), json!(expected));
        assert_eq!(
            serde_json::from_value::<Protocol>(json!(expected)).unwrap(),
            protocol
        );
    }

    #[test]
    fn test_tls_listener_rendered() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);

        let listener = nlb
            .listener("L", ListenerProps { protocol: Protocol::Tls, port: 443 })
            .add_targets("T", tcp_targets(Protocol::Tcp))
            .declare(&mut stack)
            .unwrap();

        assert_eq!(listener.protocol(), Protocol::Tls);
        let resource = stack.resource(listener.reference().logical_id()).unwrap();
        assert_eq!(resource.properties()["Protocol"], json!("TLS"));
        assert_eq!(resource.properties()["Port"], json!(443));
    }

    #[test]
    fn test_internet_facing_in_public_subnets() {
        let mut stack = Stack::new("Test").unwrap();
        let vpc = Vpc::declare(
            &mut stack,
            "Vpc",
            VpcProps::new(Ipv4Cidr::new("10.21.0.0/16").unwrap()),
        )
        .unwrap();
        let subnets = vpc.select_subnets(SubnetType::Public).unwrap();

        let nlb = NetworkLoadBalancer::declare(
            &mut stack,
            "Nlb",
            NetworkLoadBalancerProps {
                vpc: &vpc,
                subnets: &subnets,
                internet_facing: true,
            },
        )
        .unwrap();

        assert!(nlb.is_internet_facing());
        let resource = stack.resource(nlb.reference().logical_id()).unwrap();
        assert_eq!(resource.properties()["Scheme"], json!("internet-facing"));
    }

    #[test]
    fn test_listener_without_targets_fails() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);

        let result = nlb
            .listener("L", ListenerProps { protocol: Protocol::Tcp, port: 80 })
            .declare(&mut stack);
        assert!(matches!(result, Err(TopologyError::InvalidProperty { .. })));
    }

    #[test]
    fn test_invalid_target_group_name() {
        let mut stack = Stack::new("Test").unwrap();
        let nlb = load_balancer(&mut stack);
        let mut targets = tcp_targets(Protocol::Tcp);
        targets.target_group_name = Some("-bad".to_string());

        let result = nlb
            .listener("L", ListenerProps { protocol: Protocol::Tcp, port: 80 })
            .add_targets("T", targets)
            .declare(&mut stack);
        assert!(result.is_err());
    }

    #[test]
    fn test_internet_facing_requires_gateway() {
        let mut stack = Stack::new("Test").unwrap();
        let props = VpcProps::new(Ipv4Cidr::new("10.21.0.0/16").unwrap()).without_internet_gateway();
        let vpc = Vpc::declare(&mut stack, "Vpc", props).unwrap();
        let subnets = vpc.select_subnets(SubnetType::Public).unwrap();

        let result = NetworkLoadBalancer::declare(
            &mut stack,
            "Nlb",
            NetworkLoadBalancerProps {
                vpc: &vpc,
                subnets: &subnets,
                internet_facing: true,
            },
        );
        assert!(matches!(result, Err(TopologyError::InvalidProperty { .. })));
    }
}
