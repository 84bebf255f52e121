// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Constructs: Security Groups and Instances
//!
//! The producer instance is a plain EC2 instance in private subnets. Its
//! security group is a placeholder admitting all TCP from anywhere, not a
//! least-privilege policy.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::network::{Ipv4Cidr, SelectedSubnets, Subnet, Vpc};
use super::{name_tags, ResourceType, Tag};
use crate::errors::{TopologyError, TopologyResult};
use crate::stack::{CfnResource, Parameter, Stack};
use crate::token::{ConstructPath, LogicalId, Reference, Token};

/// Compute validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("Invalid instance type: {0} (expected family.size)")]
    InvalidInstanceType(String),

    #[error("Invalid SSM parameter path: {0}")]
    InvalidParameterPath(String),
}

/// Instance size class (`t2.micro`, `m5d.xlarge`)
///
/// Invariants:
/// - Exactly one dot separating family and size
/// - Both parts non-empty, lowercase alphanumerics or hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceType(Cow<'static, str>);

impl InstanceType {
    pub const T2_MICRO: InstanceType = InstanceType(Cow::Borrowed("t2.micro"));

    pub fn new(value: impl Into<String>) -> Result<Self, ComputeError> {
        let value = value.into();

        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        };

        match value.split_once('.') {
            Some((family, size)) if valid_part(family) && valid_part(size) => {
                Ok(Self(Cow::Owned(value)))
            }
            _ => Err(ComputeError::InvalidInstanceType(value)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for InstanceType {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InstanceType> for String {
    fn from(value: InstanceType) -> Self {
        value.0.into_owned()
    }
}

/// Machine image source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineImage {
    /// Latest Amazon Linux 2 (HVM, x86_64, gp2), looked up through SSM at apply time
    LatestAmazonLinux2,
    /// Image id published under an arbitrary public SSM parameter
    FromSsmParameter(String),
    /// Fixed image id
    Ami(String),
}

impl MachineImage {
    const AMAZON_LINUX_2_PARAMETER: &'static str =
        "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2";

    /// Boot script; every supported image is Linux, so an empty bash script
    pub fn user_data(&self) -> Token {
        Token::Base64(Box::new(Token::literal("#!/bin/bash")))
    }

    /// Image id token, registering the SSM lookup parameter when needed
    pub fn image_id(&self, stack: &mut Stack) -> TopologyResult<Token> {
        let parameter_path = match self {
            Self::Ami(id) => return Ok(Token::literal(id.clone())),
            Self::LatestAmazonLinux2 => Self::AMAZON_LINUX_2_PARAMETER,
            Self::FromSsmParameter(path) => path.as_str(),
        };

        if !parameter_path.starts_with('/') {
            return Err(ComputeError::InvalidParameterPath(parameter_path.to_string()).into());
        }

        let sanitized: String = parameter_path
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let name = LogicalId::new(format!("SsmParameterValue{}Parameter", sanitized))?;

        stack.add_parameter(
            name.as_str(),
            Parameter {
                parameter_type: "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>".to_string(),
                default: parameter_path.to_string(),
            },
        )?;

        Ok(Token::Ref(name))
    }
}

/// Traffic source of an ingress rule
#[derive(Debug, Clone, PartialEq)]
pub enum Peer {
    /// `0.0.0.0/0`
    AnyIpv4,
    /// Fixed block
    Ipv4(Ipv4Cidr),
    /// Primary block of a declared VPC, resolved at apply time
    VpcCidr(Reference<Vpc>),
}

impl Peer {
    pub(crate) fn cidr_ip(&self) -> Token {
        match self {
            Self::AnyIpv4 => Token::literal("0.0.0.0/0"),
            Self::Ipv4(cidr) => Token::literal(cidr.as_cidr()),
            Self::VpcCidr(vpc) => vpc.get_att("CidrBlock"),
        }
    }
}

/// Port specification of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    AllTcp,
    Tcp(u16),
    AllTraffic,
}

impl Port {
    fn ip_protocol(&self) -> &'static str {
        match self {
            Self::AllTcp | Self::Tcp(_) => "tcp",
            Self::AllTraffic => "-1",
        }
    }

    fn range(&self) -> (Option<u16>, Option<u16>) {
        match self {
            Self::AllTcp => (Some(0), Some(u16::MAX)),
            Self::Tcp(port) => (Some(*port), Some(*port)),
            Self::AllTraffic => (None, None),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTcp => write!(f, "ALL PORTS"),
            Self::Tcp(port) => write!(f, "{}", port),
            Self::AllTraffic => write!(f, "ALL TRAFFIC"),
        }
    }
}

/// Single ingress rule
#[derive(Debug, Clone, PartialEq)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: Port,
    /// May embed late-bound values such as the peer's block
    pub description: Token,
}

impl IngressRule {
    pub fn new(peer: Peer, port: Port, description: impl Into<Token>) -> Self {
        Self {
            peer,
            port,
            description: description.into(),
        }
    }

    fn render(&self) -> RuleProperties {
        let (from_port, to_port) = self.port.range();
        RuleProperties {
            cidr_ip: self.peer.cidr_ip(),
            description: self.description.clone(),
            from_port,
            ip_protocol: self.port.ip_protocol(),
            to_port,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RuleProperties {
    cidr_ip: Token,
    description: Token,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_port: Option<u16>,
    ip_protocol: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_port: Option<u16>,
}

impl RuleProperties {
    fn allow_all_outbound() -> Self {
        Self {
            cidr_ip: Token::literal("0.0.0.0/0"),
            description: Token::literal("Allow all outbound traffic by default"),
            from_port: None,
            ip_protocol: "-1",
            to_port: None,
        }
    }

    // Matches nothing; an empty egress list would mean allow-all to the provider
    fn disallow_all() -> Self {
        Self {
            cidr_ip: Token::literal("255.255.255.255/32"),
            description: Token::literal("Disallow all traffic"),
            from_port: Some(252),
            ip_protocol: "icmp",
            to_port: Some(86),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroupProperties {
    group_description: String,
    security_group_egress: Vec<RuleProperties>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    security_group_ingress: Vec<RuleProperties>,
    vpc_id: Token,
}

/// Builder collecting rules before the group is declared
#[derive(Debug, Clone)]
pub struct SecurityGroupBuilder {
    id: String,
    scope: Option<ConstructPath>,
    vpc: Reference<Vpc>,
    description: Option<String>,
    allow_all_outbound: bool,
    ingress: Vec<IngressRule>,
}

impl SecurityGroupBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn allow_all_outbound(mut self, allow: bool) -> Self {
        self.allow_all_outbound = allow;
        self
    }

    pub fn add_ingress_rule(mut self, peer: Peer, port: Port, description: impl Into<Token>) -> Self {
        self.ingress.push(IngressRule::new(peer, port, description));
        self
    }

    /// Nest the group under another construct instead of the stack root
    pub(crate) fn scoped(mut self, scope: ConstructPath) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn declare(self, stack: &mut Stack) -> TopologyResult<SecurityGroup> {
        let path = self.scope.unwrap_or_else(|| stack.path()).child(&self.id);

        let egress = if self.allow_all_outbound {
            RuleProperties::allow_all_outbound()
        } else {
            RuleProperties::disallow_all()
        };

        let properties = SecurityGroupProperties {
            group_description: self.description.unwrap_or_else(|| path.to_string()),
            security_group_egress: vec![egress],
            security_group_ingress: self.ingress.iter().map(IngressRule::render).collect(),
            vpc_id: self.vpc.to_ref(),
        };

        let id = stack.declare(CfnResource::new(
            path.child("Resource"),
            ResourceType::SecurityGroup,
            properties,
        )?)?;

        debug!(security_group = %id, ingress_rules = self.ingress.len(), "declared security group");

        Ok(SecurityGroup {
            reference: Reference::new(id),
            vpc: self.vpc,
            path,
            allow_all_outbound: self.allow_all_outbound,
            ingress: self.ingress,
        })
    }
}

/// A declared security group
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityGroup {
    reference: Reference<SecurityGroup>,
    vpc: Reference<Vpc>,
    path: ConstructPath,
    allow_all_outbound: bool,
    ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    /// Start a group in `vpc`, allowing all outbound traffic by default
    pub fn builder(id: impl Into<String>, vpc: &Vpc) -> SecurityGroupBuilder {
        SecurityGroupBuilder {
            id: id.into(),
            scope: None,
            vpc: vpc.reference().clone(),
            description: None,
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }

    pub fn reference(&self) -> &Reference<SecurityGroup> {
        &self.reference
    }

    pub fn group_id(&self) -> Token {
        self.reference.get_att("GroupId")
    }

    pub fn vpc(&self) -> &Reference<Vpc> {
        &self.vpc
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn allows_all_outbound(&self) -> bool {
        self.allow_all_outbound
    }

    pub fn ingress_rules(&self) -> &[IngressRule] {
        &self.ingress
    }
}

/// Instance configuration
#[derive(Debug, Clone)]
pub struct InstanceProps<'a> {
    pub vpc: &'a Vpc,
    pub subnets: &'a SelectedSubnets,
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    pub security_group: &'a SecurityGroup,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceProperties {
    availability_zone: Token,
    iam_instance_profile: Token,
    image_id: Token,
    instance_type: String,
    security_group_ids: Vec<Token>,
    subnet_id: Token,
    tags: Vec<Tag>,
    user_data: Token,
}

/// A declared compute instance
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    reference: Reference<Instance>,
    path: ConstructPath,
    instance_type: InstanceType,
    subnet: Reference<Subnet>,
    security_group: Reference<SecurityGroup>,
    role: LogicalId,
}

impl Instance {
    /// Declare an instance with its IAM role and instance profile
    ///
    /// # Invariants
    /// - Subnets belong to `vpc`
    /// - Security group belongs to `vpc`
    pub fn declare(stack: &mut Stack, id: &str, props: InstanceProps<'_>) -> TopologyResult<Instance> {
        let path = stack.path().child(id);
        let subnet = props.subnets.primary();

        if !props.vpc.subnets().contains(subnet) {
            return Err(TopologyError::SubnetSelection(format!(
                "{}: selected subnets are not part of {}",
                path,
                props.vpc.path()
            )));
        }
        if props.security_group.vpc() != props.vpc.reference() {
            return Err(TopologyError::invalid_property(
                &path,
                format!("security group {} is in another VPC", props.security_group.path()),
            ));
        }

        let role = stack.declare(CfnResource::new(
            path.child("InstanceRole"),
            ResourceType::IamRole,
            json!({
                "AssumeRolePolicyDocument": {
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "ec2.amazonaws.com" },
                    }],
                    "Version": "2012-10-17",
                },
                "Tags": name_tags(&path),
            }),
        )?)?;

        let profile = stack.declare(CfnResource::new(
            path.child("InstanceProfile"),
            ResourceType::InstanceProfile,
            json!({ "Roles": [Token::Ref(role.clone())] }),
        )?)?;

        let properties = InstanceProperties {
            availability_zone: subnet.availability_zone(),
            iam_instance_profile: Token::Ref(profile),
            image_id: props.machine_image.image_id(stack)?,
            instance_type: props.instance_type.to_string(),
            security_group_ids: vec![props.security_group.group_id()],
            subnet_id: subnet.subnet_id(),
            tags: name_tags(&path),
            user_data: props.machine_image.user_data(),
        };

        let instance_id = stack.declare(
            CfnResource::new(path.child("Resource"), ResourceType::Instance, properties)?
                .with_depends_on([role.clone()]),
        )?;

        debug!(instance = %instance_id, instance_type = %props.instance_type, "declared instance");

        Ok(Instance {
            reference: Reference::new(instance_id),
            path,
            instance_type: props.instance_type,
            subnet: subnet.reference().clone(),
            security_group: props.security_group.reference().clone(),
            role,
        })
    }

    pub fn reference(&self) -> &Reference<Instance> {
        &self.reference
    }

    /// Provider-assigned instance id
    pub fn instance_id(&self) -> Token {
        self.reference.to_ref()
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn instance_type(&self) -> &InstanceType {
        &self.instance_type
    }

    pub fn subnet(&self) -> &Reference<Subnet> {
        &self.subnet
    }

    pub fn security_group(&self) -> &Reference<SecurityGroup> {
        &self.security_group
    }

    pub fn role(&self) -> &LogicalId {
        &self.role
    }
}
