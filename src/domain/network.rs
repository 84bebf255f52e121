// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects and the VPC Construct
//!
//! [`Ipv4Cidr`] carries the address-space invariants. [`Vpc`] expands one
//! address space into the VPC, its per-AZ subnets, route tables and, when an
//! internet gateway is requested, the gateway and NAT egress path.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::{name_tags, ResourceType, Tag};
use crate::errors::{TopologyError, TopologyResult};
use crate::stack::{CfnResource, Stack};
use crate::token::{ConstructPath, LogicalId, Reference, Token};

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4)")]
    InvalidPrefixLength(u8),

    #[error("Address has host bits set for its prefix: {0}")]
    HostBitsSet(String),

    #[error("VPC prefix length /{0} outside the allowed /16-/28 range")]
    VpcPrefixOutOfRange(u8),

    #[error("Subnets would need a /{0} prefix, smaller than the /28 minimum")]
    SubnetTooSmall(u8),

    #[error("Invalid availability zone count: {0} (must be 1-6)")]
    InvalidAzCount(u8),

    #[error("VPC declares no subnet groups")]
    NoSubnetGroups,
}

/// IPv4 network block in CIDR notation
///
/// Invariants:
/// - Valid dotted-quad address
/// - Prefix length 0-32
/// - Address is the network address (no host bits set)
///
/// # Examples
///
/// ```rust
/// use privatelink_topology::domain::Ipv4Cidr;
///
/// let producer = Ipv4Cidr::new("10.21.0.0/16").unwrap();
/// let consumer = Ipv4Cidr::new("10.22.0.0/16").unwrap();
/// assert!(!producer.overlaps(&consumer));
/// assert!(Ipv4Cidr::new("10.21.0.1/16").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// Parse a block from CIDR notation
    ///
    /// # Invariants
    /// - Prefix is mandatory
    /// - Host bits must be zero
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let network = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        Self::from_network(network, prefix_length)
            .ok_or_else(|| NetworkError::HostBitsSet(cidr.to_string()))
    }

    /// Create from a network address whose host bits are already clear
    pub const fn from_network(network: Ipv4Addr, prefix_length: u8) -> Option<Self> {
        if prefix_length > 32 {
            return None;
        }

        let bits = u32::from_be_bytes(network.octets());
        if bits & !Self::mask(prefix_length) != 0 {
            return None;
        }

        Some(Self {
            network,
            prefix_length,
        })
    }

    const fn mask(prefix_length: u8) -> u32 {
        if prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_length as u32)
        }
    }

    fn bits(&self) -> u32 {
        u32::from(self.network)
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_length)
    }

    /// Last address of the block
    pub fn last_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.bits() | !Self::mask(self.prefix_length))
    }

    pub fn contains_address(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & Self::mask(self.prefix_length) == self.bits()
    }

    /// Whether `other` lies entirely within this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_length >= self.prefix_length && self.contains_address(other.network)
    }

    /// Whether the two blocks share any address
    ///
    /// CIDR blocks either nest or are disjoint, so overlap is containment in
    /// one direction or the other.
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// Split into consecutive child blocks of `new_prefix`
    pub fn subdivide(
        &self,
        new_prefix: u8,
    ) -> Result<impl Iterator<Item = Ipv4Cidr>, NetworkError> {
        if new_prefix < self.prefix_length || new_prefix > 32 {
            return Err(NetworkError::InvalidPrefixLength(new_prefix));
        }

        let base = u64::from(self.bits());
        let block_size = 1u64 << (32 - new_prefix);
        let count = 1u64 << (new_prefix - self.prefix_length);

        Ok((0..count).map(move |i| Ipv4Cidr {
            // stays within u32: base + count * block_size == end of self
            network: Ipv4Addr::from((base + i * block_size) as u32),
            prefix_length: new_prefix,
        }))
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.network, self.prefix_length)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.as_cidr()
    }
}

/// Subnet group kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubnetType {
    /// Routed through the internet gateway when one exists
    Public,
    /// Outbound through NAT when the VPC has an internet gateway
    PrivateWithEgress,
    /// No route out of the VPC
    PrivateIsolated,
}

impl SubnetType {
    /// Subnet group name used in construct ids and tags
    pub fn group_name(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PrivateWithEgress => "Private",
            Self::PrivateIsolated => "Isolated",
        }
    }

    fn maps_public_ip(&self) -> bool {
        matches!(self, Self::Public)
    }
}

/// VPC configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcProps {
    pub cidr: Ipv4Cidr,
    pub create_internet_gateway: bool,
    pub max_azs: u8,
    /// Subnet groups, one subnet per group per availability zone
    pub subnet_groups: Vec<SubnetType>,
}

impl VpcProps {
    pub const DEFAULT_MAX_AZS: u8 = 2;

    /// Public and private-with-egress groups across two AZs
    pub fn new(cidr: Ipv4Cidr) -> Self {
        Self {
            cidr,
            create_internet_gateway: true,
            max_azs: Self::DEFAULT_MAX_AZS,
            subnet_groups: vec![SubnetType::Public, SubnetType::PrivateWithEgress],
        }
    }

    pub fn without_internet_gateway(mut self) -> Self {
        self.create_internet_gateway = false;
        self
    }

    pub fn with_max_azs(mut self, max_azs: u8) -> Self {
        self.max_azs = max_azs;
        self
    }
}

/// A declared subnet
#[derive(Debug, Clone, PartialEq)]
pub struct Subnet {
    reference: Reference<Subnet>,
    subnet_type: SubnetType,
    availability_zone: usize,
    cidr: Ipv4Cidr,
    route_table: LogicalId,
}

impl Subnet {
    pub fn reference(&self) -> &Reference<Subnet> {
        &self.reference
    }

    pub fn subnet_id(&self) -> Token {
        self.reference.to_ref()
    }

    pub fn subnet_type(&self) -> SubnetType {
        self.subnet_type
    }

    pub fn availability_zone(&self) -> Token {
        Token::availability_zone(self.availability_zone)
    }

    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    pub fn route_table(&self) -> &LogicalId {
        &self.route_table
    }
}

/// Result of a subnet selection, never empty
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSubnets {
    subnet_type: SubnetType,
    subnets: Vec<Subnet>,
}

impl SelectedSubnets {
    pub fn subnet_type(&self) -> SubnetType {
        self.subnet_type
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    pub fn subnet_ids(&self) -> Vec<Token> {
        self.subnets.iter().map(Subnet::subnet_id).collect()
    }

    /// First subnet of the selection, used for single-ENI placement
    pub fn primary(&self) -> &Subnet {
        // selections are only built non-empty
        &self.subnets[0]
    }
}

/// A declared VPC and its subnets
#[derive(Debug, Clone, PartialEq)]
pub struct Vpc {
    reference: Reference<Vpc>,
    path: ConstructPath,
    cidr: Ipv4Cidr,
    subnets: Vec<Subnet>,
    internet_gateway: Option<LogicalId>,
    nat_gateways: Vec<LogicalId>,
}

impl Vpc {
    /// Smallest VPC block AWS accepts
    pub const MIN_PREFIX: u8 = 16;

    /// Largest VPC or subnet prefix AWS accepts
    pub const MAX_PREFIX: u8 = 28;

    /// Upper bound on availability zones
    pub const MAX_AZS: u8 = 6;

    /// Declare a VPC with its subnet layout
    ///
    /// # Invariants
    /// - VPC prefix within /16-/28
    /// - Every subnet at least a /28
    /// - Gateway and NAT resources only when `create_internet_gateway`
    pub fn declare(stack: &mut Stack, id: &str, props: VpcProps) -> TopologyResult<Vpc> {
        let prefix = props.cidr.prefix_length();
        if !(Self::MIN_PREFIX..=Self::MAX_PREFIX).contains(&prefix) {
            return Err(NetworkError::VpcPrefixOutOfRange(prefix).into());
        }
        if props.max_azs == 0 || props.max_azs > Self::MAX_AZS {
            return Err(NetworkError::InvalidAzCount(props.max_azs).into());
        }
        if props.subnet_groups.is_empty() {
            return Err(NetworkError::NoSubnetGroups.into());
        }

        let azs = usize::from(props.max_azs);
        let total = props.subnet_groups.len() * azs;
        let extra_bits = (usize::BITS - (total - 1).leading_zeros()) as u8;
        let subnet_prefix = prefix + extra_bits;
        if subnet_prefix > Self::MAX_PREFIX {
            return Err(NetworkError::SubnetTooSmall(subnet_prefix).into());
        }
        let mut blocks = props.cidr.subdivide(subnet_prefix)?;

        let path = stack.path().child(id);
        let vpc_id = stack.declare(CfnResource::new(
            path.child("Resource"),
            ResourceType::Vpc,
            json!({
                "CidrBlock": props.cidr.as_cidr(),
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "InstanceTenancy": "default",
                "Tags": name_tags(&path),
            }),
        )?)?;
        let vpc_ref = Token::Ref(vpc_id.clone());

        let internet_gateway = if props.create_internet_gateway {
            Some(Self::declare_internet_gateway(stack, &path, &vpc_ref)?)
        } else {
            None
        };

        let mut subnets = Vec::with_capacity(total);
        for subnet_type in &props.subnet_groups {
            for az in 0..azs {
                let cidr = blocks
                    .next()
                    .ok_or(NetworkError::SubnetTooSmall(subnet_prefix))?;
                subnets.push(Self::declare_subnet(
                    stack, &path, &vpc_ref, *subnet_type, az, cidr,
                )?);
            }
        }

        let mut nat_gateways = Vec::new();
        if let Some((igw, attachment)) = &internet_gateway {
            nat_gateways = Self::declare_egress(stack, &path, igw, attachment, &subnets)?;
        }

        debug!(
            vpc = %vpc_id,
            cidr = %props.cidr,
            subnets = subnets.len(),
            internet_gateway = internet_gateway.is_some(),
            "declared vpc"
        );

        Ok(Vpc {
            reference: Reference::new(vpc_id),
            path,
            cidr: props.cidr,
            subnets,
            internet_gateway: internet_gateway.map(|(igw, _)| igw),
            nat_gateways,
        })
    }

    /// Declares the gateway and its attachment
    fn declare_internet_gateway(
        stack: &mut Stack,
        path: &ConstructPath,
        vpc_ref: &Token,
    ) -> TopologyResult<(LogicalId, LogicalId)> {
        let igw = stack.declare(CfnResource::new(
            path.child("IGW"),
            ResourceType::InternetGateway,
            json!({ "Tags": name_tags(path) }),
        )?)?;

        let attachment = stack.declare(CfnResource::new(
            path.child("VPCGW"),
            ResourceType::VpcGatewayAttachment,
            json!({
                "InternetGatewayId": Token::Ref(igw.clone()),
                "VpcId": vpc_ref,
            }),
        )?)?;

        Ok((igw, attachment))
    }

    fn declare_subnet(
        stack: &mut Stack,
        vpc_path: &ConstructPath,
        vpc_ref: &Token,
        subnet_type: SubnetType,
        az: usize,
        cidr: Ipv4Cidr,
    ) -> TopologyResult<Subnet> {
        let path = vpc_path.child(format!("{}Subnet{}", subnet_type.group_name(), az + 1));

        let tags = vec![
            Tag::new("Name", path.to_string()),
            Tag::new("aws-cdk:subnet-name", subnet_type.group_name()),
            Tag::new("aws-cdk:subnet-type", subnet_type.group_name()),
        ];

        let subnet_id = stack.declare(CfnResource::new(
            path.child("Subnet"),
            ResourceType::Subnet,
            json!({
                "AvailabilityZone": Token::availability_zone(az),
                "CidrBlock": cidr.as_cidr(),
                "MapPublicIpOnLaunch": subnet_type.maps_public_ip(),
                "Tags": tags,
                "VpcId": vpc_ref,
            }),
        )?)?;

        let route_table = stack.declare(CfnResource::new(
            path.child("RouteTable"),
            ResourceType::RouteTable,
            json!({
                "Tags": name_tags(&path),
                "VpcId": vpc_ref,
            }),
        )?)?;

        stack.declare(CfnResource::new(
            path.child("RouteTableAssociation"),
            ResourceType::SubnetRouteTableAssociation,
            json!({
                "RouteTableId": Token::Ref(route_table.clone()),
                "SubnetId": Token::Ref(subnet_id.clone()),
            }),
        )?)?;

        Ok(Subnet {
            reference: Reference::new(subnet_id),
            subnet_type,
            availability_zone: az,
            cidr,
            route_table,
        })
    }

    /// Public default routes, one NAT gateway per AZ, private default routes
    fn declare_egress(
        stack: &mut Stack,
        vpc_path: &ConstructPath,
        igw: &LogicalId,
        gateway_attachment: &LogicalId,
        subnets: &[Subnet],
    ) -> TopologyResult<Vec<LogicalId>> {
        let mut nat_by_az = Vec::new();
        for subnet in subnets.iter().filter(|s| s.subnet_type == SubnetType::Public) {
            let path = Self::subnet_path(vpc_path, subnet);

            let route = stack.declare(
                CfnResource::new(
                    path.child("DefaultRoute"),
                    ResourceType::Route,
                    json!({
                        "DestinationCidrBlock": "0.0.0.0/0",
                        "GatewayId": Token::Ref(igw.clone()),
                        "RouteTableId": Token::Ref(subnet.route_table.clone()),
                    }),
                )?
                .with_depends_on([gateway_attachment.clone()]),
            )?;

            let eip = stack.declare(CfnResource::new(
                path.child("EIP"),
                ResourceType::Eip,
                json!({ "Domain": "vpc", "Tags": name_tags(&path) }),
            )?)?;

            let association = path.child("RouteTableAssociation").logical_id()?;
            let nat = stack.declare(
                CfnResource::new(
                    path.child("NATGateway"),
                    ResourceType::NatGateway,
                    json!({
                        "AllocationId": Token::GetAtt {
                            logical_id: eip,
                            attribute: "AllocationId".to_string(),
                        },
                        "SubnetId": subnet.subnet_id(),
                        "Tags": name_tags(&path),
                    }),
                )?
                .with_depends_on([route, association]),
            )?;

            nat_by_az.push((subnet.availability_zone, nat));
        }

        for subnet in subnets
            .iter()
            .filter(|s| s.subnet_type == SubnetType::PrivateWithEgress)
        {
            let nat = nat_by_az
                .iter()
                .find(|(az, _)| *az == subnet.availability_zone)
                .or_else(|| nat_by_az.first())
                .map(|(_, nat)| nat.clone());

            // No public group means nowhere to place a NAT gateway
            let Some(nat) = nat else { continue };

            stack.declare(CfnResource::new(
                Self::subnet_path(vpc_path, subnet).child("DefaultRoute"),
                ResourceType::Route,
                json!({
                    "DestinationCidrBlock": "0.0.0.0/0",
                    "NatGatewayId": Token::Ref(nat),
                    "RouteTableId": Token::Ref(subnet.route_table.clone()),
                }),
            )?)?;
        }

        Ok(nat_by_az.into_iter().map(|(_, nat)| nat).collect())
    }

    fn subnet_path(vpc_path: &ConstructPath, subnet: &Subnet) -> ConstructPath {
        vpc_path.child(format!(
            "{}Subnet{}",
            subnet.subnet_type.group_name(),
            subnet.availability_zone + 1
        ))
    }

    pub fn reference(&self) -> &Reference<Vpc> {
        &self.reference
    }

    pub fn vpc_id(&self) -> Token {
        self.reference.to_ref()
    }

    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    pub fn has_internet_gateway(&self) -> bool {
        self.internet_gateway.is_some()
    }

    pub fn nat_gateways(&self) -> &[LogicalId] {
        &self.nat_gateways
    }

    /// Select every subnet of one group
    pub fn select_subnets(&self, subnet_type: SubnetType) -> TopologyResult<SelectedSubnets> {
        let subnets: Vec<Subnet> = self
            .subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .cloned()
            .collect();

        if subnets.is_empty() {
            return Err(TopologyError::SubnetSelection(format!(
                "{} has no {:?} subnets",
                self.path, subnet_type
            )));
        }

        Ok(SelectedSubnets {
            subnet_type,
            subnets,
        })
    }
}
