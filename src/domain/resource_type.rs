// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Resource Type Taxonomy
//!
//! The complete set of CloudFormation resource types this crate declares,
//! grouped into categories for reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CloudFormation resource types emitted by the topology constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    // Networking
    /// Virtual private cloud
    Vpc,
    /// Subnet within a VPC
    Subnet,
    /// Route table
    RouteTable,
    /// Route table to subnet association
    SubnetRouteTableAssociation,
    /// Single route entry
    Route,
    /// Internet gateway
    InternetGateway,
    /// Internet gateway to VPC attachment
    VpcGatewayAttachment,
    /// Elastic IP
    Eip,
    /// NAT gateway
    NatGateway,

    // Security
    /// Security group
    SecurityGroup,
    /// IAM role
    IamRole,
    /// IAM instance profile
    InstanceProfile,

    // Compute
    /// EC2 instance
    Instance,

    // Load Balancing
    /// Elastic Load Balancing v2 load balancer
    LoadBalancer,
    /// Load balancer listener
    Listener,
    /// Load balancer target group
    TargetGroup,

    // PrivateLink
    /// VPC endpoint service
    VpcEndpointService,
    /// VPC endpoint
    VpcEndpoint,
}

/// Coarse grouping of resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Networking,
    Security,
    Compute,
    LoadBalancing,
    PrivateLink,
}

impl ResourceType {
    /// Provider type name as it appears in templates
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::Route => "AWS::EC2::Route",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::Eip => "AWS::EC2::EIP",
            Self::NatGateway => "AWS::EC2::NatGateway",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::IamRole => "AWS::IAM::Role",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
            Self::Instance => "AWS::EC2::Instance",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::VpcEndpointService => "AWS::EC2::VPCEndpointService",
            Self::VpcEndpoint => "AWS::EC2::VPCEndpoint",
        }
    }

    /// Look up a type by its provider name
    pub fn from_provider_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == name)
    }

    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc
            | Self::Subnet
            | Self::RouteTable
            | Self::SubnetRouteTableAssociation
            | Self::Route
            | Self::InternetGateway
            | Self::VpcGatewayAttachment
            | Self::Eip
            | Self::NatGateway => ResourceCategory::Networking,
            Self::SecurityGroup | Self::IamRole | Self::InstanceProfile => {
                ResourceCategory::Security
            }
            Self::Instance => ResourceCategory::Compute,
            Self::LoadBalancer | Self::Listener | Self::TargetGroup => {
                ResourceCategory::LoadBalancing
            }
            Self::VpcEndpointService | Self::VpcEndpoint => ResourceCategory::PrivateLink,
        }
    }

    pub fn all() -> &'static [ResourceType] {
        &[
            Self::Vpc,
            Self::Subnet,
            Self::RouteTable,
            Self::SubnetRouteTableAssociation,
            Self::Route,
            Self::InternetGateway,
            Self::VpcGatewayAttachment,
            Self::Eip,
            Self::NatGateway,
            Self::SecurityGroup,
            Self::IamRole,
            Self::InstanceProfile,
            Self::Instance,
            Self::LoadBalancer,
            Self::Listener,
            Self::TargetGroup,
            Self::VpcEndpointService,
            Self::VpcEndpoint,
        ]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
