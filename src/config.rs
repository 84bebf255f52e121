// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology configuration
//!
//! Defaults reproduce the reference topology (producer `10.21.0.0/16`,
//! consumer `10.22.0.0/16`, TCP/80, `t2.micro`). Every field can be
//! overridden through `PRIVATELINK_*` environment variables.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::domain::{InstanceType, Ipv4Cidr, Vpc, VpcProps};
use crate::errors::{TopologyError, TopologyResult};

const PRODUCER_CIDR: Ipv4Cidr = match Ipv4Cidr::from_network(Ipv4Addr::new(10, 21, 0, 0), 16) {
    Some(cidr) => cidr,
    None => panic!("producer CIDR has host bits set"),
};

const CONSUMER_CIDR: Ipv4Cidr = match Ipv4Cidr::from_network(Ipv4Addr::new(10, 22, 0, 0), 16) {
    Some(cidr) => cidr,
    None => panic!("consumer CIDR has host bits set"),
};

/// Environment variable names
pub mod env {
    pub const STACK_NAME: &str = "PRIVATELINK_STACK_NAME";
    pub const PRODUCER_CIDR: &str = "PRIVATELINK_PRODUCER_CIDR";
    pub const CONSUMER_CIDR: &str = "PRIVATELINK_CONSUMER_CIDR";
    pub const SERVICE_PORT: &str = "PRIVATELINK_SERVICE_PORT";
    pub const INSTANCE_TYPE: &str = "PRIVATELINK_INSTANCE_TYPE";
    pub const MAX_AZS: &str = "PRIVATELINK_MAX_AZS";
    pub const OUT_DIR: &str = "PRIVATELINK_OUT_DIR";
    /// Output directory set by CDK-style tooling, used when `OUT_DIR` is unset
    pub const CDK_OUT_DIR: &str = "CDK_OUTDIR";
}

/// Configuration for the PrivateLink topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Stack name
    pub stack_name: String,
    /// Producer VPC block
    pub producer_cidr: Ipv4Cidr,
    /// Consumer VPC block
    pub consumer_cidr: Ipv4Cidr,
    /// Listener, target and endpoint port
    pub service_port: u16,
    /// Producer instance size
    pub instance_type: InstanceType,
    /// Availability zones per VPC, 1 to 6
    pub max_azs: u8,
    /// Directory for the synthesized template; stdout when unset
    pub out_dir: Option<PathBuf>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            stack_name: "PrivateLinkStack".to_string(),
            producer_cidr: PRODUCER_CIDR,
            consumer_cidr: CONSUMER_CIDR,
            service_port: 80,
            instance_type: InstanceType::T2_MICRO,
            max_azs: VpcProps::DEFAULT_MAX_AZS,
            out_dir: None,
        }
    }
}

impl TopologyConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> TopologyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> TopologyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let stack_name = lookup(env::STACK_NAME).unwrap_or(defaults.stack_name);

        let producer_cidr = match lookup(env::PRODUCER_CIDR) {
            Some(value) => parse_cidr(env::PRODUCER_CIDR, &value)?,
            None => defaults.producer_cidr,
        };

        let consumer_cidr = match lookup(env::CONSUMER_CIDR) {
            Some(value) => parse_cidr(env::CONSUMER_CIDR, &value)?,
            None => defaults.consumer_cidr,
        };

        let service_port = match lookup(env::SERVICE_PORT) {
            Some(value) => value
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| invalid(env::SERVICE_PORT, &value))?,
            None => defaults.service_port,
        };

        let instance_type = match lookup(env::INSTANCE_TYPE) {
            Some(value) => InstanceType::new(value.as_str()).map_err(|_| invalid(env::INSTANCE_TYPE, &value))?,
            None => defaults.instance_type,
        };

        let max_azs = match lookup(env::MAX_AZS) {
            Some(value) => value
                .parse::<u8>()
                .ok()
                .filter(|count| (1..=Vpc::MAX_AZS).contains(count))
                .ok_or_else(|| invalid(env::MAX_AZS, &value))?,
            None => defaults.max_azs,
        };

        let out_dir = lookup(env::OUT_DIR)
            .or_else(|| lookup(env::CDK_OUT_DIR))
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            stack_name,
            producer_cidr,
            consumer_cidr,
            service_port,
            instance_type,
            max_azs,
            out_dir,
        })
    }

    /// Template file name inside `out_dir`
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.stack_name)
    }
}

fn parse_cidr(key: &str, value: &str) -> TopologyResult<Ipv4Cidr> {
    Ipv4Cidr::new(value).map_err(|e| TopologyError::Configuration(format!("{}: {}", key, e)))
}

fn invalid(key: &str, value: &str) -> TopologyError {
    TopologyError::Configuration(format!("{}: invalid value {:?}", key, value))
}
