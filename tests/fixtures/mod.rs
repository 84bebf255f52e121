// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for privatelink-topology
//!
//! Deterministic configurations and helpers shared by the integration and
//! property suites. Fixtures are the only place that builds configurations.

#![allow(dead_code)]

use privatelink_topology::domain::Ipv4Cidr;
use privatelink_topology::{PrivateLinkTopology, Template, TopologyConfig};
use serde_json::{json, Value};

pub const PRODUCER_CIDR: &str = "10.21.0.0/16";
pub const CONSUMER_CIDR: &str = "10.22.0.0/16";

/// Configuration with the given producer and consumer blocks
pub fn config_with(producer: &str, consumer: &str) -> TopologyConfig {
    TopologyConfig {
        producer_cidr: Ipv4Cidr::new(producer).expect("Invalid producer CIDR in fixture"),
        consumer_cidr: Ipv4Cidr::new(consumer).expect("Invalid consumer CIDR in fixture"),
        ..TopologyConfig::default()
    }
}

/// The reference topology
pub fn default_topology() -> PrivateLinkTopology {
    PrivateLinkTopology::build(&TopologyConfig::default()).expect("Default topology must build")
}

/// Template of the reference topology
pub fn default_template() -> Template {
    default_topology()
        .synthesize()
        .expect("Default topology must synthesize")
}

/// Expected `ServiceName` of the interface endpoint
pub fn endpoint_service_name() -> Value {
    json!({
        "Fn::Join": ["", [
            "com.amazonaws.vpce.",
            {"Ref": "AWS::Region"},
            ".",
            {"Ref": "VpcEndpointService"},
        ]]
    })
}
