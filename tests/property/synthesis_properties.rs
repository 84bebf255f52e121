// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Topology Synthesis
//!
//! For any disjoint producer/consumer address plan and service port, the
//! declared topology must synthesize to a deterministic template with a
//! single, correctly bound PrivateLink path.

use crate::fixtures::endpoint_service_name;
use privatelink_topology::domain::{Ipv4Cidr, ValidationError};
use privatelink_topology::{PrivateLinkTopology, TopologyConfig, TopologyError};
use proptest::prelude::*;
use serde_json::json;
use std::net::Ipv4Addr;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn block(second_octet: u8, prefix: u8) -> Ipv4Cidr {
    Ipv4Cidr::from_network(Ipv4Addr::new(10, second_octet, 0, 0), prefix)
        .expect("10.x.0.0 is a valid /16-/24 network")
}

/// Generate a configuration with disjoint producer and consumer blocks
fn disjoint_config() -> impl Strategy<Value = TopologyConfig> {
    (any::<u8>(), any::<u8>(), 16u8..=24, 16u8..=24, 1u16.., 1u8..=3)
        .prop_filter("distinct blocks", |(a, b, ..)| a != b)
        .prop_map(|(a, b, producer_prefix, consumer_prefix, port, azs)| TopologyConfig {
            producer_cidr: block(a, producer_prefix),
            consumer_cidr: block(b, consumer_prefix),
            service_port: port,
            max_azs: azs,
            ..TopologyConfig::default()
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: Disjoint plans always produce one bound PrivateLink path
    #[test]
    fn prop_disjoint_plans_synthesize(config in disjoint_config()) {
        let template = PrivateLinkTopology::build(&config).unwrap().synthesize().unwrap();

        prop_assert_eq!(template.resources_of_type("AWS::EC2::VPCEndpoint").len(), 1);
        prop_assert_eq!(template.resources_of_type("AWS::EC2::VPCEndpointService").len(), 1);
        prop_assert_eq!(
            template.resources_of_type("AWS::EC2::Subnet").len(),
            4 * usize::from(config.max_azs)
        );

        let endpoint = template.resource("VpcEndpoint").unwrap();
        prop_assert_eq!(&endpoint.properties["ServiceName"], &endpoint_service_name());

        let listener = template.resource("NetworkLoadBalancerNLBListener").unwrap();
        prop_assert_eq!(&listener.properties["Port"], &json!(config.service_port));

        let group = template.resource("NetworkLoadBalancerNLBListenerNLBTargetGroup").unwrap();
        prop_assert_eq!(
            &group.properties["Targets"],
            &json!([{"Id": {"Ref": "ProducerEC2"}, "Port": config.service_port}])
        );
    }

    /// Property: Synthesis is deterministic
    #[test]
    fn prop_synthesis_is_deterministic(config in disjoint_config()) {
        let first = PrivateLinkTopology::build(&config).unwrap().synthesize().unwrap();
        let second = PrivateLinkTopology::build(&config).unwrap().synthesize().unwrap();

        prop_assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
    }

    /// Property: Every resource is created after everything it references
    #[test]
    fn prop_creation_order_respects_dependencies(config in disjoint_config()) {
        let template = PrivateLinkTopology::build(&config).unwrap().synthesize().unwrap();
        let order = template.creation_order().unwrap();
        prop_assert_eq!(order.len(), template.resources.len());

        let position = |id: &str| order.iter().position(|o| o == id).unwrap();
        for (id, deps) in template.dependencies() {
            for dep in deps {
                prop_assert!(position(&dep) < position(&id), "{} before {}", id, dep);
            }
        }
    }

    /// Property: A consumer block inside the producer block is always rejected
    #[test]
    fn prop_nested_plans_rejected(octet in any::<u8>(), consumer_prefix in 16u8..=24) {
        let config = TopologyConfig {
            producer_cidr: block(octet, 16),
            consumer_cidr: block(octet, consumer_prefix),
            ..TopologyConfig::default()
        };

        let is_overlap = matches!(
            PrivateLinkTopology::build(&config),
            Err(TopologyError::Validation(ValidationError::OverlappingNetworks { .. }))
        );
        prop_assert!(is_overlap);
    }
}
