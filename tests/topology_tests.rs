// Copyright (c) 2025 - Cowboy AI, Inc.
//! PrivateLink Topology Integration Tests
//!
//! Verifies the synthesized template of the full producer/consumer topology:
//! - resource counts and wiring between the two VPCs
//! - target and endpoint bindings
//! - deterministic output and creation order
//! - failure on overlapping networks and removed resources

mod fixtures;

use anyhow::Result;
use fixtures::*;
use pretty_assertions::assert_eq;
use privatelink_topology::domain::{Protocol, ValidationError};
use privatelink_topology::{synthesize, LogicalId, PrivateLinkTopology, TopologyError};
use serde_json::json;

#[test]
fn test_single_privatelink_path() -> Result<()> {
    let template = default_template();

    assert_eq!(template.resources_of_type("AWS::EC2::VPC").len(), 2);
    assert_eq!(
        template
            .resources_of_type("AWS::ElasticLoadBalancingV2::LoadBalancer")
            .len(),
        1
    );
    assert_eq!(
        template
            .resources_of_type("AWS::ElasticLoadBalancingV2::Listener")
            .len(),
        1
    );
    assert_eq!(
        template
            .resources_of_type("AWS::ElasticLoadBalancingV2::TargetGroup")
            .len(),
        1
    );
    assert_eq!(template.resources_of_type("AWS::EC2::VPCEndpointService").len(), 1);
    assert_eq!(template.resources_of_type("AWS::EC2::VPCEndpoint").len(), 1);
    assert_eq!(template.resources_of_type("AWS::EC2::Instance").len(), 1);

    Ok(())
}

#[test]
fn test_vpcs_use_disjoint_blocks_without_gateways() -> Result<()> {
    let template = default_template();

    let producer = template.resource("ProducerVpc").expect("producer VPC");
    let consumer = template.resource("ConsumerVpc").expect("consumer VPC");
    assert_eq!(producer.properties["CidrBlock"], json!(PRODUCER_CIDR));
    assert_eq!(consumer.properties["CidrBlock"], json!(CONSUMER_CIDR));

    assert!(template.resources_of_type("AWS::EC2::InternetGateway").is_empty());
    assert!(template.resources_of_type("AWS::EC2::NatGateway").is_empty());
    assert!(template.resources_of_type("AWS::EC2::Route").is_empty());

    Ok(())
}

#[test]
fn test_listener_forwards_tcp_80_to_target_group() -> Result<()> {
    let template = default_template();

    let listener = template
        .resource("NetworkLoadBalancerNLBListener")
        .expect("listener");
    assert_eq!(listener.properties["Port"], json!(80));
    assert_eq!(listener.properties["Protocol"], json!("TCP"));
    assert_eq!(
        listener.properties["DefaultActions"],
        json!([{
            "TargetGroupArn": {"Ref": "NetworkLoadBalancerNLBListenerNLBTargetGroup"},
            "Type": "forward",
        }])
    );
    assert_eq!(
        listener.properties["LoadBalancerArn"],
        json!({"Ref": "NetworkLoadBalancer"})
    );

    Ok(())
}

#[test]
fn test_target_group_targets_producer_instance() -> Result<()> {
    let template = default_template();

    let group = template
        .resource("NetworkLoadBalancerNLBListenerNLBTargetGroup")
        .expect("target group");
    assert_eq!(group.properties["Name"], json!("TargetGroup"));
    assert_eq!(group.properties["Protocol"], json!("TCP"));
    assert_eq!(group.properties["TargetType"], json!("instance"));
    assert_eq!(
        group.properties["Targets"],
        json!([{"Id": {"Ref": "ProducerEC2"}, "Port": 80}])
    );
    assert_eq!(group.properties["VpcId"], json!({"Ref": "ProducerVpc"}));
    assert!(group.properties.get("HealthCheckEnabled").is_none());

    Ok(())
}

#[test]
fn test_endpoint_service_requires_acceptance() -> Result<()> {
    let template = default_template();

    let service = template.resource("VpcEndpointService").expect("endpoint service");
    assert_eq!(service.properties["AcceptanceRequired"], json!(true));
    assert_eq!(
        service.properties["NetworkLoadBalancerArns"],
        json!([{"Ref": "NetworkLoadBalancer"}])
    );

    Ok(())
}

#[test]
fn test_endpoint_binds_service_name_in_consumer_private_subnets() -> Result<()> {
    let template = default_template();

    let endpoint = template.resource("VpcEndpoint").expect("endpoint");
    assert_eq!(endpoint.properties["ServiceName"], endpoint_service_name());
    assert_eq!(endpoint.properties["VpcEndpointType"], json!("Interface"));
    assert_eq!(endpoint.properties["VpcId"], json!({"Ref": "ConsumerVpc"}));
    assert_eq!(
        endpoint.properties["SubnetIds"],
        json!([
            {"Ref": "ConsumerVpcPrivateSubnet1Subnet"},
            {"Ref": "ConsumerVpcPrivateSubnet2Subnet"},
        ])
    );

    let group = template
        .resource("VpcEndpointSecurityGroup")
        .expect("endpoint security group");
    assert_eq!(group.properties["SecurityGroupIngress"][0]["FromPort"], json!(80));
    assert_eq!(group.properties["SecurityGroupIngress"][0]["ToPort"], json!(80));

    Ok(())
}

#[test]
fn test_producer_security_group_allows_all_tcp() -> Result<()> {
    let template = default_template();

    let group = template
        .resource("ProducerEC2SecurityGroup")
        .expect("producer security group");
    assert_eq!(
        group.properties["SecurityGroupIngress"],
        json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow all inbound",
            "FromPort": 0,
            "IpProtocol": "tcp",
            "ToPort": 65535,
        }])
    );

    Ok(())
}

#[test]
fn test_endpoint_service_name_output() -> Result<()> {
    let template = default_template();

    assert_eq!(
        template.outputs["EndpointServiceName"]["Value"],
        endpoint_service_name()
    );

    Ok(())
}

#[test]
fn test_removed_instance_leaves_dangling_target() -> Result<()> {
    let topology = default_topology();
    let stack = topology.stack().without(&LogicalId::new("ProducerEC2")?);

    match synthesize(&stack) {
        Err(TopologyError::DanglingReference { from, to }) => {
            assert_eq!(from, "NetworkLoadBalancerNLBListenerNLBTargetGroup");
            assert_eq!(to, "ProducerEC2");
        }
        other => panic!("expected dangling reference, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_synthesis_is_idempotent() -> Result<()> {
    let topology = default_topology();

    let first = topology.synthesize()?.to_json_pretty()?;
    let second = topology.synthesize()?.to_json_pretty()?;
    assert_eq!(first, second);

    let rebuilt = PrivateLinkTopology::build(&Default::default())?
        .synthesize()?
        .to_json_pretty()?;
    assert_eq!(first, rebuilt);

    Ok(())
}

#[test]
fn test_creation_order_respects_wiring() -> Result<()> {
    let order = default_template().creation_order()?;
    let position = |id: &str| {
        order
            .iter()
            .position(|o| o == id)
            .unwrap_or_else(|| panic!("{} missing from order", id))
    };

    assert!(position("ProducerVpc") < position("ProducerEC2"));
    assert!(position("ProducerEC2InstanceRole") < position("ProducerEC2"));
    assert!(position("ProducerEC2") < position("NetworkLoadBalancerNLBListenerNLBTargetGroup"));
    assert!(
        position("NetworkLoadBalancerNLBListenerNLBTargetGroup")
            < position("NetworkLoadBalancerNLBListener")
    );
    assert!(position("NetworkLoadBalancer") < position("VpcEndpointService"));
    assert!(position("VpcEndpointService") < position("VpcEndpoint"));
    assert!(position("ConsumerVpc") < position("VpcEndpoint"));

    Ok(())
}

#[test]
fn test_overlapping_networks_rejected() -> Result<()> {
    let config = config_with(PRODUCER_CIDR, "10.21.0.0/16");

    match PrivateLinkTopology::build(&config) {
        Err(TopologyError::Validation(ValidationError::OverlappingNetworks { producer, consumer })) => {
            assert_eq!(producer.to_string(), PRODUCER_CIDR);
            assert_eq!(consumer.to_string(), "10.21.0.0/16");
        }
        other => panic!("expected overlapping networks, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_custom_blocks_flow_into_template() -> Result<()> {
    let template = PrivateLinkTopology::build(&config_with("172.16.0.0/20", "192.168.0.0/24"))?
        .synthesize()?;

    assert_eq!(
        template.resource("ProducerVpc").expect("producer").properties["CidrBlock"],
        json!("172.16.0.0/20")
    );
    assert_eq!(
        template
            .resource("ConsumerVpcPrivateSubnet2Subnet")
            .expect("consumer subnet")
            .properties["CidrBlock"],
        json!("192.168.0.192/26")
    );

    Ok(())
}

#[test]
fn test_topology_handles_match_template() -> Result<()> {
    let topology = default_topology();

    assert_eq!(topology.producer().listener.protocol(), Protocol::Tcp);
    assert_eq!(
        topology.producer().listener.target_group().name(),
        Some("TargetGroup")
    );
    assert!(topology.producer().endpoint_service.acceptance_required());
    assert_eq!(
        topology.consumer().endpoint.service().name,
        topology.producer().endpoint_service.service_name()
    );

    Ok(())
}

#[test]
fn test_template_has_no_unresolved_placeholders() -> Result<()> {
    let json = default_template().to_json_pretty()?;

    assert!(
        !json.contains("${"),
        "late-bound values must be intrinsics, not interpolated text"
    );
    Ok(())
}
