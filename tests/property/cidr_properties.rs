// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for CIDR Arithmetic
//!
//! Subnet layout is derived by splitting the VPC block, so splitting must
//! produce disjoint children that exactly cover the parent.

use privatelink_topology::domain::Ipv4Cidr;
use proptest::prelude::*;
use std::net::Ipv4Addr;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate a valid block by masking a random address
fn cidr(min_prefix: u8, max_prefix: u8) -> impl Strategy<Value = Ipv4Cidr> {
    (any::<u32>(), min_prefix..=max_prefix).prop_map(|(bits, prefix)| {
        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) };
        Ipv4Cidr::from_network(Ipv4Addr::from(bits & mask), prefix)
            .expect("masked address has no host bits")
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Children of a split are disjoint and cover the parent
    #[test]
    fn prop_subdivide_partitions_parent(parent in cidr(8, 28), extra in 0u8..=4) {
        let children: Vec<Ipv4Cidr> = parent.subdivide(parent.prefix_length() + extra).unwrap().collect();

        prop_assert_eq!(children.len(), 1usize << extra);
        prop_assert_eq!(children[0].network(), parent.network());
        prop_assert_eq!(children[children.len() - 1].last_address(), parent.last_address());

        let total: u64 = children.iter().map(Ipv4Cidr::size).sum();
        prop_assert_eq!(total, parent.size());

        for (i, child) in children.iter().enumerate() {
            prop_assert!(parent.contains(child));
            for other in &children[i + 1..] {
                prop_assert!(!child.overlaps(other), "{} overlaps {}", child, other);
            }
        }
    }

    /// Property: Overlap is symmetric and agrees with address membership
    #[test]
    fn prop_overlap_is_symmetric(a in cidr(8, 30), b in cidr(8, 30)) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));

        let shares_network = a.contains_address(b.network()) || b.contains_address(a.network());
        prop_assert_eq!(a.overlaps(&b), shares_network);
    }

    /// Property: Display output parses back to the same block
    #[test]
    fn prop_display_parses_back(block in cidr(0, 32)) {
        let parsed = Ipv4Cidr::new(block.to_string()).unwrap();
        prop_assert_eq!(parsed, block);
    }

    /// Property: Any address with host bits set is rejected
    #[test]
    fn prop_host_bits_rejected(block in cidr(1, 31), offset in 1u32..) {
        let host = u32::from(block.network()) | (offset % (block.size() as u32));
        prop_assume!(host != u32::from(block.network()));

        let text = format!("{}/{}", Ipv4Addr::from(host), block.prefix_length());
        prop_assert!(Ipv4Cidr::new(text).is_err());
    }
}
