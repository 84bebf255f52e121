// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - CIDR arithmetic used for subnet planning
//! - Topology synthesis across producer/consumer address plans

mod cidr_properties;
mod synthesis_properties;
