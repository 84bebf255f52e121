// Copyright (c) 2025 - Cowboy AI, Inc.
//! PrivateLink Template Synthesizer
//!
//! Declares the producer/consumer PrivateLink topology and writes the
//! CloudFormation template for the provisioning engine.
//!
//! Run with: cargo run --bin privatelink-synth
//!
//! Configuration (all optional):
//! - `PRIVATELINK_STACK_NAME` (default `PrivateLinkStack`)
//! - `PRIVATELINK_PRODUCER_CIDR` / `PRIVATELINK_CONSUMER_CIDR`
//! - `PRIVATELINK_SERVICE_PORT`, `PRIVATELINK_INSTANCE_TYPE`, `PRIVATELINK_MAX_AZS`
//! - `PRIVATELINK_OUT_DIR` (or `CDK_OUTDIR`); the template goes to stdout when unset
//!
//! Logs go to stderr so stdout stays a clean template.

use anyhow::{Context, Result};
use privatelink_topology::{PrivateLinkTopology, TopologyConfig};
use std::io::Write;
use tracing::{debug, info};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = TopologyConfig::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded:");
    info!("  - Stack: {}", config.stack_name);
    info!("  - Producer CIDR: {}", config.producer_cidr);
    info!("  - Consumer CIDR: {}", config.consumer_cidr);
    info!("  - Service port: {}", config.service_port);

    let topology = PrivateLinkTopology::build(&config).context("Failed to declare topology")?;
    let template = topology
        .synthesize()
        .context("Failed to synthesize template")?;
    let order = template
        .creation_order()
        .context("Template has a dependency cycle")?;
    debug!(?order, "resource creation order");

    match &config.out_dir {
        Some(dir) => {
            let path = template
                .write_to(dir, &config.template_file_name())
                .context("Failed to write template")?;
            info!("Wrote {} resources to {}", template.resources.len(), path.display());
        }
        None => {
            let json = template
                .to_json_pretty()
                .context("Failed to render template")?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write template to stdout")?;
        }
    }

    Ok(())
}
