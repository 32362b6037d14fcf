//! Tessera node - entry point.
//!
//! Loads the cluster topology (fatal on error), starts the node, optionally
//! runs the ping-pong demonstration, and waits for Ctrl-C.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TESSERA_CONFIG` | *(none)* | Cluster configuration file, same as `--config`. |
//! | `RUST_LOG` | `info` (`debug` with `--verbose`) | Log filter directives. |

mod agents;
mod cli;

use anyhow::anyhow;
use clap::Parser;
use cli::Cli;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tessera_runtime::{AgentNode, RuntimeConfig, TopologyLoader};
use tracing::info;
use tracing_subscriber::EnvFilter;

static TOPOLOGY: TopologyLoader = TopologyLoader::new();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let topology = TOPOLOGY
        .load(&cli.config)
        .map_err(|report| anyhow!("{report:?}"))?;
    for endpoint in topology.transport_endpoints() {
        info!(
            name = %endpoint.name,
            host = %endpoint.host,
            port = endpoint.port,
            "Transport endpoint"
        );
    }
    let runtime = RuntimeConfig::from_file(&cli.config)?;

    let completed = Arc::new(AtomicUsize::new(0));
    let mut builder = AgentNode::builder(topology).with_runtime_config(runtime);
    for factory in agents::factories(Arc::clone(&completed)) {
        builder = builder.with_factory(factory);
    }
    let node = builder.build()?;

    let classes: Vec<String> = node
        .registry()
        .agent_classes()
        .iter()
        .map(ToString::to_string)
        .collect();
    info!(?classes, "Deployable agent classes");

    if cli.ping_pong {
        let ping = agents::run_ping_pong(&node, cli.rounds).await?;
        info!(aid = %ping, rounds = cli.rounds, "Ping-pong demonstration running");
    }

    info!(address = %node.address(), "Node running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    node.shutdown().await;
    Ok(())
}
