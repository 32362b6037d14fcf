//! Command-line definitions using clap

use clap::Parser;
use std::path::PathBuf;

/// Tessera node - hosts agents for one cluster node
#[derive(Parser, Debug)]
#[command(name = "tessera-node")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Cluster configuration file (YAML, TOML, JSON, INI, RON or JSON5)
    #[arg(short = 'c', long, env = "TESSERA_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Start the ping-pong demonstration agents on this node
    #[arg(long)]
    pub ping_pong: bool,

    /// Ping-pong rounds to run
    #[arg(long, default_value_t = 3, requires = "ping_pong")]
    pub rounds: usize,
}
