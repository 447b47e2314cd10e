//! Lattice daemon: runs a development node on an in-memory ledger.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use lattice_node::{init_logging, LatticeNode, LogFormat, NodeConfig};
use lattice_types::NetworkId;

#[derive(Parser)]
#[command(name = "lattice-node", about = "Block-lattice consensus node")]
struct Cli {
    /// Path to a TOML configuration file. Flags and env vars override it.
    #[arg(long, env = "LATTICE_CONFIG")]
    config: Option<PathBuf>,

    /// Network: "live", "test" or "dev".
    #[arg(long, env = "LATTICE_NETWORK")]
    network: Option<NetworkId>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LATTICE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LATTICE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT or SIGTERM.
    Run,
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the default configuration as TOML.
    Default,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path)
                .with_context(|| format!("failed to load config from {path}"))?
        }
        None => NodeConfig::default(),
    };
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::Config {
        action: ConfigAction::Default,
    } = cli.command
    {
        let toml = NodeConfig::default()
            .to_toml_string()
            .context("failed to serialize default config")?;
        println!("{toml}");
        return Ok(());
    }

    let config = load_config(&cli)?;
    let format: LogFormat = config.log_format.parse().context("invalid log format")?;
    init_logging(format, &config.log_level).context("failed to initialise logging")?;

    match cli.command {
        Command::Node {
            action: NodeAction::Run,
        } => {
            tracing::info!(network = ?config.network, "starting lattice node");
            let node = LatticeNode::new_dev(config).context("failed to open ledger")?;
            node.start().context("failed to start node")?;

            node.shutdown.wait_for_signal().await;
            node.stop().await;
            tracing::info!("lattice daemon exited cleanly");
        }
        Command::Config { .. } => {}
    }

    Ok(())
}
