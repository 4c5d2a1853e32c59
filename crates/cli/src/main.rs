//! Cluster snapshot CLI
//!
//! A command-line tool for snapshotting nodes and pods from `kubectl` JSON,
//! revising node allocatable for system overhead, and comparing stored
//! cluster snapshots.

mod commands;
mod config;
mod loader;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{diff, nodes, pods, quantity, revise};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CliConfig, LogFormat};

/// Cluster snapshot CLI
#[derive(Parser)]
#[command(name = "csnap")]
#[command(author, version, about = "CLI for inspecting cluster snapshots", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/csnap/config.toml)
    #[arg(long, env = "CSNAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (overrides the configured default)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Snapshot nodes from a node list (kubectl get nodes -o json)
    Nodes {
        /// Node list file
        file: PathBuf,
    },

    /// Snapshot pods from a pod list (kubectl get pods -A -o json)
    Pods {
        /// Pod list file
        file: PathBuf,

        /// Only show pods in this namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Revise node allocatable for system pods and kubelet reservation
    Revise {
        /// Node list file
        #[arg(long)]
        nodes: PathBuf,

        /// Pod list file
        #[arg(long)]
        pods: PathBuf,

        /// Namespace of system pods (overrides the configured one)
        #[arg(long)]
        reserved_namespace: Option<String>,
    },

    /// Compare two serialized cluster snapshots
    Diff {
        /// Older snapshot
        old: PathBuf,

        /// Newer snapshot
        new: PathBuf,
    },

    /// Print canonical forms of resource quantities
    Quantity {
        /// Quantities such as 1.5Gi, 250m or 2e3
        #[arg(required = true)]
        values: Vec<String>,
    },
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    init_tracing(config.log_format, cli.verbose);
    debug!(?config, "Loaded configuration");

    let format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Nodes { file } => {
            nodes::show_nodes(&file, &config, format).await?;
        }
        Commands::Pods { file, namespace } => {
            pods::show_pods(&file, namespace.as_deref(), &config, format).await?;
        }
        Commands::Revise {
            nodes,
            pods,
            reserved_namespace,
        } => {
            if let Some(ns) = reserved_namespace {
                config.reserved_namespace = ns;
            }
            revise::show_revised(&nodes, &pods, &config, format).await?;
        }
        Commands::Diff { old, new } => {
            diff::show_diff(&old, &new, format).await?;
        }
        Commands::Quantity { values } => {
            quantity::show_quantities(&values, format)?;
        }
    }

    Ok(())
}
