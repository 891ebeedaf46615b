//! lensd: the GPU Lens daemon.
//!
//! Serves the diagnostics API over a persistent snapshot store, or runs a
//! one-off analysis over a snapshot file.
//!
//! # Usage
//!
//! ```text
//! lensd serve --config /etc/gpulens/gpulens.toml --port 8470
//! lensd analyze --snapshot cluster.json --report load-balance
//! lensd config > gpulens.toml
//! ```

mod config;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use gpulens_diag::{DiagnosticEngine, StaticSnapshot};
use tracing::{info, warn};

use crate::config::LensdConfig;

#[derive(Parser)]
#[command(name = "lensd", about = "GPU Lens diagnostics daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the diagnostics API.
    Serve {
        /// Path to gpulens.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the snapshot store (overrides the config file).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Analyze a snapshot file and print the report as JSON.
    Analyze {
        /// Snapshot JSON file with `nodes` and `pods`.
        #[arg(long)]
        snapshot: PathBuf,

        /// Path to gpulens.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "fragmentation")]
        report: Report,

        /// Node to report on with `--report node`.
        #[arg(long, required_if_eq("report", "node"))]
        node: Option<String>,
    },
    /// Print the default configuration as TOML.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    Fragmentation,
    LoadBalance,
    Node,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `analyze` output stays pipeable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,lensd=debug,gpulens=debug")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let mut config = LensdConfig::load(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }
            run_server(config).await
        }
        Command::Analyze {
            snapshot,
            config,
            report,
            node,
        } => {
            let config = LensdConfig::load(config.as_deref())?;
            run_analyze(&snapshot, config, report, node.as_deref())
        }
        Command::Config => {
            print!("{}", LensdConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

async fn run_server(config: LensdConfig) -> anyhow::Result<()> {
    info!(cluster = %config.server.cluster, "GPU Lens daemon starting");

    std::fs::create_dir_all(&config.server.data_dir)?;
    let db_path = config.server.data_dir.join("gpulens.redb");

    let store = gpulens_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "snapshot store opened");
    info!(policy = ?config.diagnostics.input_policy, "diagnostic engine initialized");

    let state = gpulens_api::ApiState::new(store, config.diagnostics, &config.server.cluster);
    let router = gpulens_api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("GPU Lens daemon stopped");
    Ok(())
}

fn run_analyze(
    snapshot_path: &Path,
    config: LensdConfig,
    report: Report,
    node: Option<&str>,
) -> anyhow::Result<()> {
    let snapshot = StaticSnapshot::from_json_file(snapshot_path)?;
    info!(
        path = ?snapshot_path,
        nodes = snapshot.nodes.len(),
        "snapshot loaded"
    );

    let engine = DiagnosticEngine::new(snapshot, config.diagnostics);
    let json = match report {
        Report::Fragmentation => serde_json::to_string_pretty(&engine.cluster_fragmentation()?)?,
        Report::LoadBalance => serde_json::to_string_pretty(&engine.load_balance()?)?,
        Report::Node => {
            let Some(name) = node else {
                anyhow::bail!("--node is required with --report node");
            };
            serde_json::to_string_pretty(&engine.node_fragmentation(name)?)?
        }
    };

    println!("{json}");
    Ok(())
}
