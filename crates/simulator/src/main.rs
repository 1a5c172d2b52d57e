//! Rollup P2P Simulator
//!
//! Runs consistency scenarios against an already running devnet:
//! - p2p: replicas must follow the sequencer's chain under load
//! - tx-forwarding: transactions sent to a replica must reach the sequencer

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use l2_consistency::{ForwardingScenario, HarnessBuilder, RunResult};
use l2_devnet::{NodeSet, Vault};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::SimulatorConfig;

/// Scenario selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Sequencer/replica consistency under load
    P2p,
    /// Replica forwards submitted transactions to the sequencer
    TxForwarding,
    /// Both, p2p first
    All,
}

/// Rollup P2P consistency simulator
#[derive(Parser, Debug)]
#[command(name = "p2p-sim")]
#[command(about = "Checks that rollup replicas stay on the sequencer's chain", long_about = None)]
struct Args {
    /// Simulator config (devnet endpoints, run timings, load template)
    #[arg(long, default_value = "./devnet.json")]
    config: PathBuf,

    /// Scenario to run
    #[arg(long, value_enum, default_value = "p2p")]
    scenario: Scenario,

    /// Override the maximum number of blocks a replica may trail
    #[arg(long)]
    max_replica_lag: Option<u64>,

    /// Override the steady-state window in seconds
    #[arg(long)]
    steady_state_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = SimulatorConfig::load(&args.config)?;
    if let Some(lag) = args.max_replica_lag {
        config.run.max_replica_lag = lag;
    }
    if let Some(secs) = args.steady_state_secs {
        config.run.steady_state_timeout_ms = secs * 1_000;
    }

    tracing::info!("Starting rollup p2p simulator");
    tracing::info!("  Config: {:?}", args.config);
    tracing::info!("  Scenario: {:?}", args.scenario);
    tracing::info!("  Nodes: {} (1 sequencer, {} replicas)", config.devnet.nodes.len(), config.run.replica_count);
    tracing::info!("  Max replica lag: {} blocks", config.run.max_replica_lag);
    tracing::info!("  Steady state: {:?}", config.run.steady_state_timeout());

    let nodes = Arc::new(config.devnet.connect()?);
    let vault: Arc<dyn Vault> = Arc::new(
        config
            .devnet
            .vault()?
            .with_receipt_wait(config.run.receipt_poll(), config.run.receipt_timeout()),
    );

    let mut failed = Vec::new();
    if matches!(args.scenario, Scenario::P2p | Scenario::All) {
        let result = run_p2p(&config, nodes.clone(), vault.clone()).await?;
        report("p2p", &result);
        if !result.is_success() {
            failed.push("p2p");
        }
    }
    if matches!(args.scenario, Scenario::TxForwarding | Scenario::All) {
        let result = run_forwarding(&config, nodes, vault).await;
        report("tx-forwarding", &result);
        if !result.is_success() {
            failed.push("tx-forwarding");
        }
    }

    if !failed.is_empty() {
        bail!("failed scenarios: {}", failed.join(", "));
    }
    Ok(())
}

async fn run_p2p(config: &SimulatorConfig, nodes: Arc<NodeSet>, vault: Arc<dyn Vault>) -> Result<RunResult> {
    let harness = HarnessBuilder::new()
        .nodes(nodes)
        .vault(vault)
        .config(config.run.clone())
        .load(config.load.clone())
        .build()?;
    Ok(harness.run().await)
}

async fn run_forwarding(config: &SimulatorConfig, nodes: Arc<NodeSet>, vault: Arc<dyn Vault>) -> RunResult {
    ForwardingScenario::new(nodes, vault, config.run.clone())
        .with_propagation_delay(config.propagation_delay())
        .run()
        .await
}

fn report(scenario: &str, result: &RunResult) {
    let finished = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    match result {
        RunResult::Success => tracing::info!("[{}] {} passed", finished, scenario),
        RunResult::Failure { .. } => tracing::error!("[{}] {} {}", finished, scenario, result),
    }
}
