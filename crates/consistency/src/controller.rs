//! Run controller - drives the phases of a consistency run
//!
//! Phases, in order:
//! 1. Boot wait: every node answers RPCs
//! 2. Peer mesh: every replica dials every other node
//! 3. Funding: a fresh sender account for the load generator
//! 4. Convergence: replicas catch up with the sequencer
//! 5. Steady state: load generator and consistency checker run concurrently
//!    until the timer expires or either reports an error

use crate::aggregator::ErrorAggregator;
use crate::boot::BootWait;
use crate::checker::ConsistencyChecker;
use crate::config::{LoadConfig, RunConfig};
use crate::convergence::ConvergenceWaiter;
use crate::error::{HarnessError, RunResult, SetupError};
use crate::load::LoadGenerator;
use crate::mesh::build_mesh;
use futures::future::join_all;
use l2_devnet::{Address, NodeSet, Vault};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Tasks running during steady state
const TASK_NAMES: [&str; 2] = ["load", "checker"];

/// Consistency harness for one sequencer and its replicas
pub struct P2pHarness {
    nodes: Arc<NodeSet>,
    vault: Arc<dyn Vault>,
    config: RunConfig,
    load: LoadConfig,
}

impl P2pHarness {
    pub fn new(nodes: Arc<NodeSet>, vault: Arc<dyn Vault>, config: RunConfig, load: LoadConfig) -> Self {
        Self {
            nodes,
            vault,
            config,
            load,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run all phases. Exactly one outcome is returned.
    pub async fn run(&self) -> RunResult {
        let cancel = CancellationToken::new();
        let result = match self.setup(&cancel).await {
            Ok(sender) => self.run_steady_state(sender, cancel.clone()).await,
            Err(cause) => RunResult::failure(cause),
        };
        cancel.cancel();
        match &result {
            RunResult::Success => tracing::info!("Consistency run passed"),
            RunResult::Failure { .. } => tracing::error!("Consistency run {}", result),
        }
        result
    }

    /// Sequential phases. Returns the funded sender.
    async fn setup(&self, cancel: &CancellationToken) -> Result<Address, HarnessError> {
        self.config.validate()?;
        if self.nodes.replica_count() != self.config.replica_count {
            return Err(SetupError::Topology {
                expected: self.config.replica_count,
                actual: self.nodes.replica_count(),
            }
            .into());
        }

        tracing::info!("Waiting for nodes to come up");
        BootWait {
            poll: self.config.convergence_tick(),
            timeout: self.config.boot_timeout(),
            rpc_timeout: self.config.rpc_timeout(),
        }
        .wait_all(&self.nodes, cancel)
        .await?;

        build_mesh(&self.nodes, self.config.rpc_timeout(), cancel).await?;

        let sequencer = self.nodes.sequencer();
        let sender = self
            .vault
            .create_account(sequencer.execution.as_ref(), self.load.sender_balance)
            .await?;

        ConvergenceWaiter::new(
            &self.nodes,
            self.config.convergence_tick(),
            self.config.convergence_timeout(),
            self.config.rpc_timeout(),
        )
        .wait(cancel)
        .await?;

        Ok(sender)
    }

    async fn run_steady_state(&self, sender: Address, cancel: CancellationToken) -> RunResult {
        let (aggregator, reporter) = ErrorAggregator::channel(TASK_NAMES.len(), cancel.clone());

        let load = LoadGenerator::new(self.nodes.clone(), self.vault.clone(), sender, self.load.clone())
            .with_tick(self.config.tick_interval())
            .with_rpc_timeout(self.config.rpc_timeout())
            .with_receipt_wait(self.config.receipt_poll(), self.config.receipt_timeout());
        let checker = ConsistencyChecker::new(
            self.nodes.clone(),
            self.config.max_replica_lag,
            self.config.tick_interval(),
            self.config.rpc_timeout(),
        );

        let handles = vec![
            tokio::spawn(load.run(cancel.child_token(), reporter.clone())),
            tokio::spawn(checker.run(cancel.child_token(), reporter)),
        ];
        tracing::info!(
            "Steady state: {} replicas, max lag {}, for {:?}",
            self.nodes.replica_count(),
            self.config.max_replica_lag,
            self.config.steady_state_timeout()
        );

        let mut result = aggregator.race(self.config.steady_state_timeout()).await;

        // Both tasks observe the cancelled token within one tick
        for (task, joined) in TASK_NAMES.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                tracing::error!("{} task panicked: {}", task, e);
                if result.is_success() {
                    result = RunResult::failure(HarnessError::TaskAborted { task });
                }
            }
        }
        result
    }
}

/// Builder for P2pHarness
pub struct HarnessBuilder {
    nodes: Option<Arc<NodeSet>>,
    vault: Option<Arc<dyn Vault>>,
    config: RunConfig,
    load: LoadConfig,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            nodes: None,
            vault: None,
            config: RunConfig::default(),
            load: LoadConfig::default(),
        }
    }

    pub fn nodes(mut self, nodes: Arc<NodeSet>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn load(mut self, load: LoadConfig) -> Self {
        self.load = load;
        self
    }

    pub fn max_replica_lag(mut self, lag: u64) -> Self {
        self.config.max_replica_lag = lag;
        self
    }

    /// Fails when nodes or vault are missing
    pub fn build(self) -> Result<P2pHarness, SetupError> {
        let nodes = self
            .nodes
            .ok_or_else(|| SetupError::InvalidConfig("no node set".to_string()))?;
        let vault = self
            .vault
            .ok_or_else(|| SetupError::InvalidConfig("no vault".to_string()))?;
        Ok(P2pHarness::new(nodes, vault, self.config, self.load))
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
