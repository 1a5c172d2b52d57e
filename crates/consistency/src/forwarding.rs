//! Transaction forwarding - a transaction sent to a replica must reach the sequencer

use crate::boot::BootWait;
use crate::call::call;
use crate::config::{LoadConfig, RunConfig};
use crate::error::{HarnessError, RunResult, SetupError};
use crate::load::build_transfer;
use l2_devnet::{wait_receipt, NodeSet, Vault, B256};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Submits through replica 1 and expects inclusion by the sequencer
pub struct ForwardingScenario {
    nodes: Arc<NodeSet>,
    vault: Arc<dyn Vault>,
    config: RunConfig,
    load: LoadConfig,
    /// Time allowed for the replica to forward before the sequencer is asked
    propagation_delay: Duration,
}

impl ForwardingScenario {
    pub fn new(nodes: Arc<NodeSet>, vault: Arc<dyn Vault>, config: RunConfig) -> Self {
        Self {
            nodes,
            vault,
            config,
            load: LoadConfig::priority(),
            propagation_delay: Duration::from_secs(10),
        }
    }

    pub fn with_load(mut self, load: LoadConfig) -> Self {
        self.load = load;
        self
    }

    pub fn with_propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }

    pub async fn run(&self) -> RunResult {
        self.run_until(&CancellationToken::new()).await
    }

    /// Run until done or until `cancel` fires, which fails the run
    pub async fn run_until(&self, cancel: &CancellationToken) -> RunResult {
        match self.forward(cancel).await {
            Ok(hash) => {
                tracing::info!("Forwarded transaction {} was included by the sequencer", hash);
                RunResult::Success
            }
            Err(cause) => RunResult::failure(cause),
        }
    }

    async fn forward(&self, cancel: &CancellationToken) -> Result<B256, HarnessError> {
        let sequencer = self.nodes.sequencer();
        let replica = self.nodes.get(1).map_err(|_| SetupError::Topology {
            expected: 1,
            actual: self.nodes.replica_count(),
        })?;
        let rpc_timeout = self.config.rpc_timeout();

        tracing::info!("Waiting for nodes to come up");
        let boot = BootWait {
            poll: self.config.convergence_tick(),
            timeout: self.config.boot_timeout(),
            rpc_timeout,
        };
        boot.wait_node(sequencer, cancel).await?;
        boot.wait_node(replica, cancel).await?;

        let sender = self
            .vault
            .create_account(sequencer.execution.as_ref(), self.load.sender_balance)
            .await?;
        let nonce = call(cancel, rpc_timeout, sequencer.index, sequencer.execution.nonce_at(sender)).await?;
        let signed = self
            .vault
            .sign_transaction(sender, build_transfer(&self.load, sender, nonce))
            .await?;

        call(cancel, rpc_timeout, replica.index, replica.execution.send_raw_transaction(&signed)).await?;
        tracing::info!("Sent tx {} to replica {}, waiting for propagation", signed.hash, replica.index);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HarnessError::Cancelled),
            _ = tokio::time::sleep(self.propagation_delay) => {}
        }

        let found = call(cancel, rpc_timeout, sequencer.index, sequencer.execution.transaction_by_hash(signed.hash))
            .await?
            .ok_or(HarnessError::NotForwarded { hash: signed.hash })?;
        tracing::info!("Found transaction on sequencer, pending: {}", found.is_pending);

        let receipt = call(
            cancel,
            self.config.receipt_timeout(),
            sequencer.index,
            wait_receipt(
                sequencer.execution.as_ref(),
                signed.hash,
                self.config.receipt_poll(),
                self.config.receipt_timeout(),
            ),
        )
        .await?;
        if !receipt.succeeded() {
            return Err(HarnessError::TransactionFailed { hash: signed.hash });
        }
        Ok(signed.hash)
    }
}
