//! Convergence waiter - initial sync between sequencer and replicas

use crate::call::call;
use crate::error::{HarnessError, SetupError};
use l2_devnet::NodeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Replicas count as synced while their unsafe head is fewer than this many
/// blocks behind the sequencer's
pub const CONVERGENCE_GAP: i128 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceState {
    Polling,
    Converged,
    TimedOut,
}

/// Polls sync status until every replica is close to the sequencer
pub struct ConvergenceWaiter<'a> {
    nodes: &'a NodeSet,
    tick: Duration,
    timeout: Duration,
    rpc_timeout: Duration,
    state: ConvergenceState,
}

impl<'a> ConvergenceWaiter<'a> {
    pub fn new(nodes: &'a NodeSet, tick: Duration, timeout: Duration, rpc_timeout: Duration) -> Self {
        Self {
            nodes,
            tick,
            timeout,
            rpc_timeout,
            state: ConvergenceState::Polling,
        }
    }

    pub fn state(&self) -> ConvergenceState {
        self.state
    }

    /// Poll on every tick until converged or the timeout expires
    pub async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), HarnessError> {
        tracing::info!("Awaiting initial sync");
        let outcome = tokio::time::timeout(self.timeout, self.poll_until_converged(cancel)).await;
        match outcome {
            Ok(Ok(())) => {
                self.state = ConvergenceState::Converged;
                tracing::info!("Initial sync done");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.state = ConvergenceState::TimedOut;
                Err(SetupError::ConvergenceTimeout {
                    timeout: self.timeout,
                }
                .into())
            }
        }
    }

    async fn poll_until_converged(&self, cancel: &CancellationToken) -> Result<(), HarnessError> {
        let mut tick = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HarnessError::Cancelled),
                _ = tick.tick() => {}
            }
            if self.poll_once(cancel).await? == ConvergenceState::Converged {
                return Ok(());
            }
        }
    }

    /// One convergence check. Returns `Polling` when inconclusive.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> Result<ConvergenceState, HarnessError> {
        let sequencer = self.nodes.sequencer();
        let seq = call(cancel, self.rpc_timeout, sequencer.index, sequencer.rollup.sync_status()).await?;

        // No pending unsafe work on the sequencer says nothing about the replicas
        if seq.unsafe_l2.number == seq.safe_l2.number {
            tracing::info!(
                "Sequencer unsafe head is at safe head {}",
                seq.safe_l2.terminal_string()
            );
            return Ok(ConvergenceState::Polling);
        }

        for replica in self.nodes.replicas() {
            let rep = call(cancel, self.rpc_timeout, replica.index, replica.rollup.sync_status()).await?;
            let gap = seq.unsafe_l2.number as i128 - rep.unsafe_l2.number as i128;
            if gap >= CONVERGENCE_GAP {
                tracing::info!(
                    "Replica {} is not ready. Seq unsafe head: {}, replica unsafe head: {}",
                    replica.index,
                    seq.unsafe_l2.terminal_string(),
                    rep.unsafe_l2.terminal_string()
                );
                return Ok(ConvergenceState::Polling);
            }
        }
        Ok(ConvergenceState::Converged)
    }
}
