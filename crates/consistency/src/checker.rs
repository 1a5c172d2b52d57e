//! Consistency checker - replicas must track the sequencer's canonical chain

use crate::aggregator::ErrorReporter;
use crate::call::call;
use crate::error::{DivergenceError, HarnessError};
use l2_devnet::{BlockId, NodeSet, SyncStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Checks every replica against the sequencer on each tick.
///
/// A replica passes a tick when its unsafe head trails the sequencer head by
/// at most `max_replica_lag` blocks and the sequencer has the same hash at
/// that height.
pub struct ConsistencyChecker {
    nodes: Arc<NodeSet>,
    max_replica_lag: u64,
    tick: Duration,
    rpc_timeout: Duration,
}

impl ConsistencyChecker {
    pub fn new(nodes: Arc<NodeSet>, max_replica_lag: u64, tick: Duration, rpc_timeout: Duration) -> Self {
        Self {
            nodes,
            max_replica_lag,
            tick,
            rpc_timeout,
        }
    }

    /// Check on every tick until cancelled or a check fails
    pub async fn run(self, cancel: CancellationToken, reporter: ErrorReporter) {
        let mut tick = tokio::time::interval(self.tick);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut checks = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {}
            }
            if let Err(e) = self.check_once(&cancel).await {
                reporter.report("checker", e);
                return;
            }
            checks += 1;
        }
        tracing::debug!("Consistency checker stopped after {} checks", checks);
    }

    /// One pass over all replicas. Read-only.
    pub async fn check_once(&self, cancel: &CancellationToken) -> Result<(), HarnessError> {
        let sequencer = self.nodes.sequencer();
        let head = call(cancel, self.rpc_timeout, sequencer.index, sequencer.execution.block_by_number(None))
            .await?
            .ok_or_else(|| HarnessError::Transport {
                node: sequencer.index,
                source: l2_devnet::ClientError::Decode("sequencer returned no head block".to_string()),
            })?;

        for replica in self.nodes.replicas() {
            let status = call(cancel, self.rpc_timeout, replica.index, replica.rollup.sync_status()).await?;
            log_sync_status(replica.index, &status);
            self.check_canon(cancel, replica.index, head.number, status.unsafe_l2).await?;
        }
        Ok(())
    }

    /// `head` is the sequencer's, `id` is the replica's unsafe head
    async fn check_canon(
        &self,
        cancel: &CancellationToken,
        replica: usize,
        head: u64,
        id: BlockId,
    ) -> Result<(), HarnessError> {
        check_lag(replica, head, id.number, self.max_replica_lag)?;

        let sequencer = self.nodes.sequencer();
        let block = call(
            cancel,
            self.rpc_timeout,
            sequencer.index,
            sequencer.execution.block_by_number(Some(id.number)),
        )
        .await?
        .ok_or(DivergenceError::MissingHeight {
            replica,
            height: id.number,
        })?;

        if block.hash != id.hash {
            return Err(DivergenceError::HashMismatch {
                replica,
                height: id.number,
                sequencer: block.hash,
                replica_hash: id.hash,
            }
            .into());
        }
        Ok(())
    }
}

/// Lag bound on heights. Signed so a replica ahead of the sampled head
/// is never reported as lagging.
pub fn check_lag(replica: usize, head: u64, replica_head: u64, max_lag: u64) -> Result<(), DivergenceError> {
    if head as i128 - replica_head as i128 > max_lag as i128 {
        return Err(DivergenceError::ExcessiveLag {
            replica,
            sequencer_head: head,
            replica_head,
            max_lag,
        });
    }
    Ok(())
}

fn log_sync_status(index: usize, status: &SyncStatus) {
    tracing::debug!(
        "replica-{} currentL1={} headL1={} finalizedL2={} safeL2={} unsafeL2={}",
        index,
        status.current_l1.terminal_string(),
        status.head_l1.terminal_string(),
        status.finalized_l2.terminal_string(),
        status.safe_l2.terminal_string(),
        status.unsafe_l2.terminal_string()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_boundary() {
        assert!(check_lag(1, 100, 95, 5).is_ok());
        assert_eq!(
            check_lag(1, 100, 94, 5),
            Err(DivergenceError::ExcessiveLag {
                replica: 1,
                sequencer_head: 100,
                replica_head: 94,
                max_lag: 5,
            })
        );
    }

    #[test]
    fn test_replica_ahead_is_not_lag() {
        assert!(check_lag(1, 10, 12, 0).is_ok());
        assert!(check_lag(1, 0, u64::MAX, 0).is_ok());
    }

    #[test]
    fn test_zero_lag_requires_exact_height() {
        assert!(check_lag(2, 7, 7, 0).is_ok());
        assert!(check_lag(2, 7, 6, 0).is_err());
    }
}
