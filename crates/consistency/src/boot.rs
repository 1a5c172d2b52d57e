//! Boot wait - block until nodes answer RPCs

use crate::call::call;
use crate::error::{HarnessError, SetupError};
use futures::future::try_join_all;
use l2_devnet::{NodeHandle, NodeSet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timing for the boot wait
#[derive(Debug, Clone, Copy)]
pub struct BootWait {
    pub poll: Duration,
    pub timeout: Duration,
    pub rpc_timeout: Duration,
}

impl BootWait {
    /// Wait for every node in `nodes` concurrently
    pub async fn wait_all(&self, nodes: &NodeSet, cancel: &CancellationToken) -> Result<(), HarnessError> {
        try_join_all(nodes.iter().map(|node| self.wait_node(node, cancel))).await?;
        tracing::info!("All {} nodes are up", nodes.len());
        Ok(())
    }

    /// Poll the node's execution engine until it reports a head block
    pub async fn wait_node(&self, node: &NodeHandle, cancel: &CancellationToken) -> Result<(), HarnessError> {
        let poll = async {
            let mut tick = tokio::time::interval(self.poll);
            loop {
                tick.tick().await;
                match call(cancel, self.rpc_timeout, node.index, node.execution.block_by_number(None)).await {
                    Ok(Some(head)) => {
                        tracing::debug!("Node {} is up at {}", node.index, head.terminal_string());
                        return Ok(());
                    }
                    Ok(None) => tracing::debug!("Node {} has no head block yet", node.index),
                    Err(HarnessError::Cancelled) => return Err(HarnessError::Cancelled),
                    Err(e) => tracing::debug!("Node {} not up yet: {}", node.index, e),
                }
            }
        };

        match tokio::time::timeout(self.timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(SetupError::BootTimeout {
                node: node.index,
                timeout: self.timeout,
            }
            .into()),
        }
    }
}
