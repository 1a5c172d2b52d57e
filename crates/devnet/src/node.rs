//! Node handles and the registry that owns them

use crate::client::{ExecutionClient, PeerClient, RollupClient};
use std::fmt;
use std::sync::Arc;

/// Index of the sequencer within a `NodeSet`
pub const SEQUENCER: usize = 0;

/// Live handle to one rollup node and its execution engine
#[derive(Clone)]
pub struct NodeHandle {
    /// Position in the node set (0 = sequencer)
    pub index: usize,
    /// Execution engine RPC
    pub execution: Arc<dyn ExecutionClient>,
    /// Rollup node sync-status RPC
    pub rollup: Arc<dyn RollupClient>,
    /// Rollup node p2p admin RPC
    pub p2p: Arc<dyn PeerClient>,
    /// Address other nodes dial to reach this one
    pub peer_addr: String,
}

impl NodeHandle {
    pub fn is_sequencer(&self) -> bool {
        self.index == SEQUENCER
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("index", &self.index)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

/// Fixed set of nodes: the sequencer at index 0, replicas after it.
///
/// Built once, then shared read-only (`Arc<NodeSet>`) by every component.
#[derive(Debug, Clone)]
pub struct NodeSet {
    nodes: Vec<NodeHandle>,
}

impl NodeSet {
    /// Build a node set. Handles must be indexed `0..nodes.len()` in order.
    pub fn new(nodes: Vec<NodeHandle>) -> Result<Self, DevnetError> {
        if nodes.is_empty() {
            return Err(DevnetError::Empty);
        }
        for (position, node) in nodes.iter().enumerate() {
            if node.index != position {
                return Err(DevnetError::MisorderedIndex {
                    position,
                    index: node.index,
                });
            }
        }
        Ok(Self { nodes })
    }

    /// Node by index
    pub fn get(&self, index: usize) -> Result<&NodeHandle, DevnetError> {
        self.nodes.get(index).ok_or(DevnetError::NoSuchNode(index))
    }

    pub fn sequencer(&self) -> &NodeHandle {
        &self.nodes[SEQUENCER]
    }

    /// Replicas in index order (everything but the sequencer)
    pub fn replicas(&self) -> impl Iterator<Item = &NodeHandle> {
        self.nodes.iter().skip(1)
    }

    /// All nodes, sequencer first
    pub fn iter(&self) -> impl Iterator<Item = &NodeHandle> {
        self.nodes.iter()
    }

    pub fn replica_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DevnetError {
    #[error("node set is empty")]
    Empty,
    #[error("node at position {position} has index {index}")]
    MisorderedIndex { position: usize, index: usize },
    #[error("no node with index {0}")]
    NoSuchNode(usize),
    #[error("invalid devnet config: {0}")]
    Config(String),
    #[error(transparent)]
    Client(#[from] crate::client::ClientError),
    #[error(transparent)]
    Vault(#[from] crate::vault::VaultError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::types::{BlockId, ReceiptInfo, SignedTransaction, SyncStatus, TransactionInfo};
    use alloy_primitives::{Address, B256};
    use async_trait::async_trait;

    struct Idle;

    #[async_trait]
    impl ExecutionClient for Idle {
        async fn block_by_number(&self, _: Option<u64>) -> Result<Option<BlockId>, ClientError> {
            Ok(None)
        }
        async fn nonce_at(&self, _: Address) -> Result<u64, ClientError> {
            Ok(0)
        }
        async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<B256, ClientError> {
            Ok(tx.hash)
        }
        async fn transaction_by_hash(&self, _: B256) -> Result<Option<TransactionInfo>, ClientError> {
            Ok(None)
        }
        async fn transaction_receipt(&self, _: B256) -> Result<Option<ReceiptInfo>, ClientError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl RollupClient for Idle {
        async fn sync_status(&self) -> Result<SyncStatus, ClientError> {
            Ok(SyncStatus::default())
        }
    }

    #[async_trait]
    impl PeerClient for Idle {
        async fn connect_peer(&self, _: &str) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn handle(index: usize) -> NodeHandle {
        let idle = Arc::new(Idle);
        NodeHandle {
            index,
            execution: idle.clone(),
            rollup: idle.clone(),
            p2p: idle,
            peer_addr: format!("/ip4/127.0.0.1/tcp/{}", 9222 + index),
        }
    }

    #[test]
    fn test_accessors() {
        let set = NodeSet::new((0..3).map(handle).collect()).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.replica_count(), 2);
        assert!(set.sequencer().is_sequencer());
        assert_eq!(set.replicas().map(|n| n.index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(set.get(2).unwrap().peer_addr, "/ip4/127.0.0.1/tcp/9224");
        assert!(matches!(set.get(3), Err(DevnetError::NoSuchNode(3))));
    }

    #[test]
    fn test_rejects_bad_layout() {
        assert!(matches!(NodeSet::new(Vec::new()), Err(DevnetError::Empty)));

        let shuffled = vec![handle(0), handle(2), handle(1)];
        assert!(matches!(
            NodeSet::new(shuffled),
            Err(DevnetError::MisorderedIndex { position: 1, index: 2 })
        ));
    }
}
