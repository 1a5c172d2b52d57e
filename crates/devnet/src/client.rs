//! Client interfaces exposed by devnet nodes
//!
//! The harness only talks to nodes through these traits:
//! - `ExecutionClient`: blocks, nonces, transaction submission and lookup
//! - `RollupClient`: rollup sync status
//! - `PeerClient`: peer-to-peer admin (connecting peers)

use crate::types::{BlockId, ReceiptInfo, SignedTransaction, SyncStatus, TransactionInfo};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::time::Duration;

/// Execution-layer JSON-RPC surface used by the harness
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Block at `number`, or the latest block when `None`.
    /// `Ok(None)` means the node has no block at that height.
    async fn block_by_number(&self, number: Option<u64>) -> Result<Option<BlockId>, ClientError>;

    /// Account nonce at the latest block
    async fn nonce_at(&self, address: Address) -> Result<u64, ClientError>;

    /// Submit a signed transaction, returning its hash
    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<B256, ClientError>;

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<TransactionInfo>, ClientError>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, ClientError>;
}

/// Rollup node sync status
#[async_trait]
pub trait RollupClient: Send + Sync {
    async fn sync_status(&self) -> Result<SyncStatus, ClientError>;
}

/// Rollup node peer-to-peer admin API
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Dial the peer at `addr` (a multiaddr)
    async fn connect_peer(&self, addr: &str) -> Result<(), ClientError>;
}

/// Errors from talking to a node
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("rpc error: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("node unavailable: {0}")]
    Unavailable(String),
}
