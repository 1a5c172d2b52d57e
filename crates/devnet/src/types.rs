//! Core types observed from devnet nodes

use alloy_primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A block reference: height plus hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockId {
    /// Block height
    pub number: u64,
    /// Block hash
    pub hash: B256,
}

impl BlockId {
    pub fn new(number: u64, hash: B256) -> Self {
        Self { number, hash }
    }

    /// Short form for log lines, e.g. `0x1a2b..9f0e:42`
    pub fn terminal_string(&self) -> String {
        let hex = self.hash.to_string();
        format!("{}..{}:{}", &hex[..6], &hex[hex.len() - 4..], self.number)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.number)
    }
}

/// Snapshot of a rollup node's view of both chains
///
/// Field names follow the rollup node's `optimism_syncStatus` response.
/// Only the fields the harness reads are required; the rest are decoded
/// when the node reports them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// L1 block the derivation pipeline is currently reading
    pub current_l1: BlockId,
    /// Latest L1 block the node knows about
    pub head_l1: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_l1: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_l1: Option<BlockId>,
    /// Most recent L2 block, not yet confirmed on L1
    pub unsafe_l2: BlockId,
    /// L2 block derived from L1 data
    pub safe_l2: BlockId,
    /// L2 block derived from finalized L1 data
    pub finalized_l2: BlockId,
}

/// What a node knows about a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionInfo {
    pub hash: B256,
    /// True while the transaction sits in the pool without a block
    pub is_pending: bool,
}

/// Outcome of an included transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptInfo {
    pub hash: B256,
    /// 1 on success, 0 on revert
    pub status: u64,
    /// Block that included the transaction
    pub block: Option<BlockId>,
}

impl ReceiptInfo {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// A signed, EIP-2718 encoded transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: B256,
    pub raw: Bytes,
}
