//! L2 Devnet - handles to a running rollup devnet
//!
//! Provides what the consistency harness consumes from provisioning:
//! - Node handles (execution RPC, rollup sync status, p2p admin, peer address)
//! - JSON-RPC clients for execution engines and rollup nodes
//! - A vault that funds accounts and signs transactions
//! - Receipt polling

pub mod client;
pub mod config;
pub mod node;
pub mod receipt;
pub mod rpc;
pub mod types;
pub mod vault;

pub use client::{ClientError, ExecutionClient, PeerClient, RollupClient};
pub use config::{DevnetConfig, NodeEndpoints};
pub use node::{DevnetError, NodeHandle, NodeSet, SEQUENCER};
pub use receipt::wait_receipt;
pub use rpc::{HttpExecutionClient, HttpRollupClient};
pub use types::{BlockId, ReceiptInfo, SignedTransaction, SyncStatus, TransactionInfo};
pub use vault::{LocalVault, Vault, VaultError};

/// Re-exported so callers can build transactions without naming alloy crates
pub use alloy_consensus::TxEip1559;
pub use alloy_primitives::{Address, Bytes, TxKind, B256, U256};

/// One ether in wei
pub const ETHER: u128 = 1_000_000_000_000_000_000;
