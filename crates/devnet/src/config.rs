//! Devnet description - endpoints of already running nodes

use crate::node::{DevnetError, NodeHandle, NodeSet};
use crate::rpc::{HttpExecutionClient, HttpRollupClient};
use crate::vault::LocalVault;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Endpoints of a single node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEndpoints {
    /// Execution engine HTTP RPC URL
    pub execution_rpc: String,
    /// Rollup node HTTP RPC URL (sync status and p2p admin)
    pub rollup_rpc: String,
    /// Multiaddr other nodes dial to peer with this node
    pub p2p_addr: String,
}

/// A running devnet: the sequencer first, replicas after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevnetConfig {
    /// L2 chain ID used when signing
    pub chain_id: u64,
    /// Hex private key of an account funded in L2 genesis
    pub faucet_key: String,
    /// Per-request HTTP timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    pub nodes: Vec<NodeEndpoints>,
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            chain_id: 901,
            faucet_key: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            nodes: Vec::new(),
        }
    }
}

impl DevnetConfig {
    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DevnetError> {
        let data = std::fs::read_to_string(&path).map_err(|e| {
            DevnetError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, DevnetError> {
        let config: Self =
            serde_json::from_str(data).map_err(|e| DevnetError::Config(e.to_string()))?;
        if config.nodes.is_empty() {
            return Err(DevnetError::Config("no nodes listed".to_string()));
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Build JSON-RPC clients for every listed node
    pub fn connect(&self) -> Result<NodeSet, DevnetError> {
        let timeout = self.request_timeout();
        let mut handles = Vec::with_capacity(self.nodes.len());
        for (index, endpoints) in self.nodes.iter().enumerate() {
            let execution = Arc::new(HttpExecutionClient::new(&endpoints.execution_rpc, timeout)?);
            let rollup = Arc::new(HttpRollupClient::new(&endpoints.rollup_rpc, timeout)?);
            tracing::debug!(
                "Node {}: execution {}, rollup {}",
                index,
                execution.url(),
                rollup.url()
            );
            handles.push(NodeHandle {
                index,
                execution,
                rollup: rollup.clone(),
                p2p: rollup,
                peer_addr: endpoints.p2p_addr.clone(),
            });
        }
        tracing::debug!("Connected clients for {} nodes", handles.len());
        NodeSet::new(handles)
    }

    /// Vault seeded with the faucet key
    pub fn vault(&self) -> Result<LocalVault, DevnetError> {
        Ok(LocalVault::from_private_key(self.chain_id, &self.faucet_key)?)
    }
}
