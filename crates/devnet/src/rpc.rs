//! JSON-RPC clients over HTTP
//!
//! `HttpExecutionClient` speaks the `eth_` namespace of an execution engine.
//! `HttpRollupClient` speaks `optimism_` and `opp2p_` on a rollup node, which
//! serves both on the same endpoint.

use crate::client::{ClientError, ExecutionClient, PeerClient, RollupClient};
use crate::types::{BlockId, ReceiptInfo, SignedTransaction, SyncStatus, TransactionInfo};
use alloy_primitives::{Address, B256, U64};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::Deserialize;
use std::time::Duration;

fn build_client(url: &str, request_timeout: Duration) -> Result<HttpClient, ClientError> {
    HttpClientBuilder::default()
        .request_timeout(request_timeout)
        .build(url)
        .map_err(|e| ClientError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// `latest` for `None`, otherwise a hex quantity
fn block_tag(number: Option<u64>) -> String {
    match number {
        Some(n) => format!("{:#x}", n),
        None => "latest".to_string(),
    }
}

// ============ Wire Types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcHeader {
    pub number: U64,
    pub hash: B256,
}

impl From<RpcHeader> for BlockId {
    fn from(header: RpcHeader) -> Self {
        BlockId::new(header.number.to::<u64>(), header.hash)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcTransaction {
    pub hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RpcReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub block_hash: Option<B256>,
}

impl From<RpcReceipt> for ReceiptInfo {
    fn from(receipt: RpcReceipt) -> Self {
        let block = match (receipt.block_number, receipt.block_hash) {
            (Some(number), Some(hash)) => Some(BlockId::new(number.to::<u64>(), hash)),
            _ => None,
        };
        ReceiptInfo {
            hash: receipt.transaction_hash,
            status: receipt.status.map(|s| s.to::<u64>()).unwrap_or_default(),
            block,
        }
    }
}

// ============ Execution Client ============

/// Execution engine client (`eth_` namespace)
pub struct HttpExecutionClient {
    client: HttpClient,
    url: String,
}

impl HttpExecutionClient {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(url, request_timeout)?,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn block_by_number(&self, number: Option<u64>) -> Result<Option<BlockId>, ClientError> {
        let header: Option<RpcHeader> = self
            .client
            .request("eth_getBlockByNumber", rpc_params![block_tag(number), false])
            .await?;
        Ok(header.map(BlockId::from))
    }

    async fn nonce_at(&self, address: Address) -> Result<u64, ClientError> {
        let nonce: U64 = self
            .client
            .request("eth_getTransactionCount", rpc_params![address, "latest"])
            .await?;
        Ok(nonce.to::<u64>())
    }

    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<B256, ClientError> {
        let hash: B256 = self
            .client
            .request("eth_sendRawTransaction", rpc_params![&tx.raw])
            .await?;
        if hash != tx.hash {
            return Err(ClientError::Decode(format!(
                "node returned hash {} for transaction {}",
                hash, tx.hash
            )));
        }
        Ok(hash)
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<TransactionInfo>, ClientError> {
        let tx: Option<RpcTransaction> = self
            .client
            .request("eth_getTransactionByHash", rpc_params![hash])
            .await?;
        Ok(tx.map(|tx| TransactionInfo {
            hash: tx.hash,
            is_pending: tx.block_number.is_none(),
        }))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, ClientError> {
        let receipt: Option<RpcReceipt> = self
            .client
            .request("eth_getTransactionReceipt", rpc_params![hash])
            .await?;
        Ok(receipt.map(ReceiptInfo::from))
    }
}

// ============ Rollup Client ============

/// Rollup node client (`optimism_` and `opp2p_` namespaces)
pub struct HttpRollupClient {
    client: HttpClient,
    url: String,
}

impl HttpRollupClient {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_client(url, request_timeout)?,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RollupClient for HttpRollupClient {
    async fn sync_status(&self) -> Result<SyncStatus, ClientError> {
        let status: SyncStatus = self
            .client
            .request("optimism_syncStatus", rpc_params![])
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl PeerClient for HttpRollupClient {
    async fn connect_peer(&self, addr: &str) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .client
            .request("opp2p_connectPeer", rpc_params![addr])
            .await?;
        tracing::debug!("{} connected to peer {}", self.url, addr);
        Ok(())
    }
}
