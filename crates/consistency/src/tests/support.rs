//! In-memory devnet: one shared chain, a sequencer that includes every
//! transaction in its own block, and replicas whose sync status follows
//! the chain at a configurable distance.

use crate::config::RunConfig;
use alloy_primitives::keccak256;
use async_trait::async_trait;
use l2_devnet::{
    Address, BlockId, ClientError, ExecutionClient, LocalVault, NodeHandle, NodeSet, PeerClient,
    ReceiptInfo, RollupClient, SignedTransaction, SyncStatus, TransactionInfo, Vault, B256,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// First account of the default development mnemonic
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CHAIN_ID: u64 = 901;

/// Canonical hash of the block at `height`
pub fn block_hash(height: u64) -> B256 {
    keccak256(height.to_be_bytes())
}

pub fn peer_addr(index: usize) -> String {
    format!("/ip4/127.0.0.1/tcp/{}/p2p/node-{}", 9222 + index, index)
}

/// Short timings so whole runs finish in well under a second
pub fn fast_config(replicas: usize) -> RunConfig {
    RunConfig {
        replica_count: replicas,
        max_replica_lag: 5,
        convergence_timeout_ms: 1_000,
        convergence_tick_ms: 5,
        steady_state_timeout_ms: 300,
        tick_interval_ms: 10,
        boot_timeout_ms: 500,
        rpc_timeout_ms: 500,
        receipt_timeout_ms: 1_000,
        receipt_poll_ms: 5,
    }
}

pub fn vault() -> Arc<LocalVault> {
    Arc::new(
        LocalVault::from_private_key(CHAIN_ID, DEV_KEY)
            .unwrap()
            .with_receipt_wait(Duration::from_millis(5), Duration::from_secs(1)),
    )
}

/// Canonical chain as the sequencer produces it
pub struct MockChain {
    blocks: RwLock<Vec<B256>>,
}

impl MockChain {
    /// Chain with blocks `0..=height`
    pub fn new(height: u64) -> Self {
        Self {
            blocks: RwLock::new((0..=height).map(block_hash).collect()),
        }
    }

    pub fn produce(&self) -> BlockId {
        let mut blocks = self.blocks.write();
        let number = blocks.len() as u64;
        let hash = block_hash(number);
        blocks.push(hash);
        BlockId::new(number, hash)
    }

    pub fn head(&self) -> BlockId {
        let blocks = self.blocks.read();
        let number = blocks.len() as u64 - 1;
        BlockId::new(number, blocks[number as usize])
    }

    pub fn hash_at(&self, height: u64) -> Option<B256> {
        self.blocks.read().get(height as usize).copied()
    }
}

/// Execution engine over the shared chain
pub struct MockExecution {
    chain: Arc<MockChain>,
    /// Sequencer engines put every submitted transaction in a new block
    includes: bool,
    forward_to: RwLock<Option<Arc<MockExecution>>>,
    receipts: RwLock<HashMap<B256, ReceiptInfo>>,
    pool: RwLock<HashMap<B256, TransactionInfo>>,
    /// Every call fails while set
    pub down: AtomicBool,
    /// Included transactions revert while set
    pub revert: AtomicBool,
    /// Delay applied once to the next head or nonce lookup
    stall_ms: AtomicU64,
    calls: AtomicUsize,
    sent: AtomicUsize,
}

impl MockExecution {
    pub fn sequencer(chain: Arc<MockChain>) -> Self {
        Self::build(chain, true, None)
    }

    pub fn replica(chain: Arc<MockChain>, forward_to: Arc<MockExecution>) -> Self {
        Self::build(chain, false, Some(forward_to))
    }

    fn build(chain: Arc<MockChain>, includes: bool, forward_to: Option<Arc<MockExecution>>) -> Self {
        Self {
            chain,
            includes,
            forward_to: RwLock::new(forward_to),
            receipts: RwLock::new(HashMap::new()),
            pool: RwLock::new(HashMap::new()),
            down: AtomicBool::new(false),
            revert: AtomicBool::new(false),
            stall_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
            sent: AtomicUsize::new(0),
        }
    }

    pub fn stop_forwarding(&self) {
        *self.forward_to.write() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stall_next(&self, delay: Duration) {
        self.stall_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn stall(&self) {
        let ms = self.stall_ms.swap(0, Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Transactions submitted directly to this engine
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionClient for MockExecution {
    async fn block_by_number(&self, number: Option<u64>) -> Result<Option<BlockId>, ClientError> {
        self.enter()?;
        if number.is_none() {
            self.stall().await;
        }
        Ok(match number {
            None => Some(self.chain.head()),
            Some(n) => self.chain.hash_at(n).map(|hash| BlockId::new(n, hash)),
        })
    }

    async fn nonce_at(&self, _address: Address) -> Result<u64, ClientError> {
        self.enter()?;
        self.stall().await;
        Ok(0)
    }

    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<B256, ClientError> {
        self.enter()?;
        self.sent.fetch_add(1, Ordering::SeqCst);

        if self.includes {
            let block = self.chain.produce();
            let status = if self.revert.load(Ordering::SeqCst) { 0 } else { 1 };
            self.receipts.write().insert(
                tx.hash,
                ReceiptInfo {
                    hash: tx.hash,
                    status,
                    block: Some(block),
                },
            );
            self.pool.write().insert(
                tx.hash,
                TransactionInfo {
                    hash: tx.hash,
                    is_pending: false,
                },
            );
            return Ok(tx.hash);
        }

        self.pool.write().insert(
            tx.hash,
            TransactionInfo {
                hash: tx.hash,
                is_pending: true,
            },
        );
        let forward_to = self.forward_to.read().clone();
        if let Some(target) = forward_to {
            target.send_raw_transaction(tx).await?;
        }
        Ok(tx.hash)
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<TransactionInfo>, ClientError> {
        self.enter()?;
        Ok(self.pool.read().get(&hash).copied())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, ClientError> {
        self.enter()?;
        Ok(self.receipts.read().get(&hash).copied())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RollupMode {
    /// Unsafe head `lag` blocks behind the chain head
    Follow { lag: u64 },
    /// Like `Follow`, but reporting a hash the sequencer never produced
    Forked { lag: u64 },
    Fixed { unsafe_l2: BlockId, safe_l2: BlockId },
}

/// Distance between unsafe and safe heads in `Follow` mode
const SAFE_DISTANCE: u64 = 10;

/// Rollup node reporting sync status over the shared chain
pub struct MockRollup {
    chain: Arc<MockChain>,
    mode: RwLock<RollupMode>,
    calls: AtomicUsize,
}

impl MockRollup {
    pub fn new(chain: Arc<MockChain>, mode: RollupMode) -> Self {
        Self {
            chain,
            mode: RwLock::new(mode),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_mode(&self, mode: RollupMode) {
        *self.mode.write() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn canonical(&self, number: u64) -> BlockId {
        BlockId::new(number, self.chain.hash_at(number).unwrap_or_default())
    }
}

#[async_trait]
impl RollupClient for MockRollup {
    async fn sync_status(&self) -> Result<SyncStatus, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let head = self.chain.head().number;
        let (unsafe_l2, safe_l2) = match *self.mode.read() {
            RollupMode::Follow { lag } => {
                let number = head.saturating_sub(lag);
                (self.canonical(number), self.canonical(number.saturating_sub(SAFE_DISTANCE)))
            }
            RollupMode::Forked { lag } => {
                let number = head.saturating_sub(lag);
                (
                    BlockId::new(number, B256::repeat_byte(0xee)),
                    self.canonical(number.saturating_sub(SAFE_DISTANCE)),
                )
            }
            RollupMode::Fixed { unsafe_l2, safe_l2 } => (unsafe_l2, safe_l2),
        };
        Ok(SyncStatus {
            unsafe_l2,
            safe_l2,
            finalized_l2: safe_l2,
            ..Default::default()
        })
    }
}

/// P2p admin API recording every dial
#[derive(Default)]
pub struct MockPeer {
    connects: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl MockPeer {
    pub fn fail_on(&self, addr: String) {
        *self.fail_on.lock() = Some(addr);
    }

    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().clone()
    }
}

#[async_trait]
impl PeerClient for MockPeer {
    async fn connect_peer(&self, addr: &str) -> Result<(), ClientError> {
        if self.fail_on.lock().as_deref() == Some(addr) {
            return Err(ClientError::Unavailable(format!("dial {} refused", addr)));
        }
        self.connects.lock().push(addr.to_string());
        Ok(())
    }
}

/// A sequencer plus replicas, all backed by one chain
pub struct Devnet {
    pub chain: Arc<MockChain>,
    pub execution: Vec<Arc<MockExecution>>,
    pub rollup: Vec<Arc<MockRollup>>,
    pub peers: Vec<Arc<MockPeer>>,
}

impl Devnet {
    /// Replicas follow one block behind and forward to the sequencer
    pub fn new(replicas: usize, height: u64) -> Self {
        let chain = Arc::new(MockChain::new(height));
        let sequencer = Arc::new(MockExecution::sequencer(chain.clone()));

        let mut execution = vec![sequencer.clone()];
        let mut rollup = vec![Arc::new(MockRollup::new(chain.clone(), RollupMode::Follow { lag: 0 }))];
        for _ in 0..replicas {
            execution.push(Arc::new(MockExecution::replica(chain.clone(), sequencer.clone())));
            rollup.push(Arc::new(MockRollup::new(chain.clone(), RollupMode::Follow { lag: 1 })));
        }
        let peers = (0..=replicas).map(|_| Arc::new(MockPeer::default())).collect();

        Self {
            chain,
            execution,
            rollup,
            peers,
        }
    }

    pub fn sequencer(&self) -> &Arc<MockExecution> {
        &self.execution[0]
    }

    pub fn nodes(&self) -> Arc<NodeSet> {
        let handles = (0..self.execution.len())
            .map(|index| NodeHandle {
                index,
                execution: self.execution[index].clone(),
                rollup: self.rollup[index].clone(),
                p2p: self.peers[index].clone(),
                peer_addr: peer_addr(index),
            })
            .collect();
        Arc::new(NodeSet::new(handles).unwrap())
    }
}

/// Vault as the harness sees it
pub fn dyn_vault(vault: &Arc<LocalVault>) -> Arc<dyn Vault> {
    vault.clone()
}
