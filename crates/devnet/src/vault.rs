//! Account vault - creates funded accounts and signs transactions for them

use crate::client::{ClientError, ExecutionClient};
use crate::receipt::wait_receipt;
use crate::types::SignedTransaction;
use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_network::eip2718::Encodable2718;
use alloy_network::TxSigner;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// Gas for a plain value transfer to an account without code
const TRANSFER_GAS: u64 = 21_000;

/// Holds account keys on behalf of the harness
#[async_trait]
pub trait Vault: Send + Sync {
    /// Create a new account holding `balance`, funded through `client`
    async fn create_account(
        &self,
        client: &dyn ExecutionClient,
        balance: U256,
    ) -> Result<Address, VaultError>;

    /// Sign `tx` with the key of `from`
    async fn sign_transaction(
        &self,
        from: Address,
        tx: TxEip1559,
    ) -> Result<SignedTransaction, VaultError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("no key for account {0}")]
    UnknownAccount(Address),
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("funding transfer failed: {0}")]
    Funding(#[from] ClientError),
    #[error("funding transfer {0} reverted")]
    FundingReverted(B256),
}

/// In-memory vault backed by local private keys.
///
/// New accounts are funded by a transfer from the faucet key, which must
/// hold a balance in the chain's genesis.
pub struct LocalVault {
    chain_id: u64,
    faucet: PrivateKeySigner,
    keys: RwLock<HashMap<Address, PrivateKeySigner>>,
    /// Serializes faucet transfers so their nonces never collide
    funding: tokio::sync::Mutex<()>,
    receipt_poll: Duration,
    receipt_timeout: Duration,
}

impl LocalVault {
    pub fn new(chain_id: u64, faucet: PrivateKeySigner) -> Self {
        let mut keys = HashMap::new();
        keys.insert(faucet.address(), faucet.clone());
        Self {
            chain_id,
            faucet,
            keys: RwLock::new(keys),
            funding: tokio::sync::Mutex::new(()),
            receipt_poll: Duration::from_millis(100),
            receipt_timeout: Duration::from_secs(20),
        }
    }

    /// Create from a hex-encoded faucet key
    pub fn from_private_key(chain_id: u64, key: &str) -> Result<Self, VaultError> {
        let faucet = key
            .parse::<PrivateKeySigner>()
            .map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        Ok(Self::new(chain_id, faucet))
    }

    /// Set how funding receipts are awaited
    pub fn with_receipt_wait(mut self, poll: Duration, timeout: Duration) -> Self {
        self.receipt_poll = poll;
        self.receipt_timeout = timeout;
        self
    }

    /// Add an already funded key
    pub fn import_key(&self, signer: PrivateKeySigner) -> Address {
        let address = signer.address();
        self.keys.write().insert(address, signer);
        address
    }

    pub fn faucet_address(&self) -> Address {
        self.faucet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.keys.read().contains_key(address)
    }

    async fn sign_with(
        &self,
        signer: &PrivateKeySigner,
        mut tx: TxEip1559,
    ) -> Result<SignedTransaction, VaultError> {
        tx.chain_id = self.chain_id;
        let signature = signer
            .sign_transaction(&mut tx)
            .await
            .map_err(|e| VaultError::Signing(e.to_string()))?;
        let envelope: TxEnvelope = tx.into_signed(signature).into();
        Ok(SignedTransaction {
            hash: *envelope.tx_hash(),
            raw: Bytes::from(envelope.encoded_2718()),
        })
    }
}

#[async_trait]
impl Vault for LocalVault {
    async fn create_account(
        &self,
        client: &dyn ExecutionClient,
        balance: U256,
    ) -> Result<Address, VaultError> {
        let account = PrivateKeySigner::random();
        let address = account.address();

        let _guard = self.funding.lock().await;
        let nonce = client.nonce_at(self.faucet.address()).await?;
        let tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit: TRANSFER_GAS,
            max_priority_fee_per_gas: 1_000_000_000, // 1 gwei
            max_fee_per_gas: 20_000_000_000,         // 20 gwei
            to: TxKind::Call(address),
            value: balance,
            input: Bytes::default(),
            access_list: Default::default(),
        };
        let signed = self.sign_with(&self.faucet, tx).await?;
        client.send_raw_transaction(&signed).await?;

        let receipt = wait_receipt(client, signed.hash, self.receipt_poll, self.receipt_timeout).await?;
        if !receipt.succeeded() {
            return Err(VaultError::FundingReverted(signed.hash));
        }

        self.keys.write().insert(address, account);
        tracing::info!("Created account {} with balance {}", address, balance);
        Ok(address)
    }

    async fn sign_transaction(
        &self,
        from: Address,
        tx: TxEip1559,
    ) -> Result<SignedTransaction, VaultError> {
        let signer = self
            .keys
            .read()
            .get(&from)
            .cloned()
            .ok_or(VaultError::UnknownAccount(from))?;
        self.sign_with(&signer, tx).await
    }
}
