//! Load generator - keeps the sequencer producing blocks with real transactions

use crate::aggregator::ErrorReporter;
use crate::call::call;
use crate::config::LoadConfig;
use crate::error::HarnessError;
use l2_devnet::{wait_receipt, Address, Bytes, NodeSet, TxEip1559, TxKind, Vault, B256};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Submits one confirmed transfer per tick from a funded sender
pub struct LoadGenerator {
    nodes: Arc<NodeSet>,
    vault: Arc<dyn Vault>,
    sender: Address,
    template: LoadConfig,
    tick: Duration,
    rpc_timeout: Duration,
    receipt_poll: Duration,
    receipt_timeout: Duration,
}

impl LoadGenerator {
    pub fn new(nodes: Arc<NodeSet>, vault: Arc<dyn Vault>, sender: Address, template: LoadConfig) -> Self {
        Self {
            nodes,
            vault,
            sender,
            template,
            tick: Duration::from_millis(100),
            rpc_timeout: Duration::from_secs(5),
            receipt_poll: Duration::from_millis(100),
            receipt_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn with_receipt_wait(mut self, poll: Duration, timeout: Duration) -> Self {
        self.receipt_poll = poll;
        self.receipt_timeout = timeout;
        self
    }

    /// Submit on every tick until cancelled or a submission fails
    pub async fn run(self, cancel: CancellationToken, reporter: ErrorReporter) {
        let mut tick = tokio::time::interval(self.tick);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut confirmed = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {}
            }
            match self.submit_once(&cancel).await {
                Ok(hash) => {
                    confirmed += 1;
                    tracing::trace!("Confirmed load transaction {}", hash);
                }
                Err(e) => {
                    reporter.report("load", e);
                    return;
                }
            }
        }
        tracing::debug!("Load generator stopped after {} transactions", confirmed);
    }

    /// Build, sign, submit and confirm one transfer
    pub async fn submit_once(&self, cancel: &CancellationToken) -> Result<B256, HarnessError> {
        let sequencer = self.nodes.sequencer();
        let nonce = call(cancel, self.rpc_timeout, sequencer.index, sequencer.execution.nonce_at(self.sender)).await?;

        let tx = build_transfer(&self.template, self.sender, nonce);
        let signed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HarnessError::Cancelled),
            signed = self.vault.sign_transaction(self.sender, tx) => signed?,
        };

        call(cancel, self.rpc_timeout, sequencer.index, sequencer.execution.send_raw_transaction(&signed)).await?;

        let receipt = call(
            cancel,
            self.receipt_timeout,
            sequencer.index,
            wait_receipt(sequencer.execution.as_ref(), signed.hash, self.receipt_poll, self.receipt_timeout),
        )
        .await?;
        if !receipt.succeeded() {
            return Err(HarnessError::TransactionFailed { hash: signed.hash });
        }
        Ok(signed.hash)
    }
}

/// Transfer from `sender` following `template`. The chain ID is set by the vault.
pub fn build_transfer(template: &LoadConfig, sender: Address, nonce: u64) -> TxEip1559 {
    TxEip1559 {
        chain_id: 0,
        nonce,
        gas_limit: template.gas_limit,
        max_fee_per_gas: template.max_fee_per_gas,
        max_priority_fee_per_gas: template.max_priority_fee_per_gas,
        to: TxKind::Call(template.recipient.unwrap_or(sender)),
        value: template.value,
        access_list: Default::default(),
        input: Bytes::default(),
    }
}
