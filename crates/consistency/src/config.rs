//! Harness configuration

use crate::error::SetupError;
use l2_devnet::{Address, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for one consistency run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of replicas besides the sequencer
    pub replica_count: usize,
    /// Blocks a replica may trail the sequencer head before the run fails
    pub max_replica_lag: u64,
    /// Give up on initial sync after this long
    pub convergence_timeout_ms: u64,
    /// Poll interval while waiting for initial sync
    pub convergence_tick_ms: u64,
    /// A run with no violation for this long passes
    pub steady_state_timeout_ms: u64,
    /// Tick of the load generator and the consistency checker
    pub tick_interval_ms: u64,
    /// How long each node gets to answer its first RPC
    pub boot_timeout_ms: u64,
    /// Upper bound on any single RPC call
    pub rpc_timeout_ms: u64,
    /// How long a submitted transaction may take to be included
    pub receipt_timeout_ms: u64,
    /// Receipt poll interval
    pub receipt_poll_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            replica_count: 2,
            max_replica_lag: 5,
            convergence_timeout_ms: 60_000,
            convergence_tick_ms: 250,
            steady_state_timeout_ms: 60_000,
            tick_interval_ms: 100,
            boot_timeout_ms: 10_000,
            rpc_timeout_ms: 5_000,
            receipt_timeout_ms: 20_000,
            receipt_poll_ms: 100,
        }
    }
}

impl RunConfig {
    pub fn convergence_timeout(&self) -> Duration {
        Duration::from_millis(self.convergence_timeout_ms)
    }

    pub fn convergence_tick(&self) -> Duration {
        Duration::from_millis(self.convergence_tick_ms)
    }

    pub fn steady_state_timeout(&self) -> Duration {
        Duration::from_millis(self.steady_state_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_millis(self.boot_timeout_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    /// Reject settings the harness cannot run with
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.replica_count == 0 {
            return Err(SetupError::InvalidConfig(
                "replica_count must be at least 1".to_string(),
            ));
        }
        let intervals = [
            ("convergence_tick_ms", self.convergence_tick_ms),
            ("tick_interval_ms", self.tick_interval_ms),
            ("rpc_timeout_ms", self.rpc_timeout_ms),
            ("receipt_poll_ms", self.receipt_poll_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(SetupError::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

/// Template for the transfers the load generator submits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub gas_limit: u64,
    /// Tip per gas, in wei
    pub max_priority_fee_per_gas: u128,
    /// Fee cap per gas, in wei
    pub max_fee_per_gas: u128,
    /// Value moved by each transfer, in wei
    pub value: U256,
    /// Transfer target; the sender itself when unset
    pub recipient: Option<Address>,
    /// Balance the sender account is funded with
    pub sender_balance: U256,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            gas_limit: 75_000,
            max_priority_fee_per_gas: 1,
            max_fee_per_gas: 2,
            value: U256::from(l2_devnet::ETHER / 10_000),
            recipient: None,
            sender_balance: U256::from(l2_devnet::ETHER),
        }
    }
}

impl LoadConfig {
    /// Fees high enough to be picked up ahead of pool competition
    pub fn priority() -> Self {
        Self {
            max_priority_fee_per_gas: 10_000_000_000, // 10 gwei
            max_fee_per_gas: 20_000_000_000,          // 20 gwei
            ..Default::default()
        }
    }
}
