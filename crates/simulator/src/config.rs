//! Simulator Configuration

use anyhow::{bail, Context, Result};
use l2_consistency::{LoadConfig, RunConfig};
use l2_devnet::DevnetConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Everything one simulator invocation needs, read from a single JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Running devnet to test
    pub devnet: DevnetConfig,
    /// Run timings and the lag bound
    #[serde(default)]
    pub run: RunConfig,
    /// Transfer template for the load generator
    #[serde(default)]
    pub load: LoadConfig,
    /// Wait before looking for a forwarded transaction on the sequencer
    #[serde(default = "default_propagation_delay_ms")]
    pub propagation_delay_ms: u64,
}

fn default_propagation_delay_ms() -> u64 {
    10_000
}

impl SimulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.as_ref().display()))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data).context("invalid simulator config")?;
        if config.devnet.nodes.len() < 2 {
            bail!("devnet needs a sequencer and at least one replica");
        }
        let listed = config.devnet.nodes.len() - 1;
        if config.run.replica_count != listed {
            bail!(
                "run.replica_count is {} but the devnet lists {} replicas",
                config.run.replica_count,
                listed
            );
        }
        Ok(config)
    }

    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }
}
