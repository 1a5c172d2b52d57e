//! L2 Consistency - p2p consistency harness for a rollup devnet
//!
//! Checks that replicas following the sequencer over p2p gossip stay on
//! the sequencer's canonical chain while it is under load:
//! - Peer mesh between every replica and every other node
//! - Initial convergence wait
//! - Load generator and consistency checker running concurrently
//! - First error or the steady-state timer decides the run

pub mod aggregator;
pub mod boot;
pub mod checker;
pub mod config;
pub mod controller;
pub mod convergence;
pub mod error;
pub mod forwarding;
pub mod load;
pub mod mesh;

mod call;

#[cfg(test)]
mod tests;

pub use aggregator::{ErrorAggregator, ErrorReporter};
pub use boot::BootWait;
pub use checker::{check_lag, ConsistencyChecker};
pub use config::{LoadConfig, RunConfig};
pub use controller::{HarnessBuilder, P2pHarness};
pub use convergence::{ConvergenceState, ConvergenceWaiter, CONVERGENCE_GAP};
pub use error::{DivergenceError, HarnessError, RunResult, SetupError};
pub use forwarding::ForwardingScenario;
pub use load::{build_transfer, LoadGenerator};
pub use mesh::build_mesh;
