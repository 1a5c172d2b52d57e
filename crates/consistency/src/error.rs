//! Harness errors and run outcome

use l2_devnet::{ClientError, VaultError, B256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failures before the concurrent phase starts
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("node {from} failed to connect to node {to} at {addr}: {source}")]
    PeerConnect {
        from: usize,
        to: usize,
        addr: String,
        #[source]
        source: ClientError,
    },

    #[error("node {node} did not come up within {timeout:?}")]
    BootTimeout { node: usize, timeout: Duration },

    #[error("replicas did not converge on the sequencer within {timeout:?}")]
    ConvergenceTimeout { timeout: Duration },

    #[error("expected {expected} replicas, node set has {actual}")]
    Topology { expected: usize, actual: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// A replica disagreeing with the sequencer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DivergenceError {
    #[error("replica {replica}: too far behind sequencer. seq head: {sequencer_head}, replica head: {replica_head} (max lag {max_lag})")]
    ExcessiveLag {
        replica: usize,
        sequencer_head: u64,
        replica_head: u64,
        max_lag: u64,
    },

    #[error("replica {replica}: sequencer does not have block at height {height}")]
    MissingHeight { replica: usize, height: u64 },

    #[error("replica {replica}: sequencer diverged, height {height} does not match: sequencer: {sequencer} <> replica: {replica_hash}")]
    HashMismatch {
        replica: usize,
        height: u64,
        sequencer: B256,
        replica_hash: B256,
    },
}

impl DivergenceError {
    pub fn replica(&self) -> usize {
        match self {
            Self::ExcessiveLag { replica, .. }
            | Self::MissingHeight { replica, .. }
            | Self::HashMismatch { replica, .. } => *replica,
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("node {node}: {source}")]
    Transport {
        node: usize,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Divergence(#[from] DivergenceError),

    #[error("vault: {0}")]
    Vault(#[from] VaultError),

    #[error("transaction {hash} failed")]
    TransactionFailed { hash: B256 },

    #[error("transaction {hash} did not propagate to the sequencer")]
    NotForwarded { hash: B256 },

    #[error("{task} task stopped unexpectedly")]
    TaskAborted { task: &'static str },

    /// The run was cancelled while a call was in flight; never a run failure
    #[error("cancelled")]
    Cancelled,
}

impl HarnessError {
    /// Index of the node the failure is attributed to, if any
    pub fn node(&self) -> Option<usize> {
        match self {
            Self::Setup(SetupError::PeerConnect { from, .. }) => Some(*from),
            Self::Setup(SetupError::BootTimeout { node, .. }) => Some(*node),
            Self::Transport { node, .. } => Some(*node),
            Self::Divergence(e) => Some(e.replica()),
            _ => None,
        }
    }
}

/// Terminal outcome of a run
#[derive(Debug)]
pub enum RunResult {
    /// The steady-state window elapsed with no violation
    Success,
    /// The first error reported; later ones are discarded
    Failure {
        node: Option<usize>,
        cause: HarnessError,
    },
}

impl RunResult {
    pub fn failure(cause: HarnessError) -> Self {
        Self::Failure {
            node: cause.node(),
            cause,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn cause(&self) -> Option<&HarnessError> {
        match self {
            Self::Success => None,
            Self::Failure { cause, .. } => Some(cause),
        }
    }

    pub fn into_result(self) -> Result<(), HarnessError> {
        match self {
            Self::Success => Ok(()),
            Self::Failure { cause, .. } => Err(cause),
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "passed"),
            Self::Failure { node: Some(node), cause } => {
                write!(f, "failed (node {}): {}", node, cause)
            }
            Self::Failure { node: None, cause } => write!(f, "failed: {}", cause),
        }
    }
}
