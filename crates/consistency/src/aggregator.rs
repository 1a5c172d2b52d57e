//! Error aggregator - first error or the steady-state timer decides the run

use crate::error::{HarnessError, RunResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Reporting side handed to each concurrent task
#[derive(Clone)]
pub struct ErrorReporter {
    tx: mpsc::Sender<HarnessError>,
    cancel: CancellationToken,
}

impl ErrorReporter {
    /// Report a terminal task error. Never blocks.
    ///
    /// Dropped when the run is already decided, or when it is `Cancelled`.
    pub fn report(&self, task: &str, err: HarnessError) {
        if matches!(err, HarnessError::Cancelled) || self.cancel.is_cancelled() {
            tracing::debug!("{} task: discarding error after cancellation: {}", task, err);
            return;
        }
        tracing::error!("{} task failed: {}", task, err);
        if let Err(e) = self.tx.try_send(err) {
            tracing::debug!("{} task: error not recorded: {}", task, e);
        }
    }
}

/// Receiving side, owned by the run controller
pub struct ErrorAggregator {
    rx: mpsc::Receiver<HarnessError>,
    cancel: CancellationToken,
}

impl ErrorAggregator {
    /// Channel sized so that `tasks` reporters can never block
    pub fn channel(tasks: usize, cancel: CancellationToken) -> (Self, ErrorReporter) {
        let (tx, rx) = mpsc::channel(tasks.max(1));
        (
            Self {
                rx,
                cancel: cancel.clone(),
            },
            ErrorReporter { tx, cancel },
        )
    }

    /// Race `deadline` against the first reported error.
    ///
    /// Whichever comes first decides the run. The channel is closed and
    /// the token cancelled before returning, so later reports are dropped.
    pub async fn race(mut self, deadline: Duration) -> RunResult {
        let result = tokio::select! {
            _ = tokio::time::sleep(deadline) => RunResult::Success,
            Some(err) = self.rx.recv() => RunResult::failure(err),
        };
        self.rx.close();
        self.cancel.cancel();
        result
    }
}
