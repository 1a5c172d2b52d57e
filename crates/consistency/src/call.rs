//! Bounded RPC calls

use crate::error::HarnessError;
use l2_devnet::ClientError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run an RPC against `node`, bounded by `limit` and by `cancel`.
///
/// Cancellation wins over a ready result so a cancelled run never acts on
/// a late response.
pub(crate) async fn call<T, F>(
    cancel: &CancellationToken,
    limit: Duration,
    node: usize,
    fut: F,
) -> Result<T, HarnessError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HarnessError::Cancelled),
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(HarnessError::Transport { node, source }),
            Err(_) => Err(HarnessError::Transport {
                node,
                source: ClientError::Timeout(limit),
            }),
        },
    }
}
