//! Receipt polling

use crate::client::{ClientError, ExecutionClient};
use crate::types::ReceiptInfo;
use alloy_primitives::B256;
use std::time::Duration;

/// Poll `client` every `poll` until a receipt for `hash` shows up.
///
/// Gives up with `ClientError::Timeout` after `timeout`. The receipt is
/// returned whatever its status; callers check `ReceiptInfo::succeeded`.
pub async fn wait_receipt(
    client: &dyn ExecutionClient,
    hash: B256,
    poll: Duration,
    timeout: Duration,
) -> Result<ReceiptInfo, ClientError> {
    let wait = async {
        let mut interval = tokio::time::interval(poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Some(receipt) = client.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            tracing::trace!("No receipt yet for {}", hash);
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(timeout)),
    }
}
