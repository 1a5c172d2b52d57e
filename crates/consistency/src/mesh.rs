//! Peer mesh - connect every replica to every other node

use crate::call::call;
use crate::error::{HarnessError, SetupError};
use l2_devnet::NodeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Dial every node from every replica.
///
/// The sequencer is a dial target but never dials out itself. The first
/// failed connection aborts the mesh; nothing is retried. Returns the number
/// of connections made.
pub async fn build_mesh(
    nodes: &NodeSet,
    rpc_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<usize, HarnessError> {
    let mut connected = 0;
    for replica in nodes.replicas() {
        for peer in nodes.iter() {
            if peer.index == replica.index {
                continue;
            }
            tracing::info!(
                "Peering node {} ({}) with {}",
                peer.index,
                peer.peer_addr,
                replica.index
            );
            call(cancel, rpc_timeout, replica.index, replica.p2p.connect_peer(&peer.peer_addr))
                .await
                .map_err(|e| match e {
                    HarnessError::Transport { source, .. } => SetupError::PeerConnect {
                        from: replica.index,
                        to: peer.index,
                        addr: peer.peer_addr.clone(),
                        source,
                    }
                    .into(),
                    other => other,
                })?;
            connected += 1;
        }
    }
    tracing::info!("Peer mesh built: {} connections", connected);
    Ok(connected)
}
