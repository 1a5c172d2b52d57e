use super::support::{dyn_vault, fast_config, vault, Devnet};
use crate::error::{HarnessError, RunResult};
use crate::forwarding::ForwardingScenario;
use std::time::Duration;

fn scenario(devnet: &Devnet) -> ForwardingScenario {
    ForwardingScenario::new(devnet.nodes(), dyn_vault(&vault()), fast_config(1))
        .with_propagation_delay(Duration::from_millis(10))
}

#[tokio::test]
async fn test_replica_forwards_to_sequencer() {
    let devnet = Devnet::new(1, 20);

    let result = scenario(&devnet).run().await;

    assert!(result.is_success(), "forwarding failed: {}", result);
    // Funding transfer, then the forwarded one
    assert_eq!(devnet.sequencer().sent(), 2);
    assert_eq!(devnet.execution[1].sent(), 1);
}

#[tokio::test]
async fn test_missing_forward_is_reported() {
    let devnet = Devnet::new(1, 20);
    devnet.execution[1].stop_forwarding();

    let result = scenario(&devnet).run().await;

    assert!(matches!(
        result,
        RunResult::Failure {
            node: None,
            cause: HarnessError::NotForwarded { .. }
        }
    ));
    assert_eq!(devnet.sequencer().sent(), 1);
}

#[tokio::test]
async fn test_needs_a_replica() {
    let devnet = Devnet::new(0, 20);

    let result = scenario(&devnet).run().await;
    assert!(!result.is_success());
    assert_eq!(devnet.sequencer().calls(), 0);
}

#[tokio::test]
async fn test_cancel_cuts_propagation_wait() {
    let devnet = Devnet::new(1, 20);
    let scenario = scenario(&devnet).with_propagation_delay(Duration::from_secs(30));
    let cancel = tokio_util::sync::CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = scenario.run_until(&cancel).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(result.cause(), Some(HarnessError::Cancelled)));
}
