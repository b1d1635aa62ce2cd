//! End-to-end submission scenarios driven through the public API with a
//! scripted mock chain client: admission, matching, signing, retry, and
//! the failed-queue/retry-all recovery path.

use std::sync::Arc;

use sequencer_core::coordinator::Coordinator;
use sequencer_core::signer::ThresholdSigner;
use sequencer_core::submission::{BackoffConfig, FailedQueue, MockChainClient, MockOutcome, SubmissionPipeline};
use sequencer_core::Order;

fn order(maker: &str, make_amount: f64, take_amount: f64, price: f64, ts: u64) -> Order {
    Order::new(maker, "USDC", make_amount, take_amount, price, ts, "sig").unwrap()
}

fn build(script: Vec<MockOutcome>, max_retries: usize) -> (Coordinator, Arc<FailedQueue>) {
    let failed_queue = Arc::new(FailedQueue::new());
    let chain = Arc::new(MockChainClient::new(script));
    let pipeline = Arc::new(SubmissionPipeline::new(
        chain,
        BackoffConfig {
            backoff_ms: 1,
            max_retries,
        },
        failed_queue.clone(),
    ));
    let coordinator = Coordinator::new(ThresholdSigner::from_hex_keys(&[]), pipeline, 50);
    (coordinator, failed_queue)
}

#[tokio::test]
async fn reject_three_times_then_accept_within_retry_budget() {
    let (coordinator, failed_queue) = build(
        vec![
            MockOutcome::TransientFailure,
            MockOutcome::TransientFailure,
            MockOutcome::TransientFailure,
            MockOutcome::Success,
        ],
        5,
    );

    coordinator.admit_and_drain(order("bid", 1000.0, 600.0, 0.60, 1)).await.unwrap();
    let outcome = coordinator.admit_and_drain(order("ask", 300.0, 150.0, 0.50, 2)).await.unwrap();

    assert!(outcome.submitted_tx_id.is_some());
    assert_eq!(failed_queue.count(), 0);
}

#[tokio::test]
async fn exhausting_retries_moves_batch_to_failed_queue() {
    let (coordinator, failed_queue) = build(vec![MockOutcome::TransientFailure; 5], 5);

    coordinator.admit_and_drain(order("bid", 1000.0, 600.0, 0.60, 1)).await.unwrap();
    let outcome = coordinator.admit_and_drain(order("ask", 300.0, 150.0, 0.50, 2)).await.unwrap();

    assert!(outcome.submitted_tx_id.is_none());
    assert_eq!(failed_queue.count(), 1);
}

#[tokio::test]
async fn retry_all_drains_the_failed_queue_once_the_chain_recovers() {
    let (coordinator, failed_queue) = build(vec![MockOutcome::TransientFailure; 5], 5);
    coordinator.admit_and_drain(order("bid", 1000.0, 600.0, 0.60, 1)).await.unwrap();
    coordinator.admit_and_drain(order("ask", 300.0, 150.0, 0.50, 2)).await.unwrap();
    assert_eq!(failed_queue.count(), 1);

    let recovered_chain = Arc::new(MockChainClient::always_succeeds());
    let recovery_pipeline = SubmissionPipeline::new(
        recovered_chain,
        BackoffConfig {
            backoff_ms: 1,
            max_retries: 3,
        },
        failed_queue.clone(),
    );
    let report = recovery_pipeline.retry_failed_batches().await;

    assert_eq!(report.successes, 1);
    assert_eq!(report.failures, 0);
    assert_eq!(failed_queue.count(), 0);
}

#[tokio::test]
async fn reverted_transaction_is_retried_and_still_counts_toward_the_cap() {
    let (coordinator, failed_queue) = build(vec![MockOutcome::Reverted; 3], 3);

    coordinator.admit_and_drain(order("bid", 1000.0, 600.0, 0.60, 1)).await.unwrap();
    let outcome = coordinator.admit_and_drain(order("ask", 300.0, 150.0, 0.50, 2)).await.unwrap();

    assert!(outcome.submitted_tx_id.is_none());
    assert_eq!(failed_queue.count(), 1);
}

#[tokio::test]
async fn non_crossing_orders_never_touch_the_chain() {
    let (coordinator, failed_queue) = build(vec![MockOutcome::Reverted; 10], 5);

    let outcome = coordinator.admit_and_drain(order("lonely", 100.0, 50.0, 1.0, 1)).await.unwrap();

    assert_eq!(outcome.fills_produced, 0);
    assert!(outcome.submitted_tx_id.is_none());
    assert_eq!(failed_queue.count(), 0);
}
