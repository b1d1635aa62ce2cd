//! The ingress coordinator: the single synchronous admission boundary
//! plus the async handoff into matching, signing, and on-chain
//! submission.
//!
//! Order admission and book mutation happen under a short-lived
//! [`parking_lot::Mutex`] critical section so the HTTP server can accept
//! concurrent requests without serializing on chain I/O. Everything past
//! the matcher snapshot (signing, submission) runs without the book lock
//! held.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info};

use crate::book::Book;
use crate::errors::AdmissionError;
use crate::matcher::match_and_batch;
use crate::metrics::Metrics;
use crate::order::Order;
use crate::signer::ThresholdSigner;
use crate::submission::{PreparedBatch, SubmissionPipeline};

/// Owns the live book and wires admission to matching, signing, and
/// submission.
pub struct Coordinator {
    book: Mutex<Book>,
    signer: ThresholdSigner,
    pipeline: Arc<SubmissionPipeline>,
    max_batch: usize,
    metrics: Option<Arc<Metrics>>,
}

/// Outcome of one `admit_and_drain` call, reported back to the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct DrainOutcome {
    pub fills_produced: usize,
    pub submitted_tx_id: Option<String>,
}

impl Coordinator {
    pub fn new(signer: ThresholdSigner, pipeline: Arc<SubmissionPipeline>, max_batch: usize) -> Self {
        Self {
            book: Mutex::new(Book::new()),
            signer,
            pipeline,
            max_batch,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn book_len(&self) -> usize {
        self.book.lock().len()
    }

    /// Admit an order and, in the same critical section, invoke the
    /// matcher on the resulting book: acquire the book mutex, append the
    /// order, run the matcher over the owned book, overwrite the book
    /// with the matcher's `remaining` output, release the mutex. Signing
    /// and submission run afterward, entirely outside the lock.
    pub async fn admit_and_drain(&self, order: Order) -> Result<DrainOutcome, AdmissionError> {
        let outcome = {
            let mut book = self.book.lock();
            if let Err(err) = book.admit(order) {
                if let Some(metrics) = &self.metrics {
                    metrics.orders_rejected.inc();
                }
                return Err(err);
            }
            if let Some(metrics) = &self.metrics {
                metrics.orders_admitted.inc();
            }
            let snapshot = book.snapshot();
            let outcome = match_and_batch(snapshot, self.max_batch);
            book.replace(outcome.remaining.clone());
            outcome
        };

        let (root, fills_bytes) = match (outcome.root, outcome.fills_bytes) {
            (Some(root), Some(fills_bytes)) => (root, fills_bytes),
            _ => return Ok(DrainOutcome::default()),
        };

        if let Some(metrics) = &self.metrics {
            metrics.fills_produced.inc_by(outcome.fills.len() as u64);
        }
        info!(fills = outcome.fills.len(), "batch matched, signing for submission");

        let agg_sig = match self.signer.aggregate(&root) {
            Ok(sig) => sig,
            Err(err) => {
                error!(?err, "failed to produce aggregate signature, dropping batch");
                return Ok(DrainOutcome {
                    fills_produced: outcome.fills.len(),
                    submitted_tx_id: None,
                });
            }
        };

        let batch = PreparedBatch {
            root,
            fills_bytes,
            agg_sig,
        };

        let tx_id = self.pipeline.submit(batch).await.ok();
        if let Some(metrics) = &self.metrics {
            if tx_id.is_some() {
                metrics.batches_submitted.inc();
            } else {
                metrics.batches_failed.inc();
            }
        }

        Ok(DrainOutcome {
            fills_produced: outcome.fills.len(),
            submitted_tx_id: tx_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{BackoffConfig, FailedQueue, MockChainClient, MockOutcome};

    fn coordinator(script: Vec<MockOutcome>, max_batch: usize) -> Coordinator {
        let chain = Arc::new(MockChainClient::new(script));
        let pipeline = Arc::new(SubmissionPipeline::new(
            chain,
            BackoffConfig {
                backoff_ms: 1,
                max_retries: 3,
            },
            Arc::new(FailedQueue::new()),
        ));
        Coordinator::new(ThresholdSigner::from_hex_keys(&[]), pipeline, max_batch)
    }

    fn order(maker: &str, make_amount: f64, take_amount: f64, price: f64, ts: u64) -> Order {
        Order::new(maker, "USDC", make_amount, take_amount, price, ts, "sig").unwrap()
    }

    #[tokio::test]
    async fn single_order_is_admitted_without_matching() {
        let coordinator = coordinator(vec![MockOutcome::Success], 10);
        let outcome = coordinator.admit_and_drain(order("a", 1.0, 1.0, 1.0, 1)).await.unwrap();
        assert_eq!(outcome.fills_produced, 0);
        assert_eq!(coordinator.book_len(), 1);
    }

    #[tokio::test]
    async fn crossing_orders_are_matched_signed_and_submitted() {
        let coordinator = coordinator(vec![MockOutcome::Success], 10);
        coordinator
            .admit_and_drain(order("bid", 1000.0, 600.0, 0.60, 1))
            .await
            .unwrap();
        let outcome = coordinator
            .admit_and_drain(order("ask", 300.0, 150.0, 0.50, 2))
            .await
            .unwrap();
        assert!(outcome.fills_produced > 0);
        assert!(outcome.submitted_tx_id.is_some());
    }

    #[tokio::test]
    async fn admit_rejects_invalid_orders_without_mutating_book() {
        let coordinator = coordinator(vec![], 10);
        let bad = Order {
            maker: "a".into(),
            taker_asset: "USDC".into(),
            make_amount: -1.0,
            take_amount: 1.0,
            price: 1.0,
            timestamp: 1,
            signature: "s".into(),
        };
        assert!(coordinator.admit_and_drain(bad).await.is_err());
        assert_eq!(coordinator.book_len(), 0);
    }

    #[tokio::test]
    async fn submission_exhaustion_still_removes_fills_from_book() {
        let coordinator = coordinator(vec![MockOutcome::TransientFailure; 3], 10);
        coordinator
            .admit_and_drain(order("bid", 1000.0, 600.0, 0.60, 1))
            .await
            .unwrap();
        let outcome = coordinator
            .admit_and_drain(order("ask", 300.0, 150.0, 0.50, 2))
            .await
            .unwrap();
        assert!(outcome.fills_produced > 0);
        assert!(outcome.submitted_tx_id.is_none());
    }

    #[tokio::test]
    async fn metrics_track_admission_and_submission() {
        let chain = Arc::new(MockChainClient::new(vec![MockOutcome::Success]));
        let pipeline = Arc::new(SubmissionPipeline::new(
            chain,
            BackoffConfig {
                backoff_ms: 1,
                max_retries: 3,
            },
            Arc::new(FailedQueue::new()),
        ));
        let metrics = crate::metrics::Metrics::new().unwrap();
        let coordinator =
            Coordinator::new(ThresholdSigner::from_hex_keys(&[]), pipeline, 10).with_metrics(metrics.clone());

        coordinator
            .admit_and_drain(order("bid", 1000.0, 600.0, 0.60, 1))
            .await
            .unwrap();
        coordinator
            .admit_and_drain(order("ask", 300.0, 150.0, 0.50, 2))
            .await
            .unwrap();

        assert_eq!(metrics.orders_admitted.get(), 2);
        assert!(metrics.fills_produced.get() > 0);
        assert_eq!(metrics.batches_submitted.get(), 1);
    }
}
