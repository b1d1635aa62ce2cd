//! The submission pipeline: per-attempt transaction assembly, retry with
//! linear backoff, and handoff to the failed queue once retries are
//! exhausted.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::errors::{SubmitAttemptError, SubmitError};
use crate::metrics::Metrics;
use crate::submission::backoff::BackoffConfig;
use crate::submission::chain::{ChainClient, ReceiptStatus};
use crate::submission::failed_queue::{FailedBatch, FailedQueue};

/// Fallback gas price (20 Gwei) used when the chain's suggested price
/// query fails.
pub const DEFAULT_GAS_PRICE_WEI: u64 = 20_000_000_000;

/// Bounded wall-clock wait for mining confirmation per attempt.
const MINING_WAIT: Duration = Duration::from_secs(120);

/// A batch ready to hand to [`SubmissionPipeline::submit`].
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub root: [u8; 32],
    pub fills_bytes: Vec<u8>,
    pub agg_sig: Vec<u8>,
}

/// Drives one batch through gas estimation, signing, broadcast, and
/// confirmation, retrying transient failures with linear backoff and
/// falling back to the failed queue once attempts are exhausted.
pub struct SubmissionPipeline {
    chain: Arc<dyn ChainClient>,
    backoff: BackoffConfig,
    failed_queue: Arc<FailedQueue>,
    metrics: Option<Arc<Metrics>>,
}

impl SubmissionPipeline {
    pub fn new(chain: Arc<dyn ChainClient>, backoff: BackoffConfig, failed_queue: Arc<FailedQueue>) -> Self {
        Self {
            chain,
            backoff,
            failed_queue,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn failed_queue(&self) -> &Arc<FailedQueue> {
        &self.failed_queue
    }

    /// Submit a batch, retrying up to `max_retries` times. On exhaustion,
    /// enqueues the batch in the failed queue and returns
    /// [`SubmitError::Exhausted`].
    pub async fn submit(&self, batch: PreparedBatch) -> Result<String, SubmitError> {
        let mut last_err = String::new();

        for attempt in 1..=self.backoff.max_retries {
            if attempt > 1 {
                sleep(self.backoff.delay_before_attempt(attempt)).await;
                if let Some(metrics) = &self.metrics {
                    metrics.submission_retries.inc();
                }
            }

            match self.try_once(&batch).await {
                Ok(tx_id) => {
                    info!(tx_id = %tx_id, attempt, "batch submitted");
                    return Ok(tx_id);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "submission attempt failed");
                    last_err = err.to_string();
                }
            }
        }

        error!(
            attempts = self.backoff.max_retries,
            "submission exhausted all retries, moving batch to failed queue"
        );
        self.failed_queue.enqueue(FailedBatch::new(
            batch.root,
            batch.fills_bytes,
            batch.agg_sig,
            self.backoff.max_retries,
        ));
        Err(SubmitError::Exhausted {
            attempts: self.backoff.max_retries,
            last: last_err,
        })
    }

    /// Drive one attempt through the per-attempt procedure.
    async fn try_once(&self, batch: &PreparedBatch) -> Result<String, SubmitAttemptError> {
        let nonce = self
            .chain
            .pending_nonce()
            .await
            .map_err(|err| SubmitAttemptError::Transient(err.to_string()))?;

        let gas_estimate = self
            .chain
            .estimate_gas(&batch.root, &batch.fills_bytes, &batch.agg_sig)
            .await
            .map_err(|err| SubmitAttemptError::Transient(err.to_string()))?;
        // 20% safety margin, rounded up.
        let gas_limit = gas_estimate.saturating_mul(6).div_ceil(5);

        let gas_price = match self.chain.gas_price().await {
            Ok(price) => price,
            Err(err) => {
                warn!(error = %err, "gas price query failed, using default");
                DEFAULT_GAS_PRICE_WEI
            }
        };

        let chain_id = self
            .chain
            .chain_id()
            .await
            .map_err(|err| SubmitAttemptError::Transient(err.to_string()))?;

        let tx_id = self
            .chain
            .sign_and_broadcast(
                batch.root,
                batch.fills_bytes.clone(),
                batch.agg_sig.clone(),
                nonce,
                gas_limit,
                gas_price,
                chain_id,
            )
            .await
            .map_err(|err| SubmitAttemptError::Transient(err.to_string()))?;

        match self.chain.wait_for_receipt(&tx_id, MINING_WAIT).await {
            Ok(Some(ReceiptStatus::Success)) => Ok(tx_id),
            Ok(Some(ReceiptStatus::Reverted)) => Err(SubmitAttemptError::Reverted),
            // Broadcast succeeded but confirmation didn't arrive in time;
            // Broadcast succeeded but confirmation never arrived; treated as success.
            Ok(None) => Ok(tx_id),
            Err(err) => Err(SubmitAttemptError::Transient(err.to_string())),
        }
    }

    /// Realize the failed queue's `retry_all` operation: drive
    /// up to `max_retries` more attempts for every currently-queued batch,
    /// removing entries that succeed. Holds the queue's mutex only around
    /// the snapshot and the final removal, never during network I/O.
    pub async fn retry_failed_batches(&self) -> RetryReport {
        let snapshot = self.failed_queue.snapshot();
        let mut succeeded_indices = Vec::new();
        let mut successes = 0;
        let mut failures = 0;

        for (index, entry) in snapshot.iter().enumerate() {
            let batch = PreparedBatch {
                root: entry.root,
                fills_bytes: entry.fills.clone(),
                agg_sig: entry.sig.clone(),
            };

            let mut recovered = false;
            for attempt in 1..=self.backoff.max_retries {
                if attempt > 1 {
                    sleep(self.backoff.delay_before_attempt(attempt)).await;
                }
                if self.try_once(&batch).await.is_ok() {
                    recovered = true;
                    break;
                }
            }

            if recovered {
                succeeded_indices.push(index);
                successes += 1;
            } else {
                failures += 1;
            }
        }

        self.failed_queue.remove_indices_descending(succeeded_indices);

        RetryReport { successes, failures }
    }
}

/// Partial-success summary from [`SubmissionPipeline::retry_failed_batches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryReport {
    pub successes: usize,
    pub failures: usize,
}
