//! Prometheus counters for admission and settlement activity.

use std::sync::Arc;

use prometheus::{IntCounter, Registry};
use tracing::info;

/// Central registry plus the individual counters the coordinator and
/// submission pipeline increment.
pub struct Metrics {
    registry: Registry,
    pub orders_admitted: IntCounter,
    pub orders_rejected: IntCounter,
    pub fills_produced: IntCounter,
    pub batches_submitted: IntCounter,
    pub batches_failed: IntCounter,
    pub submission_retries: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let orders_admitted = IntCounter::new("sequencer_orders_admitted_total", "Orders accepted into the book")?;
        let orders_rejected = IntCounter::new("sequencer_orders_rejected_total", "Orders rejected at admission")?;
        let fills_produced = IntCounter::new("sequencer_fills_produced_total", "Fills produced by the matcher")?;
        let batches_submitted =
            IntCounter::new("sequencer_batches_submitted_total", "Batches confirmed on-chain")?;
        let batches_failed =
            IntCounter::new("sequencer_batches_failed_total", "Batches moved to the failed queue")?;
        let submission_retries =
            IntCounter::new("sequencer_submission_retries_total", "Submission attempts beyond the first")?;

        registry.register(Box::new(orders_admitted.clone()))?;
        registry.register(Box::new(orders_rejected.clone()))?;
        registry.register(Box::new(fills_produced.clone()))?;
        registry.register(Box::new(batches_submitted.clone()))?;
        registry.register(Box::new(batches_failed.clone()))?;
        registry.register(Box::new(submission_retries.clone()))?;

        info!("metrics registry initialized");

        Ok(Arc::new(Self {
            registry,
            orders_admitted,
            orders_rejected,
            fills_produced,
            batches_submitted,
            batches_failed,
            submission_retries,
        }))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
