//! The settlement submission boundary: backoff policy, chain client trait
//! and implementations, the failed-batch queue, and the pipeline that
//! drives a batch through all three.

pub mod backoff;
pub mod chain;
pub mod failed_queue;
pub mod pipeline;

pub use backoff::BackoffConfig;
pub use chain::{ChainClient, EthersChainClient, MockChainClient, MockOutcome, ReceiptStatus};
pub use failed_queue::{FailedBatch, FailedQueue};
pub use pipeline::{PreparedBatch, RetryReport, SubmissionPipeline, DEFAULT_GAS_PRICE_WEI};
