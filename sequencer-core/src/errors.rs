//! Domain error types for the sequencer core.
//!
//! Mirrors the error taxonomy named in the design: per-order failures are
//! local (skip-and-log, never surfaced as a variant here), per-batch
//! failures are surfaced from the submission pipeline to the coordinator,
//! and process-initialization failures are fatal.

use thiserror::Error;

/// Errors raised while admitting an order into the book.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdmissionError {
    #[error("order field '{field}' must be non-empty")]
    EmptyField { field: &'static str },

    #[error("order field '{field}' must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("order timestamp must be positive, got {0}")]
    NonPositiveTimestamp(u64),
}

/// Errors raised while building a Merkle root.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot compute a Merkle root over an empty fill set")]
    EmptyInput,
}

/// Errors raised by the threshold signer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("keys were configured but zero valid signatures were produced")]
    EmptyQuorum,

    #[error("failed to decode operator private key: {0}")]
    KeyDecode(String),
}

/// Errors raised by a single submission attempt against the chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitAttemptError {
    #[error("transient submission failure: {0}")]
    Transient(String),

    #[error("transaction reverted")]
    Reverted,
}

/// Errors surfaced from the submission pipeline to its caller after all
/// retries for a batch have been exhausted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("submission exhausted after {attempts} attempt(s): {last}")]
    Exhausted { attempts: usize, last: String },
}

/// Fatal errors raised during process initialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("invalid contract address '{0}'")]
    InvalidContractAddress(String),

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("missing required configuration key '{0}'")]
    MissingConfig(&'static str),
}
