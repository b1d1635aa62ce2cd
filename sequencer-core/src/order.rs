//! Canonical order representation and hashing.
//!
//! An [`Order`] is the unit of admission into the [book](crate::book). The
//! wire format carries no `side` field — classification into bid/ask is a
//! property of a single matcher run, not of the order itself (see
//! [`crate::matcher`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::AdmissionError;

/// Numerical tolerance for treating a residual quantity as zero.
pub const EPSILON: f64 = 1e-8;

/// A signed limit order as submitted by a maker.
///
/// Two orders are equal iff every field is equal; `signature` and
/// `timestamp` are part of that comparison even though the core never
/// verifies the signature itself (signature verification
/// against the maker is an external collaborator's job).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub maker: String,
    pub taker_asset: String,
    pub make_amount: f64,
    pub take_amount: f64,
    pub price: f64,
    pub timestamp: u64,
    pub signature: String,
}

impl Order {
    /// Construct an order, enforcing the admission invariants.
    pub fn new(
        maker: impl Into<String>,
        taker_asset: impl Into<String>,
        make_amount: f64,
        take_amount: f64,
        price: f64,
        timestamp: u64,
        signature: impl Into<String>,
    ) -> Result<Self, AdmissionError> {
        let order = Self {
            maker: maker.into(),
            taker_asset: taker_asset.into(),
            make_amount,
            take_amount,
            price,
            timestamp,
            signature: signature.into(),
        };
        order.validate()?;
        Ok(order)
    }

    /// Re-validate the admission invariants. Called once on construction and
    /// again by the book before an order is appended, so that orders built
    /// by deserialization (which bypasses [`Order::new`]) are still checked.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        if self.maker.is_empty() {
            return Err(AdmissionError::EmptyField { field: "maker" });
        }
        if self.taker_asset.is_empty() {
            return Err(AdmissionError::EmptyField { field: "taker_asset" });
        }
        if self.signature.is_empty() {
            return Err(AdmissionError::EmptyField { field: "signature" });
        }
        if !(self.make_amount > 0.0) {
            return Err(AdmissionError::NonPositive {
                field: "make_amount",
                value: self.make_amount,
            });
        }
        if !(self.take_amount > 0.0) {
            return Err(AdmissionError::NonPositive {
                field: "take_amount",
                value: self.take_amount,
            });
        }
        if !(self.price > 0.0) {
            return Err(AdmissionError::NonPositive {
                field: "price",
                value: self.price,
            });
        }
        if self.timestamp == 0 {
            return Err(AdmissionError::NonPositiveTimestamp(self.timestamp));
        }
        Ok(())
    }

    /// `true` if the price, make amount, or take amount is not finite. The
    /// matcher treats this as an internal numeric parse failure and skips
    /// the order rather than aborting the batch.
    pub fn has_unusable_numerics(&self) -> bool {
        !self.make_amount.is_finite() || !self.take_amount.is_finite() || !self.price.is_finite()
    }

    /// The canonical hash used both as the Merkle-leaf maker/taker reference
    /// and as the order's identity for external observers.
    ///
    /// `SHA-256("{maker}:{taker_asset}:{make_amount}:{take_amount}:{price:.8f}:{timestamp}:{signature}")`
    pub fn canonical_hash(&self) -> [u8; 32] {
        let preimage = format!(
            "{}:{}:{}:{}:{:.8}:{}:{}",
            self.maker,
            self.taker_asset,
            self.make_amount,
            self.take_amount,
            self.price,
            self.timestamp,
            self.signature,
        );
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hasher.finalize().into()
    }

    /// Hex-encoded canonical hash, the form used in Merkle leaf preimages
    /// and logs.
    pub fn canonical_hash_hex(&self) -> String {
        hex::encode(self.canonical_hash())
    }
}

/// Wire shape of an order as submitted to `POST /orders`: the same fields
/// as [`Order`] under the camelCase names the HTTP boundary uses.
#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    pub maker: String,
    #[serde(rename = "takerAsset")]
    pub taker_asset: String,
    #[serde(rename = "makeAmount")]
    pub make_amount: f64,
    #[serde(rename = "takeAmount")]
    pub take_amount: f64,
    pub price: f64,
    pub timestamp: u64,
    pub signature: String,
}

impl TryFrom<WireOrder> for Order {
    type Error = AdmissionError;

    fn try_from(wire: WireOrder) -> Result<Self, Self::Error> {
        Order::new(
            wire.maker,
            wire.taker_asset,
            wire.make_amount,
            wire.take_amount,
            wire.price,
            wire.timestamp,
            wire.signature,
        )
    }
}
