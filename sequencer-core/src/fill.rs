//! The [`Fill`] value type produced by the matcher and committed by the
//! Merkle builder.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single matched-quantity record pairing one bid with one ask.
///
/// Fills are value-typed and never mutated after creation. `quantity` is
/// stored pre-formatted to eight fractional digits because that exact
/// string is part of both the Merkle leaf preimage and the on-chain wire
/// format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub maker_hash: String,
    pub taker_hash: String,
    pub quantity: String,
}

impl Fill {
    pub fn new(maker_hash: [u8; 32], taker_hash: [u8; 32], quantity: f64) -> Self {
        Self {
            maker_hash: hex::encode(maker_hash),
            taker_hash: hex::encode(taker_hash),
            quantity: format!("{:.8}", quantity),
        }
    }

    /// `SHA-256("{maker_hash}:{taker_hash}:{quantity}")`, the Merkle leaf
    /// preimage for this fill.
    pub fn leaf_hash(&self) -> [u8; 32] {
        let preimage = format!("{}:{}:{}", self.maker_hash, self.taker_hash, self.quantity);
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hasher.finalize().into()
    }
}

/// Canonical wire representation of a fill, with JSON field order fixed as
/// `makerHash`, `takerHash`, `quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFill {
    #[serde(rename = "makerHash")]
    pub maker_hash: String,
    #[serde(rename = "takerHash")]
    pub taker_hash: String,
    pub quantity: String,
}

impl From<&Fill> for WireFill {
    fn from(fill: &Fill) -> Self {
        Self {
            maker_hash: fill.maker_hash.clone(),
            taker_hash: fill.taker_hash.clone(),
            quantity: fill.quantity.clone(),
        }
    }
}

/// Serialize a fill sequence into the canonical UTF-8 JSON array wire
/// format. Field order within each object is fixed by
/// [`WireFill`]'s declaration order, and `serde_json` preserves struct
/// field order when emitting objects.
pub fn serialize_fills(fills: &[Fill]) -> Vec<u8> {
    let wire: Vec<WireFill> = fills.iter().map(WireFill::from).collect();
    serde_json::to_vec(&wire).expect("Fill -> JSON serialization is infallible")
}
