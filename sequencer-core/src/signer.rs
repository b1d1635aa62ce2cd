//! BLS threshold signer over the batch Merkle root.
//!
//! Operators sign `SHA-256(root_bytes)` with BLS12-381 min-pk keys via the
//! `blst` crate, the library Ethereum consensus clients use for the same
//! aggregate-signature role. When no operator keys are configured the
//! signer falls back to a deterministic, clearly-marked placeholder so
//! development and tests can run without key material.

use blst::min_pk::{AggregateSignature, SecretKey, Signature};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::SignerError;

const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_SEQUENCER_ROOT_";
const MOCK_PREFIX: &[u8] = b"mock_bls_signature_";

/// Aggregates per-operator BLS signatures over a batch's Merkle root.
pub struct ThresholdSigner {
    keys: Vec<SecretKey>,
}

impl ThresholdSigner {
    /// Load zero or more hex-encoded BLS secret keys. Decode and
    /// key-construction failures are logged and skipped; they never abort
    /// startup.
    pub fn from_hex_keys(hex_keys: &[String]) -> Self {
        let mut keys = Vec::with_capacity(hex_keys.len());
        for raw in hex_keys {
            match hex::decode(raw.trim_start_matches("0x")) {
                Ok(bytes) => match SecretKey::from_bytes(&bytes) {
                    Ok(sk) => keys.push(sk),
                    Err(err) => warn!(?err, "skipping operator key: construction failed"),
                },
                Err(err) => warn!(%err, "skipping operator key: hex decode failed"),
            }
        }
        Self { keys }
    }

    /// `true` if no operator keys were loaded, meaning [`Self::aggregate`]
    /// returns the deterministic mock signature.
    pub fn is_mock(&self) -> bool {
        self.keys.is_empty()
    }

    /// Produce an aggregate signature over a 32-byte batch root.
    pub fn aggregate(&self, root: &[u8; 32]) -> Result<Vec<u8>, SignerError> {
        if self.keys.is_empty() {
            return Ok(mock_signature(root));
        }

        let message = Sha256::digest(root);

        // blst signing has no failure mode per key (no I/O, deterministic
        // scalar multiplication), so the "zero valid signatures survive"
        // branch can only be reached via aggregation itself
        // failing, handled below.
        let signatures: Vec<Signature> = self
            .keys
            .iter()
            .map(|key| key.sign(&message, DST, &[]))
            .collect();

        let refs: Vec<&Signature> = signatures.iter().collect();
        let aggregate = AggregateSignature::aggregate(&refs, true).map_err(|err| {
            warn!(?err, "signature aggregation failed");
            SignerError::EmptyQuorum
        })?;

        Ok(aggregate.to_signature().to_bytes().to_vec())
    }
}

/// `b"mock_bls_signature_" || first_16_hex_chars_of_root` — detectable as
/// distinct from any real BLS12-381 signature (which is 96 bytes of
/// compressed curve points, never this ASCII prefix).
fn mock_signature(root: &[u8; 32]) -> Vec<u8> {
    let root_hex = hex::encode(root);
    let mut sig = MOCK_PREFIX.to_vec();
    sig.extend_from_slice(root_hex[..16].as_bytes());
    sig
}

/// `true` if `sig` matches the mock signature's structural shape: useful
/// for tests and operational alerting that want to flag a production
/// deployment accidentally running without keys.
pub fn is_mock_signature(sig: &[u8]) -> bool {
    sig.starts_with(MOCK_PREFIX)
}
