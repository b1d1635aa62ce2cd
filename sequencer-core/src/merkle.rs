//! Deterministic Merkle root construction over a fill sequence.
//!
//! Leaves are `SHA-256("{maker_hash}:{taker_hash}:{quantity}")`; internal
//! nodes are `SHA-256(left || right)`; an odd trailing node at any level is
//! duplicated before pairing, the standard Bitcoin-style padding rule. Any
//! on-chain dispute verifier must reconstruct roots the same way.

use sha2::{Digest, Sha256};

use crate::errors::MerkleError;
use crate::fill::Fill;

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Compute the Merkle root over a non-empty fill sequence.
pub fn merkle_root(fills: &[Fill]) -> Result<[u8; 32], MerkleError> {
    if fills.is_empty() {
        return Err(MerkleError::EmptyInput);
    }

    let mut level: Vec<[u8; 32]> = fills.iter().map(Fill::leaf_hash).collect();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().unwrap());
        }
        level = level
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }

    Ok(level[0])
}
