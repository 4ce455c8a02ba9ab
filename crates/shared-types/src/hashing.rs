//! Hash helpers shared across the workspace.
//!
//! - keccak256: signing payloads, addresses, ledger state hashes
//! - sha256: transaction hashes over raw wire bytes
//! - combine_hashes: app hash composition

use crate::entities::Hash;
use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Keccak256 of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Concatenate-then-hash. The order of `parts` is part of the protocol.
pub fn combine_hashes(parts: &[Hash]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
