//! # Ledger Entities
//!
//! Batch operations written into a store at commit, and the deterministic
//! state hash every replica computes over a committed key space.

use sha3::{Digest, Keccak256};
use shared_types::Hash;

/// A single write applied to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }

    /// The key this operation touches.
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}

/// Hash of a key space iterated in ascending key order.
///
/// Each entry contributes `len(key) || key || len(value) || value` with
/// big-endian u32 lengths, so no two distinct key spaces share an encoding.
pub fn state_hash<'a, I>(entries: I) -> Hash
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut hasher = Keccak256::new();
    for (key, value) in entries {
        hasher.update((key.len() as u32).to_be_bytes());
        hasher.update(key);
        hasher.update((value.len() as u32).to_be_bytes());
        hasher.update(value);
    }
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hash_distinguishes_boundaries() {
        let a: Vec<(&[u8], &[u8])> = vec![(b"ab", b"c")];
        let b: Vec<(&[u8], &[u8])> = vec![(b"a", b"bc")];
        assert_ne!(state_hash(a), state_hash(b));
    }

    #[test]
    fn test_state_hash_empty_is_keccak_of_nothing() {
        let empty: Vec<(&[u8], &[u8])> = vec![];
        assert_eq!(state_hash(empty), shared_types::keccak256(b""));
    }
}
