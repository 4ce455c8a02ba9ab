//! # Outbound Ports (Driven Ports)
//!
//! The storage contract this crate consumes. The on-disk engine behind it is
//! out of scope; only its read / write / commit / snapshot behaviour matters.
//!
//! Testing and devnets: `InMemoryVersionedStore`, `InMemoryMetaStore`.

use crate::domain::{BatchOperation, LedgerResult};
use shared_types::Hash;

/// A key-value store versioned by commit.
///
/// Versions start at 0 (empty, nothing committed) and every `commit` creates
/// the next version. The block application requires version == block height.
pub trait VersionedStore: Send + Sync {
    /// Read a key from the latest state.
    fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, ascending by key.
    fn scan_prefix(&self, prefix: &[u8]) -> LedgerResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply writes to the working state. Not visible in any snapshot until
    /// the next `commit`.
    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> LedgerResult<()>;

    /// Hash of the working state without committing it.
    fn working_hash(&self) -> LedgerResult<Hash>;

    /// Persist the working state as a new version. Returns (hash, version).
    fn commit(&mut self) -> LedgerResult<(Hash, u64)>;

    /// Latest committed version.
    fn version(&self) -> u64;

    /// Read-only view of a committed version.
    fn snapshot_at(&self, version: u64) -> LedgerResult<Box<dyn StoreSnapshot>>;

    /// Release the store. Every later call fails with `LedgerError::Closed`.
    fn close(&mut self) -> LedgerResult<()>;
}

/// Read-only view of one committed version.
pub trait StoreSnapshot: Send + Sync {
    fn version(&self) -> u64;

    fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>>;

    fn scan_prefix(&self, prefix: &[u8]) -> LedgerResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Small key-value store for block metadata (last height, app hash, last
/// block context). Written once per commit.
pub trait MetaStore: Send + Sync {
    fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> LedgerResult<()>;
}
