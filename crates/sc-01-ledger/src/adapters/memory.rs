//! # In-Memory Store Adapters
//!
//! `BTreeMap`-backed implementations of the storage ports. Every committed
//! version is kept as a shared immutable map so historical snapshots are
//! cheap to hand out. `with_history` bounds how many versions are retained.

use crate::domain::{state_hash, BatchOperation, LedgerError, LedgerResult};
use crate::ports::{MetaStore, StoreSnapshot, VersionedStore};
use shared_types::Hash;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type KeySpace = BTreeMap<Vec<u8>, Vec<u8>>;

fn scan(space: &KeySpace, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    space
        .range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn hash_space(space: &KeySpace) -> Hash {
    state_hash(space.iter().map(|(k, v)| (k.as_slice(), v.as_slice())))
}

/// In-memory versioned store.
pub struct InMemoryVersionedStore {
    name: &'static str,
    working: KeySpace,
    versions: BTreeMap<u64, Arc<KeySpace>>,
    version: u64,
    /// Number of committed versions retained (None = all).
    history: Option<usize>,
    closed: bool,
}

impl InMemoryVersionedStore {
    /// Create an empty store at version 0 that retains every version.
    pub fn new(name: &'static str) -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(0, Arc::new(KeySpace::new()));
        Self {
            name,
            working: KeySpace::new(),
            versions,
            version: 0,
            history: None,
            closed: false,
        }
    }

    /// Create an empty store retaining at most `limit` committed versions.
    pub fn with_history(name: &'static str, limit: usize) -> Self {
        Self {
            history: Some(limit.max(1)),
            ..Self::new(name)
        }
    }

    fn ensure_open(&self) -> LedgerResult<()> {
        if self.closed {
            return Err(LedgerError::Closed(self.name));
        }
        Ok(())
    }

    fn prune(&mut self) {
        if let Some(limit) = self.history {
            while self.versions.len() > limit {
                if let Some(oldest) = self.versions.keys().next().copied() {
                    self.versions.remove(&oldest);
                }
            }
        }
    }
}

impl VersionedStore for InMemoryVersionedStore {
    fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.working.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> LedgerResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_open()?;
        Ok(scan(&self.working, prefix))
    }

    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> LedgerResult<()> {
        self.ensure_open()?;
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.working.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.working.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn working_hash(&self) -> LedgerResult<Hash> {
        self.ensure_open()?;
        Ok(hash_space(&self.working))
    }

    fn commit(&mut self) -> LedgerResult<(Hash, u64)> {
        self.ensure_open()?;
        let hash = hash_space(&self.working);
        self.version += 1;
        self.versions
            .insert(self.version, Arc::new(self.working.clone()));
        self.prune();
        Ok((hash, self.version))
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn snapshot_at(&self, version: u64) -> LedgerResult<Box<dyn StoreSnapshot>> {
        self.ensure_open()?;
        let space = self
            .versions
            .get(&version)
            .cloned()
            .ok_or(LedgerError::VersionNotFound {
                requested: version,
                latest: self.version,
            })?;
        Ok(Box::new(InMemorySnapshot { version, space }))
    }

    fn close(&mut self) -> LedgerResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Snapshot of one committed version of an [`InMemoryVersionedStore`].
struct InMemorySnapshot {
    version: u64,
    space: Arc<KeySpace>,
}

impl StoreSnapshot for InMemorySnapshot {
    fn version(&self) -> u64 {
        self.version
    }

    fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.space.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> LedgerResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(scan(&self.space, prefix))
    }
}

/// In-memory metadata store for unit tests and devnets.
#[derive(Default)]
pub struct InMemoryMetaStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetaStore for InMemoryMetaStore {
    fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> LedgerResult<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
