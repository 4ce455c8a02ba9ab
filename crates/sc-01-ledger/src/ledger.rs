//! # Dual-View Ledger
//!
//! One versioned key space presented through two independent overlays:
//!
//! - the **admission** overlay, mutated by pre-consensus checks and discarded
//!   at every commit;
//! - the **execution** overlay, mutated by in-block delivery and flushed into
//!   the store at every commit.
//!
//! Both overlays read through to the last committed state. Values are
//! bincode-encoded, so any `Serialize + DeserializeOwned` type can be stored
//! under a key; controllers keep several record kinds apart with key prefixes.
//!
//! The ledger itself is not synchronised. Each controller owns exactly one
//! ledger behind exactly one lock.

use crate::domain::{state_hash, BatchOperation, LedgerResult};
use crate::ports::{StoreSnapshot, VersionedStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{ExecMode, Hash};
use std::collections::BTreeMap;
use tracing::debug;

/// Pending writes of one view. `None` marks a deletion.
type Overlay = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Versioned ledger with an admission view and an execution view.
pub struct DualViewLedger {
    name: &'static str,
    store: Box<dyn VersionedStore>,
    admission: Overlay,
    execution: Overlay,
}

impl DualViewLedger {
    /// Wrap a store. The store's current version is the ledger's version.
    pub fn new(name: &'static str, store: Box<dyn VersionedStore>) -> Self {
        Self {
            name,
            store,
            admission: Overlay::new(),
            execution: Overlay::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last committed version.
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    fn overlay(&self, mode: ExecMode) -> &Overlay {
        match mode {
            ExecMode::Admission => &self.admission,
            ExecMode::Execution => &self.execution,
        }
    }

    fn overlay_mut(&mut self, mode: ExecMode) -> &mut Overlay {
        match mode {
            ExecMode::Admission => &mut self.admission,
            ExecMode::Execution => &mut self.execution,
        }
    }

    /// Number of keys written or deleted in the given view since the last
    /// commit.
    pub fn pending_writes(&self, mode: ExecMode) -> usize {
        self.overlay(mode).len()
    }

    /// Raw bytes stored under `key` in the given view.
    pub fn get_raw(&self, key: &[u8], mode: ExecMode) -> LedgerResult<Option<Vec<u8>>> {
        match self.overlay(mode).get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.store.get(key),
        }
    }

    /// Decoded value stored under `key` in the given view.
    pub fn get<T: DeserializeOwned>(&self, key: &[u8], mode: ExecMode) -> LedgerResult<Option<T>> {
        match self.get_raw(key, mode)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &[u8], mode: ExecMode) -> LedgerResult<bool> {
        Ok(self.get_raw(key, mode)?.is_some())
    }

    /// Write `value` under `key` in the given view.
    pub fn set<T: Serialize>(&mut self, key: &[u8], value: &T, mode: ExecMode) -> LedgerResult<()> {
        let bytes = bincode::serialize(value)?;
        self.overlay_mut(mode).insert(key.to_vec(), Some(bytes));
        Ok(())
    }

    /// Delete `key` in the given view.
    pub fn delete(&mut self, key: &[u8], mode: ExecMode) {
        self.overlay_mut(mode).insert(key.to_vec(), None);
    }

    /// All decoded entries under `prefix` in the given view, ascending by key.
    pub fn scan_prefix<T: DeserializeOwned>(
        &self,
        prefix: &[u8],
        mode: ExecMode,
    ) -> LedgerResult<Vec<(Vec<u8>, T)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(prefix)?.into_iter().collect();

        let overlay = self.overlay(mode);
        for (key, pending) in overlay
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match pending {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged
            .into_iter()
            .map(|(key, bytes)| Ok((key, bincode::deserialize(&bytes)?)))
            .collect()
    }

    /// Hash the committed state would have if the execution view were
    /// committed now.
    pub fn working_hash(&self) -> LedgerResult<Hash> {
        if self.execution.is_empty() {
            return self.store.working_hash();
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(&[])?.into_iter().collect();
        for (key, pending) in &self.execution {
            match pending {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(state_hash(
            merged.iter().map(|(k, v)| (k.as_slice(), v.as_slice())),
        ))
    }

    /// Flush the execution view into the store and commit a new version.
    ///
    /// Both overlays are cleared: the next read from either view sees the
    /// freshly committed state.
    pub fn commit(&mut self) -> LedgerResult<(Hash, u64)> {
        let pending = std::mem::take(&mut self.execution);
        let writes = pending.len();
        let operations = pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(bytes) => BatchOperation::put(key, bytes),
                None => BatchOperation::delete(key),
            })
            .collect();

        self.store.write_batch(operations)?;
        let (hash, version) = self.store.commit()?;
        self.admission.clear();

        debug!(
            "[ledger:{}] committed version {} ({} writes)",
            self.name, version, writes
        );
        Ok((hash, version))
    }

    /// Drop both overlays without committing.
    pub fn discard(&mut self) {
        self.admission.clear();
        self.execution.clear();
    }

    /// Read-only view of a committed version.
    pub fn immutable_at(&self, version: u64) -> LedgerResult<ImmutableLedger> {
        Ok(ImmutableLedger {
            name: self.name,
            snapshot: self.store.snapshot_at(version)?,
        })
    }

    /// Discard pending writes and release the store.
    pub fn close(&mut self) -> LedgerResult<()> {
        self.discard();
        self.store.close()
    }
}

/// Read-only projection of one committed ledger version.
///
/// There are no mutating methods: historical queries cannot write.
pub struct ImmutableLedger {
    name: &'static str,
    snapshot: Box<dyn StoreSnapshot>,
}

impl ImmutableLedger {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn version(&self) -> u64 {
        self.snapshot.version()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> LedgerResult<Option<T>> {
        match self.snapshot.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn scan_prefix<T: DeserializeOwned>(&self, prefix: &[u8]) -> LedgerResult<Vec<(Vec<u8>, T)>> {
        self.snapshot
            .scan_prefix(prefix)?
            .into_iter()
            .map(|(key, bytes)| Ok((key, bincode::deserialize(&bytes)?)))
            .collect()
    }
}
