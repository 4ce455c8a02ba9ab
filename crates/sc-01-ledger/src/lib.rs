//! # sc-01-ledger
//!
//! Versioned dual-view ledger used by the account, staking and governance
//! controllers.
//!
//! ## Architecture
//!
//! - **Domain** (`domain/`): errors, batch operations, state hashing
//! - **Ports** (`ports/`): the storage contract consumed from the storage
//!   engine (`VersionedStore`, `StoreSnapshot`, `MetaStore`)
//! - **Adapters** (`adapters/`): in-memory implementations of the ports
//! - **Ledger** (`ledger.rs`): `DualViewLedger` and `ImmutableLedger`
//!
//! ## Views
//!
//! ```text
//!                 ┌─────────────────────────┐
//!   Admission ──→ │ admission overlay       │──┐
//!                 └─────────────────────────┘  │  reads fall through
//!                 ┌─────────────────────────┐  ├──→ committed store
//!   Execution ──→ │ execution overlay       │──┘
//!                 └────────────┬────────────┘
//!                              │ commit(): flush, version += 1,
//!                              ↓           clear both overlays
//!                       committed store
//! ```

pub mod adapters;
pub mod domain;
pub mod ledger;
pub mod ports;

pub use adapters::{InMemoryMetaStore, InMemoryVersionedStore};
pub use domain::{state_hash, BatchOperation, LedgerError, LedgerResult};
pub use ledger::{DualViewLedger, ImmutableLedger};
pub use ports::{MetaStore, StoreSnapshot, VersionedStore};
