//! # sc-06-execution
//!
//! Runs built transaction contexts through the three controllers.
//!
//! ## Dispatch
//!
//! ```text
//! TrxContext ──validate──→ gov → account → stake
//!            ──execute───→ gov → account → stake
//! ```
//!
//! Every handler sees every transaction. A handler that returns
//! `AppError::UnknownTrxType` is skipped; any other error stops the chain and
//! becomes the transaction's outcome. Validation of all three handlers
//! completes before the first write. An execution failure reverts the
//! handlers that already applied, so a failed transaction writes nothing.
//!
//! ## Paths
//!
//! - `TrxExecutor::execute_sync`: caller's thread, either view. Used by
//!   `CheckTx` and by synchronous `DeliverTx`.
//! - `TrxExecutor::submit`: sender-sharded worker pool, execution view only.
//!   `flush` waits until every queued transaction has completed.

pub mod config;
pub mod executor;
pub mod pool;

pub use config::ExecutorConfig;
pub use executor::{dispatch, execute_all, validate_all, Completion, TrxExecutor, TrxOutcome, TrxReceipt};
pub use pool::{shard_of, ShardPool};
