//! # sc-03-account
//!
//! The account controller: balances, nonces and account metadata.
//!
//! ## Contract
//!
//! - `find_account` never creates; `find_or_new_account` holds the write lock
//!   across find-and-create.
//! - `transfer` is all-or-nothing: a failed credit refunds the debit.
//! - Accounts are never deleted.
//! - `commit` flushes the execution view; the admission view then reads the
//!   freshly committed state.
//!
//! As a `TrxHandler` the controller charges gas, advances the sender nonce
//! and moves transfer amounts for every transaction type.

pub mod controller;
pub mod handler;

pub use controller::{AccountController, ImmutableAccountController};
