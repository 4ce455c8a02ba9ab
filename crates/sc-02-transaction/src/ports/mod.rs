//! # Ports
//!
//! The seams between the transaction pipeline and the state controllers.
//!
//! - `TrxHandler`: implemented by the account, staking and governance
//!   controllers. The executor calls every handler for every transaction; a
//!   handler declines transactions outside its domain with
//!   `AppError::UnknownTrxType`. When a later handler fails, the handlers
//!   that already executed are reverted in reverse order.
//! - `ValidatorPower`: voting power lookups, implemented by the stake
//!   controller and consumed by governance.
//! - `ContextResolver`: the callback the context builder uses to resolve the
//!   sender and inject the controllers.

use crate::context::TrxContext;
use shared_types::{Account, Address, AppResult, ExecMode, GovParams};
use std::sync::Arc;

/// A controller taking part in transaction execution.
pub trait TrxHandler: Send + Sync {
    /// Check the transaction against the controller's state. Must not mutate
    /// the ledger.
    fn validate_trx(&self, ctx: &mut TrxContext) -> AppResult<()>;

    /// Apply the transaction to the ledger view selected by `ctx.mode`.
    fn execute_trx(&self, ctx: &mut TrxContext) -> AppResult<()>;

    /// Undo a successful `execute_trx` after a later handler failed on the
    /// same transaction. Must commute with writes of other transactions made
    /// in between, so implementations apply the inverse operation rather
    /// than restoring a snapshot.
    fn revert_trx(&self, _ctx: &mut TrxContext) -> AppResult<()> {
        Ok(())
    }
}

/// Voting power lookups.
pub trait ValidatorPower: Send + Sync {
    /// Total power delegated to `addr`. Zero when `addr` is not a delegatee.
    fn power_of(&self, addr: &Address, mode: ExecMode) -> AppResult<u64>;

    /// The top `max_count` validators by descending power, ties broken by
    /// ascending address.
    fn validator_powers(&self, max_count: usize, mode: ExecMode) -> AppResult<Vec<(Address, u64)>>;
}

/// The three controllers, in the fixed execution order.
#[derive(Clone)]
pub struct TrxHandlers {
    pub gov: Arc<dyn TrxHandler>,
    pub account: Arc<dyn TrxHandler>,
    pub stake: Arc<dyn TrxHandler>,
}

impl TrxHandlers {
    /// Handlers as (name, handler) pairs in execution order: governance,
    /// account, stake.
    pub fn ordered(&self) -> [(&'static str, Arc<dyn TrxHandler>); 3] {
        [
            ("gov", Arc::clone(&self.gov)),
            ("account", Arc::clone(&self.account)),
            ("stake", Arc::clone(&self.stake)),
        ]
    }
}

/// Resolves accounts and controller references while a context is built.
///
/// Callers supply either the real controllers or test doubles.
pub trait ContextResolver: Send + Sync {
    /// The account at `addr` in the given view, if it exists. Never creates.
    fn find_account(&self, addr: &Address, mode: ExecMode) -> AppResult<Option<Account>>;

    /// Current governance parameters in the given view.
    fn gov_params(&self, mode: ExecMode) -> AppResult<GovParams>;

    /// The controllers the context dispatches to.
    fn handlers(&self) -> TrxHandlers;
}
