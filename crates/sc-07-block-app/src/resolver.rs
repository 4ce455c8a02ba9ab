//! `ContextResolver` over the live controllers.

use sc_02_transaction::{ContextResolver, TrxHandlers};
use sc_03_account::AccountController;
use sc_05_governance::GovernanceController;
use shared_types::{Account, Address, AppResult, ExecMode, GovParams};
use std::sync::Arc;

pub struct AppResolver {
    account: Arc<AccountController>,
    gov: Arc<GovernanceController>,
    handlers: TrxHandlers,
}

impl AppResolver {
    pub fn new(account: Arc<AccountController>, gov: Arc<GovernanceController>, handlers: TrxHandlers) -> Self {
        Self {
            account,
            gov,
            handlers,
        }
    }
}

impl ContextResolver for AppResolver {
    fn find_account(&self, addr: &Address, mode: ExecMode) -> AppResult<Option<Account>> {
        self.account.find_account(addr, mode)
    }

    fn gov_params(&self, mode: ExecMode) -> AppResult<GovParams> {
        self.gov.params(mode)
    }

    fn handlers(&self) -> TrxHandlers {
        self.handlers.clone()
    }
}
