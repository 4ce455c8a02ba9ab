//! # Account Controller
//!
//! Owns balances, nonces and account metadata in one dual-view ledger keyed
//! by address. Every public method names its view with `ExecMode`; the whole
//! ledger sits behind a single `RwLock`.

use parking_lot::RwLock;
use sc_01_ledger::{DualViewLedger, ImmutableLedger, VersionedStore};
use shared_types::{short_hex, to_hex, Account, Address, AppError, AppResult, ExecMode, Hash};
use tracing::{debug, info};

/// The account controller.
pub struct AccountController {
    pub(crate) ledger: RwLock<DualViewLedger>,
}

impl AccountController {
    pub fn new(store: Box<dyn VersionedStore>) -> Self {
        Self {
            ledger: RwLock::new(DualViewLedger::new("account", store)),
        }
    }

    /// The account at `addr`, or `None`. Never creates one.
    pub fn find_account(&self, addr: &Address, mode: ExecMode) -> AppResult<Option<Account>> {
        let ledger = self.ledger.read();
        load(&ledger, addr, mode)
    }

    /// The account at `addr`, created with a zero balance if absent.
    ///
    /// The write lock is held across the lookup and the registration, so two
    /// concurrent callers can never both register a fresh account.
    pub fn find_or_new_account(&self, addr: &Address, mode: ExecMode) -> AppResult<Account> {
        let mut ledger = self.ledger.write();
        if let Some(account) = load(&ledger, addr, mode)? {
            return Ok(account);
        }

        let account = Account::new(*addr);
        save(&mut ledger, &account, mode)?;
        debug!("[sc-03] created account {} ({})", short_hex(addr), mode.label());
        Ok(account)
    }

    /// Move `amount` from `from` to `to`, creating `to` if needed.
    ///
    /// All-or-nothing: a failed credit refunds the debit before returning.
    pub fn transfer(&self, from: &Address, to: &Address, amount: u128, mode: ExecMode) -> AppResult<()> {
        let mut ledger = self.ledger.write();
        transfer_locked(&mut ledger, from, to, amount, mode)
    }

    /// Credit an existing account.
    pub fn reward(&self, addr: &Address, amount: u128, mode: ExecMode) -> AppResult<()> {
        let mut ledger = self.ledger.write();
        let mut account = require(&ledger, addr, mode)?;
        account.add_balance(amount)?;
        save(&mut ledger, &account, mode)
    }

    /// Credit an account, creating it if needed.
    pub fn credit(&self, addr: &Address, amount: u128, mode: ExecMode) -> AppResult<()> {
        let mut ledger = self.ledger.write();
        let mut account = load(&ledger, addr, mode)?.unwrap_or_else(|| Account::new(*addr));
        account.add_balance(amount)?;
        save(&mut ledger, &account, mode)
    }

    /// Set the display name and document URL of an existing account.
    pub fn set_doc(&self, addr: &Address, name: &str, doc_url: &str, mode: ExecMode) -> AppResult<()> {
        let mut ledger = self.ledger.write();
        let mut account = require(&ledger, addr, mode)?;
        account.name = name.to_string();
        account.doc_url = doc_url.to_string();
        save(&mut ledger, &account, mode)
    }

    /// Attach a code blob to an existing account.
    pub fn set_code(&self, addr: &Address, code: Vec<u8>, mode: ExecMode) -> AppResult<()> {
        let mut ledger = self.ledger.write();
        let mut account = require(&ledger, addr, mode)?;
        account.code = Some(code);
        save(&mut ledger, &account, mode)
    }

    /// Seed a genesis account into both views.
    pub fn put_genesis_account(&self, account: &Account) -> AppResult<()> {
        let mut ledger = self.ledger.write();
        save(&mut ledger, account, ExecMode::Admission)?;
        save(&mut ledger, account, ExecMode::Execution)
    }

    /// Flush the execution view. Returns (state hash, version).
    pub fn commit(&self) -> AppResult<(Hash, u64)> {
        let (hash, version) = self.ledger.write().commit()?;
        info!("[sc-03] committed version {} hash {}", version, short_hex(&hash));
        Ok((hash, version))
    }

    /// Hash of the execution view if it were committed now.
    pub fn working_hash(&self) -> AppResult<Hash> {
        Ok(self.ledger.read().working_hash()?)
    }

    pub fn version(&self) -> u64 {
        self.ledger.read().version()
    }

    /// Read-only controller over the state committed at `height`.
    pub fn immutable_at(&self, height: u64) -> AppResult<ImmutableAccountController> {
        Ok(ImmutableAccountController {
            ledger: self.ledger.read().immutable_at(height)?,
        })
    }

    pub fn close(&self) -> AppResult<()> {
        Ok(self.ledger.write().close()?)
    }
}

/// Historical, read-only account lookups.
pub struct ImmutableAccountController {
    ledger: ImmutableLedger,
}

impl ImmutableAccountController {
    pub fn find_account(&self, addr: &Address) -> AppResult<Option<Account>> {
        Ok(self.ledger.get(addr)?)
    }

    pub fn version(&self) -> u64 {
        self.ledger.version()
    }
}

pub(crate) fn load(ledger: &DualViewLedger, addr: &Address, mode: ExecMode) -> AppResult<Option<Account>> {
    Ok(ledger.get(addr, mode)?)
}

pub(crate) fn require(ledger: &DualViewLedger, addr: &Address, mode: ExecMode) -> AppResult<Account> {
    load(ledger, addr, mode)?.ok_or_else(|| AppError::AccountNotFound(to_hex(addr)))
}

pub(crate) fn save(ledger: &mut DualViewLedger, account: &Account, mode: ExecMode) -> AppResult<()> {
    Ok(ledger.set(&account.address, account, mode)?)
}

pub(crate) fn transfer_locked(
    ledger: &mut DualViewLedger,
    from: &Address,
    to: &Address,
    amount: u128,
    mode: ExecMode,
) -> AppResult<()> {
    let mut sender = require(ledger, from, mode)?;
    sender.sub_balance(amount)?;
    save(ledger, &sender, mode)?;

    let credited = load(ledger, to, mode).and_then(|receiver| {
        let mut receiver = receiver.unwrap_or_else(|| Account::new(*to));
        receiver.add_balance(amount)?;
        save(ledger, &receiver, mode)
    });

    if let Err(e) = credited {
        let mut sender = require(ledger, from, mode)?;
        sender.add_balance(amount)?;
        save(ledger, &sender, mode)?;
        debug!(
            "[sc-03] refunded {} to {} after failed credit: {}",
            amount,
            short_hex(from),
            e
        );
        return Err(e);
    }
    Ok(())
}
