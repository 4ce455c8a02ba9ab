//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Hash`
//! - **Views**: `ExecMode`
//! - **Accounts**: `Account`

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// A 32-byte hash (transaction hash, state hash, app hash).
pub type Hash = [u8; 32];

/// A 20-byte account address (last 20 bytes of keccak256(uncompressed pubkey)).
pub type Address = [u8; 20];

/// Token amount in base units.
pub type Amount = u128;

/// The all-zero address. Never a valid signer.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// The all-zero hash.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Selects which view of a dual-view ledger an operation targets.
///
/// - `Admission`: the speculative view used by pre-consensus checks. It may be
///   discarded at any time and is reset to the committed state on commit.
/// - `Execution`: the authoritative view mutated during in-block delivery. It
///   becomes the committed state on commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecMode {
    Admission,
    Execution,
}

impl ExecMode {
    /// Returns true for the authoritative (in-block) view.
    pub fn is_execution(self) -> bool {
        matches!(self, ExecMode::Execution)
    }

    /// Short label for logs.
    pub fn label(self) -> &'static str {
        match self {
            ExecMode::Admission => "admission",
            ExecMode::Execution => "execution",
        }
    }
}

/// An account owned by the account controller.
///
/// Accounts are permanent once created: nothing in the node ever deletes one.
/// The balance is unsigned, so it can never go negative; every debit goes
/// through [`Account::sub_balance`], which fails instead of wrapping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Display name.
    pub name: String,
    /// Document URL attached to the account.
    pub doc_url: String,
    /// Number of transactions admitted from this account.
    pub nonce: u64,
    pub balance: Amount,
    /// Contract code. Stored, never executed here.
    pub code: Option<Vec<u8>>,
}

impl Account {
    /// A fresh zero-balance account.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Builder method to set the balance.
    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }

    /// Builder method to set the nonce.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Credit `amount`. Fails on overflow and leaves the balance untouched.
    pub fn add_balance(&mut self, amount: Amount) -> AppResult<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(AppError::Overflow("account balance"))?;
        Ok(())
    }

    /// Debit `amount`. Fails when the balance is short and leaves it untouched.
    pub fn sub_balance(&mut self, amount: Amount) -> AppResult<()> {
        if self.balance < amount {
            return Err(AppError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Advance the nonce by exactly one.
    pub fn bump_nonce(&mut self) {
        self.nonce += 1;
    }
}

/// Lowercase hex without prefix, for logs and event attributes.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// First four bytes as hex, for compact log lines.
pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(4)])
}
