//! # Transaction Entities
//!
//! A transaction is immutable once signed. The canonical form hashed for
//! signing is the transaction with an empty `sig` field.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount, Hash};

/// Current transaction format version.
pub const TRX_VERSION: u32 = 1;

/// A versioned, signed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trx {
    pub version: u32,
    pub nonce: u64,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    /// Fee, consumed in full by a successful transaction.
    pub gas: u64,
    pub payload: TrxPayload,
    /// 65 bytes: r (32) || s (32) || recovery id (1). Empty when unsigned.
    pub sig: Vec<u8>,
}

impl Trx {
    /// An unsigned transaction.
    pub fn new(
        from: Address,
        to: Address,
        nonce: u64,
        amount: Amount,
        gas: u64,
        payload: TrxPayload,
    ) -> Self {
        Self {
            version: TRX_VERSION,
            nonce,
            from,
            to,
            amount,
            gas,
            payload,
            sig: Vec::new(),
        }
    }

    /// Transfer `amount` from `from` to `to`.
    pub fn transfer(from: Address, to: Address, nonce: u64, amount: Amount, gas: u64) -> Self {
        Self::new(from, to, nonce, amount, gas, TrxPayload::Transfer)
    }

    pub fn kind(&self) -> TrxKind {
        self.payload.kind()
    }

    /// The same transaction with the signature cleared.
    pub fn unsigned(&self) -> Trx {
        Trx {
            sig: Vec::new(),
            ..self.clone()
        }
    }
}

/// Type-specific payload. A closed set: unknown tags fail to decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrxPayload {
    Transfer,
    /// Stake `amount` on the validator at `to`. Self-staking when `to == from`.
    Staking,
    /// Withdraw the stake created by the staking transaction `tx_hash`.
    Unstaking { tx_hash: Hash },
    Proposal(ProposalPayload),
    /// Vote `choice` on the proposal created by transaction `tx_hash`.
    Voting { tx_hash: Hash, choice: i32 },
}

impl TrxPayload {
    pub fn kind(&self) -> TrxKind {
        match self {
            TrxPayload::Transfer => TrxKind::Transfer,
            TrxPayload::Staking => TrxKind::Staking,
            TrxPayload::Unstaking { .. } => TrxKind::Unstaking,
            TrxPayload::Proposal(_) => TrxKind::Proposal,
            TrxPayload::Voting { .. } => TrxKind::Voting,
        }
    }
}

/// Payload of a governance proposal transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub message: String,
    pub start_voting_height: u64,
    pub voting_period_blocks: u64,
    pub kind: ProposalKind,
    /// One entry per vote option. For `ProposalKind::GovParams` each entry is
    /// a JSON-encoded (partial) parameter set.
    pub options: Vec<Vec<u8>>,
}

/// What a proposal changes when it is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    GovParams,
}

/// Payload discriminant, used for dispatch and event attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrxKind {
    Transfer,
    Staking,
    Unstaking,
    Proposal,
    Voting,
}

impl TrxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrxKind::Transfer => "transfer",
            TrxKind::Staking => "staking",
            TrxKind::Unstaking => "unstaking",
            TrxKind::Proposal => "proposal",
            TrxKind::Voting => "voting",
        }
    }
}
