//! # Query Router
//!
//! Read-only, path-routed lookups against a committed ledger version.
//!
//! | Path | Data | Value |
//! |------|------|-------|
//! | `account` | 20-byte address | `Account` |
//! | `stakes` | 20-byte owner | `[Stake]` |
//! | `delegatee` | 20-byte address | `Delegatee` |
//! | `reward` | 20-byte address | `Reward` |
//! | `proposal` | 32-byte proposal hash | `{ state, proposal }` |
//! | `gov_params` | empty | `GovParams` |
//! | `validators` | empty | `[Validator]` |
//!
//! Values are JSON. Height `0` means the latest committed height.

use serde::Serialize;
use sc_05_governance::{GovProposal, ProposalState};
use shared_types::{to_hex, Address, AppError, AppResult, Hash, CODE_OK};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub path: String,
    pub data: Vec<u8>,
    pub height: u64,
}

impl QueryRequest {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            height: 0,
        }
    }

    pub fn at(mut self, height: u64) -> Self {
        self.height = height;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResponse {
    pub code: u32,
    pub log: String,
    pub height: u64,
    pub value: Vec<u8>,
}

impl QueryResponse {
    pub(crate) fn from_result(height: u64, result: AppResult<Vec<u8>>) -> Self {
        match result {
            Ok(value) => Self {
                code: CODE_OK,
                log: String::new(),
                height,
                value,
            },
            Err(e) => Self {
                code: e.code(),
                log: e.to_string(),
                height,
                value: Vec::new(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

#[derive(Serialize)]
pub(crate) struct ProposalView<'a> {
    pub state: ProposalState,
    pub proposal: &'a GovProposal,
}

/// Supported query paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QueryPath {
    Account,
    Stakes,
    Delegatee,
    Reward,
    Proposal,
    GovParams,
    Validators,
}

impl QueryPath {
    pub(crate) fn parse(path: &str) -> AppResult<Self> {
        Ok(match path.trim_matches('/') {
            "account" => Self::Account,
            "stakes" => Self::Stakes,
            "delegatee" => Self::Delegatee,
            "reward" => Self::Reward,
            "proposal" => Self::Proposal,
            "gov_params" => Self::GovParams,
            "validators" => Self::Validators,
            other => return Err(AppError::InvalidQueryPath(other.to_string())),
        })
    }
}

pub(crate) fn address_arg(data: &[u8]) -> AppResult<Address> {
    <[u8; 20]>::try_from(data).map_err(|_| {
        AppError::InvalidQueryData(format!("expected a 20-byte address, got {} bytes", data.len()))
    })
}

pub(crate) fn hash_arg(data: &[u8]) -> AppResult<Hash> {
    <[u8; 32]>::try_from(data).map_err(|_| {
        AppError::InvalidQueryData(format!("expected a 32-byte hash, got {} bytes", data.len()))
    })
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> AppResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| AppError::InvalidState(format!("encode query value: {e}")))
}

pub(crate) fn not_found(what: &str, key: &[u8]) -> AppError {
    AppError::NotFound(format!("{what} {}", to_hex(key)))
}
