//! # Transaction Context
//!
//! `TrxContext` is the per-transaction execution frame: created by
//! `TrxContextBuilder::build`, passed through every handler, dropped when the
//! transaction completes. It is never persisted.

use crate::domain::codec::{decode_trx, trx_hash};
use crate::domain::crypto::recover_signer;
use crate::domain::entities::{Trx, TrxKind, TrxPayload};
use crate::ports::{ContextResolver, TrxHandlers};
use shared_types::{short_hex, to_hex, Account, AppError, AppResult, ExecMode, GovParams, Hash};
use std::sync::Arc;
use tracing::debug;

/// Execution frame of one transaction.
pub struct TrxContext {
    pub trx: Trx,
    /// SHA-256 of the raw wire bytes.
    pub tx_hash: Hash,
    /// Height of the block the transaction is checked against or included in.
    pub height: u64,
    pub mode: ExecMode,
    /// Sender as resolved at build time, nonce already advanced.
    pub sender: Account,
    /// Receiver as resolved at build time. `None` when it does not exist yet.
    pub receiver: Option<Account>,
    /// Compressed sender public key. Empty in admission mode.
    pub sender_pubkey: Vec<u8>,
    /// amount + gas.
    pub needed_funds: u128,
    pub gas_used: u64,
    /// Vote state overwritten by a voting transaction, for revert.
    pub replaced_vote: Option<ReplacedVote>,
    /// Governance parameters snapshotted at build time.
    pub params: GovParams,
    pub handlers: TrxHandlers,
}

/// A voter's choice and the proposal's majority option before a vote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplacedVote {
    pub choice: Option<usize>,
    pub major_option: Option<usize>,
}

impl TrxContext {
    pub fn kind(&self) -> TrxKind {
        self.trx.kind()
    }

    pub fn is_execution(&self) -> bool {
        self.mode.is_execution()
    }
}

/// Builds `TrxContext`s from raw transaction bytes.
#[derive(Clone)]
pub struct TrxContextBuilder {
    resolver: Arc<dyn ContextResolver>,
}

impl TrxContextBuilder {
    pub fn new(resolver: Arc<dyn ContextResolver>) -> Self {
        Self { resolver }
    }

    /// Decode, check and resolve a transaction.
    ///
    /// Checks run in order: decode, amount, sender lookup, nonce, funds and,
    /// in execution mode only, signature recovery. The first failure wins.
    pub fn build(&self, raw: &[u8], height: u64, mode: ExecMode) -> AppResult<TrxContext> {
        let trx = decode_trx(raw)?;
        check_amount(&trx)?;

        let mut sender = self
            .resolver
            .find_account(&trx.from, mode)?
            .ok_or_else(|| AppError::AccountNotFound(to_hex(&trx.from)))?;

        let expected = sender.nonce + 1;
        if trx.nonce != expected {
            return Err(AppError::InvalidNonce {
                expected,
                actual: trx.nonce,
            });
        }
        sender.bump_nonce();

        let needed_funds = trx
            .amount
            .checked_add(u128::from(trx.gas))
            .ok_or(AppError::Overflow("amount + gas"))?;
        if sender.balance < needed_funds {
            return Err(AppError::InsufficientFunds {
                required: needed_funds,
                available: sender.balance,
            });
        }

        let sender_pubkey = match mode {
            ExecMode::Execution => {
                let (signer, pubkey) = recover_signer(&trx)?;
                if signer != trx.from {
                    return Err(AppError::InvalidSignature);
                }
                pubkey
            }
            ExecMode::Admission => {
                if trx.sig.len() != 65 {
                    return Err(AppError::InvalidSignature);
                }
                Vec::new()
            }
        };

        let receiver = self.resolver.find_account(&trx.to, mode)?;
        let params = self.resolver.gov_params(mode)?;
        let tx_hash = trx_hash(raw);

        debug!(
            "[sc-02] built {} context {} from {} nonce {} ({})",
            trx.kind().as_str(),
            short_hex(&tx_hash),
            short_hex(&trx.from),
            trx.nonce,
            mode.label()
        );

        Ok(TrxContext {
            trx,
            tx_hash,
            height,
            mode,
            sender,
            receiver,
            sender_pubkey,
            needed_funds,
            gas_used: 0,
            replaced_vote: None,
            params,
            handlers: self.resolver.handlers(),
        })
    }
}

/// Value-moving payloads need a positive amount, the others none at all.
fn check_amount(trx: &Trx) -> AppResult<()> {
    let ok = match trx.payload {
        TrxPayload::Transfer | TrxPayload::Staking => trx.amount > 0,
        TrxPayload::Unstaking { .. } | TrxPayload::Proposal(_) | TrxPayload::Voting { .. } => {
            trx.amount == 0
        }
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::InvalidAmount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codec::encode_trx;
    use crate::test_utils::{MockResolver, TestWallet};

    fn setup(balance: u128) -> (TestWallet, Arc<MockResolver>, TrxContextBuilder) {
        let wallet = TestWallet::from_seed(1);
        let resolver = Arc::new(MockResolver::new());
        resolver.put(Account::new(wallet.address).with_balance(balance));
        let builder = TrxContextBuilder::new(resolver.clone());
        (wallet, resolver, builder)
    }

    #[test]
    fn test_build_transfer_in_execution_mode() {
        let (wallet, _, builder) = setup(1_000);
        let raw = wallet.signed_transfer([7u8; 20], 1, 100, 10);

        let ctx = builder.build(&raw, 5, ExecMode::Execution).unwrap();

        assert_eq!(ctx.tx_hash, trx_hash(&raw));
        assert_eq!(ctx.height, 5);
        assert_eq!(ctx.sender.nonce, 1);
        assert_eq!(ctx.needed_funds, 110);
        assert_eq!(ctx.gas_used, 0);
        assert_eq!(ctx.sender_pubkey.len(), 33);
        assert!(ctx.receiver.is_none());
    }

    #[test]
    fn test_build_rejects_malformed_bytes() {
        let (_, _, builder) = setup(1_000);
        let err = builder.build(&[1, 2, 3], 1, ExecMode::Admission).err().unwrap();
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn test_build_rejects_zero_transfer_amount() {
        let (wallet, _, builder) = setup(1_000);
        let raw = wallet.signed_transfer([7u8; 20], 1, 0, 10);
        let err = builder.build(&raw, 1, ExecMode::Admission).err().unwrap();
        assert_eq!(err, AppError::InvalidAmount);
    }

    #[test]
    fn test_build_rejects_amount_on_voting() {
        let (wallet, _, builder) = setup(1_000);
        let mut trx = Trx::new(
            wallet.address,
            [0u8; 20],
            1,
            5,
            10,
            TrxPayload::Voting {
                tx_hash: [1u8; 32],
                choice: 0,
            },
        );
        let raw = wallet.sign(&mut trx);
        let err = builder.build(&raw, 1, ExecMode::Admission).err().unwrap();
        assert_eq!(err, AppError::InvalidAmount);
    }

    #[test]
    fn test_build_rejects_unknown_sender() {
        let (_, _, builder) = setup(1_000);
        let stranger = TestWallet::from_seed(99);
        let raw = stranger.signed_transfer([7u8; 20], 1, 1, 10);
        let err = builder.build(&raw, 1, ExecMode::Admission).err().unwrap();
        assert!(matches!(err, AppError::AccountNotFound(_)));
    }

    #[test]
    fn test_build_rejects_wrong_nonce_in_both_modes() {
        let (wallet, _, builder) = setup(1_000);
        for nonce in [0, 2, 7] {
            let raw = wallet.signed_transfer([7u8; 20], nonce, 1, 10);
            for mode in [ExecMode::Admission, ExecMode::Execution] {
                let err = builder.build(&raw, 1, mode).err().unwrap();
                assert_eq!(
                    err,
                    AppError::InvalidNonce {
                        expected: 1,
                        actual: nonce
                    }
                );
            }
        }
    }

    #[test]
    fn test_build_rejects_insufficient_funds() {
        let (wallet, _, builder) = setup(100);
        let raw = wallet.signed_transfer([7u8; 20], 1, 95, 10);
        let err = builder.build(&raw, 1, ExecMode::Admission).err().unwrap();
        assert_eq!(
            err,
            AppError::InsufficientFunds {
                required: 105,
                available: 100
            }
        );
    }

    #[test]
    fn test_execution_mode_rejects_foreign_signature() {
        let (wallet, _, builder) = setup(1_000);
        let forger = TestWallet::from_seed(2);

        // Claims to be `wallet` but is signed by `forger`.
        let mut trx = Trx::transfer(wallet.address, [7u8; 20], 1, 1, 10);
        let raw = forger.sign(&mut trx);

        assert!(builder.build(&raw, 1, ExecMode::Admission).is_ok());
        let err = builder.build(&raw, 1, ExecMode::Execution).err().unwrap();
        assert_eq!(err, AppError::InvalidSignature);
    }

    #[test]
    fn test_admission_mode_requires_signature_bytes() {
        let (wallet, _, builder) = setup(1_000);
        let trx = Trx::transfer(wallet.address, [7u8; 20], 1, 1, 10);
        let raw = encode_trx(&trx).unwrap();
        let err = builder.build(&raw, 1, ExecMode::Admission).err().unwrap();
        assert_eq!(err, AppError::InvalidSignature);
    }

    #[test]
    fn test_build_resolves_existing_receiver() {
        let (wallet, resolver, builder) = setup(1_000);
        resolver.put(Account::new([7u8; 20]).with_balance(3));
        let raw = wallet.signed_transfer([7u8; 20], 1, 1, 10);

        let ctx = builder.build(&raw, 1, ExecMode::Admission).unwrap();
        assert_eq!(ctx.receiver.map(|a| a.balance), Some(3));
        assert!(ctx.sender_pubkey.is_empty());
    }
}
