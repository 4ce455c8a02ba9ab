//! Account side of transaction execution.
//!
//! Every transaction pays its gas from the sender and advances the sender's
//! nonce, so this handler takes part in every transaction type:
//!
//! | Type | Debit from sender | Credit |
//! |------|-------------------|--------|
//! | transfer | amount + gas | amount to receiver |
//! | staking | amount + gas | (locked by the stake controller) |
//! | others | gas | none |

use crate::controller::{require, save, transfer_locked, AccountController};
use sc_02_transaction::{TrxContext, TrxHandler, TrxPayload};
use shared_types::{short_hex, Account, AppError, AppResult};
use tracing::debug;

impl TrxHandler for AccountController {
    fn validate_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        let minimum = ctx.params.min_trx_gas;
        if ctx.trx.gas < minimum {
            return Err(AppError::InvalidGas {
                gas: ctx.trx.gas,
                minimum,
            });
        }
        if ctx.sender.balance < ctx.needed_funds {
            return Err(AppError::InsufficientFunds {
                required: ctx.needed_funds,
                available: ctx.sender.balance,
            });
        }
        Ok(())
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        let trx = &ctx.trx;
        let mode = ctx.mode;
        let mut ledger = self.ledger.write();

        // Re-read under the lock: the context copy may be stale.
        let mut sender = require(&ledger, &trx.from, mode)?;
        if sender.nonce + 1 != trx.nonce {
            return Err(AppError::InvalidNonce {
                expected: sender.nonce + 1,
                actual: trx.nonce,
            });
        }

        let debit = sender_debit(ctx);
        sender.sub_balance(debit)?;
        sender.bump_nonce();
        save(&mut ledger, &sender, mode)?;

        if let TrxPayload::Transfer = trx.payload {
            if let Err(e) = transfer_locked(&mut ledger, &trx.from, &trx.to, trx.amount, mode) {
                // Undo the gas debit and the nonce bump.
                let mut sender = require(&ledger, &trx.from, mode)?;
                sender.add_balance(debit)?;
                sender.nonce -= 1;
                save(&mut ledger, &sender, mode)?;
                return Err(e);
            }
        }

        ctx.sender = require(&ledger, &trx.from, mode)?;
        ctx.gas_used = trx.gas;

        debug!(
            "[sc-03] {} from {} applied, gas {} ({})",
            trx.kind().as_str(),
            short_hex(&trx.from),
            trx.gas,
            mode.label()
        );
        Ok(())
    }

    fn revert_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        let trx = &ctx.trx;
        let mode = ctx.mode;
        let mut ledger = self.ledger.write();

        if let TrxPayload::Transfer = trx.payload {
            transfer_locked(&mut ledger, &trx.to, &trx.from, trx.amount, mode)?;
            if ctx.receiver.is_none() && require(&ledger, &trx.to, mode)? == Account::new(trx.to) {
                ledger.delete(&trx.to, mode);
            }
        }

        let mut sender = require(&ledger, &trx.from, mode)?;
        if sender.nonce != trx.nonce {
            return Err(AppError::InvalidState(format!(
                "cannot revert nonce {} of {}: account is at {}",
                trx.nonce,
                short_hex(&trx.from),
                sender.nonce
            )));
        }
        sender.add_balance(sender_debit(ctx))?;
        sender.nonce -= 1;
        save(&mut ledger, &sender, mode)?;

        ctx.sender = sender;
        ctx.gas_used = 0;

        debug!(
            "[sc-03] {} from {} reverted, nonce back to {} ({})",
            trx.kind().as_str(),
            short_hex(&trx.from),
            ctx.sender.nonce,
            mode.label()
        );
        Ok(())
    }
}

/// What the sender pays up front: the staked amount plus gas for staking,
/// gas alone otherwise. Transfer amounts move separately.
fn sender_debit(ctx: &TrxContext) -> u128 {
    match ctx.trx.payload {
        TrxPayload::Staking => ctx.needed_funds,
        _ => u128::from(ctx.trx.gas),
    }
}
