//! Stake side of transaction execution: staking and unstaking.
//!
//! The account controller debits the staked amount; this handler records the
//! stake. Unstaking removes the stake at once and freezes its amount until
//! `height + lazy_unstaking_blocks`, when block end refunds it.

use crate::controller::StakeController;
use crate::domain::{keys, Delegatee, Stake};
use sc_02_transaction::{TrxContext, TrxHandler, TrxPayload};
use shared_types::{short_hex, to_hex, AppError, AppResult, Hash};
use tracing::debug;

impl TrxHandler for StakeController {
    fn validate_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        match &ctx.trx.payload {
            TrxPayload::Staking => {
                stake_power(ctx)?;
                if ctx.trx.to != ctx.trx.from && self.find_delegatee(&ctx.trx.to, ctx.mode)?.is_none() {
                    return Err(AppError::NotFound(format!("delegatee {}", to_hex(&ctx.trx.to))));
                }
                Ok(())
            }
            TrxPayload::Unstaking { tx_hash } => {
                owned_stake(self, ctx, tx_hash)?;
                Ok(())
            }
            _ => Err(AppError::UnknownTrxType),
        }
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        match ctx.trx.payload {
            TrxPayload::Staking => execute_staking(self, ctx),
            TrxPayload::Unstaking { tx_hash } => execute_unstaking(self, ctx, tx_hash),
            _ => Err(AppError::UnknownTrxType),
        }
    }
}

fn stake_power(ctx: &TrxContext) -> AppResult<u64> {
    let per_power = ctx.params.amount_per_power;
    if per_power == 0 {
        return Err(AppError::InvalidState("amount_per_power is zero".to_string()));
    }
    let power = u64::try_from(ctx.trx.amount / per_power).map_err(|_| AppError::Overflow("stake power"))?;
    if power == 0 {
        return Err(AppError::InvalidAmount);
    }
    Ok(power)
}

fn owned_stake(ctrl: &StakeController, ctx: &TrxContext, tx_hash: &Hash) -> AppResult<Stake> {
    let stake = ctrl
        .find_stake(tx_hash, ctx.mode)?
        .ok_or_else(|| AppError::NotFound(format!("stake {}", to_hex(tx_hash))))?;
    if stake.owner != ctx.trx.from {
        return Err(AppError::InvalidPayload(format!(
            "stake {} is not owned by the sender",
            short_hex(tx_hash)
        )));
    }
    Ok(stake)
}

fn execute_staking(ctrl: &StakeController, ctx: &mut TrxContext) -> AppResult<()> {
    let power = stake_power(ctx)?;
    let trx = &ctx.trx;
    let mode = ctx.mode;
    let mut ledger = ctrl.ledger.write();

    let key = keys::delegatee(&trx.to);
    let mut delegatee = match ledger.get::<Delegatee>(&key, mode)? {
        Some(d) => d,
        None if trx.to == trx.from => Delegatee::new(trx.to, ctx.sender_pubkey.clone()),
        None => return Err(AppError::NotFound(format!("delegatee {}", to_hex(&trx.to)))),
    };
    if ledger.contains(&keys::stake(&ctx.tx_hash), mode)? {
        return Err(AppError::DuplicateKey(format!("stake {}", to_hex(&ctx.tx_hash))));
    }

    let stake = Stake {
        owner: trx.from,
        to: trx.to,
        amount: trx.amount,
        power,
        tx_hash: ctx.tx_hash,
        start_height: ctx.height,
        refund_height: 0,
    };
    delegatee.add_stake(&stake);

    ledger.set(&keys::stake(&stake.tx_hash), &stake, mode)?;
    ledger.set(&key, &delegatee, mode)?;

    debug!(
        "[sc-04] {} staked {} ({} power) on {} ({})",
        short_hex(&trx.from),
        trx.amount,
        power,
        short_hex(&trx.to),
        mode.label()
    );
    Ok(())
}

fn execute_unstaking(ctrl: &StakeController, ctx: &mut TrxContext, tx_hash: Hash) -> AppResult<()> {
    let mut stake = owned_stake(ctrl, ctx, &tx_hash)?;
    let mode = ctx.mode;
    let mut ledger = ctrl.ledger.write();

    let key = keys::delegatee(&stake.to);
    if let Some(mut delegatee) = ledger.get::<Delegatee>(&key, mode)? {
        delegatee.remove_power(stake.power, stake.is_self_stake());
        if delegatee.total_power == 0 {
            ledger.delete(&key, mode);
        } else {
            ledger.set(&key, &delegatee, mode)?;
        }
    }

    stake.refund_height = ctx
        .height
        .checked_add(ctx.params.lazy_unstaking_blocks)
        .ok_or(AppError::Overflow("refund height"))?;
    ledger.delete(&keys::stake(&tx_hash), mode);
    ledger.set(&keys::frozen(stake.refund_height, &tx_hash), &stake, mode)?;

    debug!(
        "[sc-04] {} unstaked {}, refund at {} ({})",
        short_hex(&stake.owner),
        stake.amount,
        stake.refund_height,
        mode.label()
    );
    Ok(())
}
