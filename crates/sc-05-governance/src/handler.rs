//! Governance side of transaction execution: proposals and votes.

use crate::controller::{find_in, GovernanceController};
use crate::domain::{keys, GovProposal, ProposalState};
use sc_02_transaction::{ProposalPayload, ReplacedVote, TrxContext, TrxHandler, TrxPayload};
use shared_types::{short_hex, to_hex, AppError, AppResult, GovParams, Hash};
use tracing::debug;

impl TrxHandler for GovernanceController {
    fn validate_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        match &ctx.trx.payload {
            TrxPayload::Proposal(payload) => self.validate_proposal(ctx, payload),
            TrxPayload::Voting { tx_hash, choice } => {
                self.checked_proposal(ctx, tx_hash, *choice)?;
                Ok(())
            }
            _ => Err(AppError::UnknownTrxType),
        }
    }

    fn execute_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        match &ctx.trx.payload {
            TrxPayload::Proposal(payload) => self.execute_proposal(ctx, payload),
            TrxPayload::Voting { tx_hash, choice } => {
                let (tx_hash, choice) = (*tx_hash, *choice);
                self.execute_voting(ctx, &tx_hash, choice)
            }
            _ => Err(AppError::UnknownTrxType),
        }
    }

    fn revert_trx(&self, ctx: &mut TrxContext) -> AppResult<()> {
        match &ctx.trx.payload {
            TrxPayload::Proposal(_) => {
                self.ledger.write().delete(&keys::active(&ctx.tx_hash), ctx.mode);
                debug!(
                    "[sc-05] proposal {} reverted ({})",
                    short_hex(&ctx.tx_hash),
                    ctx.mode.label()
                );
                Ok(())
            }
            TrxPayload::Voting { tx_hash, .. } => {
                let Some(replaced) = ctx.replaced_vote.take() else {
                    return Ok(());
                };
                let mut ledger = self.ledger.write();
                let key = keys::active(tx_hash);
                let Some(mut proposal) = ledger.get::<GovProposal>(&key, ctx.mode)? else {
                    return Ok(());
                };
                proposal.undo_vote(&ctx.trx.from, replaced.choice, replaced.major_option)?;
                ledger.set(&key, &proposal, ctx.mode)?;
                debug!(
                    "[sc-05] vote of {} on {} reverted ({})",
                    short_hex(&ctx.trx.from),
                    short_hex(tx_hash),
                    ctx.mode.label()
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl GovernanceController {
    fn validate_proposal(&self, ctx: &TrxContext, payload: &ProposalPayload) -> AppResult<()> {
        let params = &ctx.params;

        if payload.message.len() > self.max_message_len {
            return Err(AppError::InvalidPayload(format!(
                "message length {} exceeds {}",
                payload.message.len(),
                self.max_message_len
            )));
        }
        if payload.options.is_empty() {
            return Err(AppError::InvalidPayload("no vote options".to_string()));
        }
        for option in &payload.options {
            params.merged(&GovParams::from_json(option)?).validate()?;
        }

        if payload.start_voting_height <= ctx.height {
            return Err(AppError::InvalidPayload(format!(
                "start voting height {} is not after height {}",
                payload.start_voting_height, ctx.height
            )));
        }
        let period = payload.voting_period_blocks;
        if period < params.min_voting_period_blocks || period > params.max_voting_period_blocks {
            return Err(AppError::InvalidPayload(format!(
                "voting period {} outside [{}, {}]",
                period, params.min_voting_period_blocks, params.max_voting_period_blocks
            )));
        }
        payload
            .start_voting_height
            .checked_add(period)
            .and_then(|end| end.checked_add(params.lazy_apply_blocks))
            .ok_or(AppError::Overflow("proposal heights"))?;

        if self.powers.power_of(&ctx.trx.from, ctx.mode)? == 0 {
            return Err(AppError::NotValidator);
        }
        if self.find_proposal(&ctx.tx_hash, ctx.mode)?.is_some() {
            return Err(duplicate(&ctx.tx_hash));
        }
        Ok(())
    }

    fn execute_proposal(&self, ctx: &TrxContext, payload: &ProposalPayload) -> AppResult<()> {
        // Snapshot voters before taking the governance lock.
        let max_count = usize::try_from(ctx.params.max_validator_count).unwrap_or(usize::MAX);
        let voters = self.powers.validator_powers(max_count, ctx.mode)?;
        if voters.is_empty() {
            return Err(AppError::NotValidator);
        }

        let proposal = GovProposal::new(
            ctx.tx_hash,
            ctx.trx.from,
            payload,
            voters,
            ctx.params.lazy_apply_blocks,
        )?;

        let mut ledger = self.ledger.write();
        if find_in(&ledger, &ctx.tx_hash, ctx.mode)?.is_some() {
            return Err(duplicate(&ctx.tx_hash));
        }
        ledger.set(&keys::active(&proposal.tx_hash), &proposal, ctx.mode)?;

        debug!(
            "[sc-05] proposal {} created: voting [{}, {}), apply at {}, {} voters, power {} ({})",
            short_hex(&proposal.tx_hash),
            proposal.start_voting_height,
            proposal.end_voting_height,
            proposal.apply_height,
            proposal.voters.len(),
            proposal.total_voting_power,
            ctx.mode.label()
        );
        Ok(())
    }

    /// The active proposal `tx_hash`, after checking the vote against it.
    fn checked_proposal(&self, ctx: &TrxContext, tx_hash: &Hash, choice: i32) -> AppResult<GovProposal> {
        let proposal = match self.find_proposal(tx_hash, ctx.mode)? {
            Some((proposal, ProposalState::Active)) => proposal,
            Some((proposal, ProposalState::Frozen)) => {
                return Err(AppError::NotVotingPeriod {
                    height: ctx.height,
                    start: proposal.start_voting_height,
                    end: proposal.end_voting_height,
                })
            }
            None => return Err(AppError::NotFound(format!("proposal {}", to_hex(tx_hash)))),
        };
        proposal.check_vote(&ctx.trx.from, choice, ctx.height)?;
        Ok(proposal)
    }

    fn execute_voting(&self, ctx: &mut TrxContext, tx_hash: &Hash, choice: i32) -> AppResult<()> {
        let mut ledger = self.ledger.write();
        let key = keys::active(tx_hash);
        let mut proposal: GovProposal = ledger
            .get(&key, ctx.mode)?
            .ok_or_else(|| AppError::NotFound(format!("proposal {}", to_hex(tx_hash))))?;

        proposal.check_vote(&ctx.trx.from, choice, ctx.height)?;
        let replaced = ReplacedVote {
            choice: proposal.find_voter(&ctx.trx.from).and_then(|v| v.choice),
            major_option: proposal.major_option,
        };
        proposal.do_vote(&ctx.trx.from, choice)?;
        proposal.update_major_option();
        ledger.set(&key, &proposal, ctx.mode)?;
        ctx.replaced_vote = Some(replaced);

        debug!(
            "[sc-05] {} voted {} on {} ({})",
            short_hex(&ctx.trx.from),
            choice,
            short_hex(tx_hash),
            ctx.mode.label()
        );
        Ok(())
    }
}

fn duplicate(tx_hash: &Hash) -> AppError {
    AppError::DuplicateKey(format!("proposal {}", to_hex(tx_hash)))
}
