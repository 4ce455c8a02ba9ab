//! # Governance Controller
//!
//! Owns the protocol parameters and the proposal registry. Proposals live in
//! two partitions of the same ledger: `active` (voting open or pending) and
//! `frozen` (voting closed, waiting for the lazy apply height).
//!
//! Voting power comes from the injected `ValidatorPower` port. It is always
//! queried before this controller takes its own lock.

use crate::domain::{keys, GovProposal, ProposalState, VoteOption};
use parking_lot::RwLock;
use sc_01_ledger::{DualViewLedger, ImmutableLedger, VersionedStore};
use sc_02_transaction::{ProposalKind, ValidatorPower};
use shared_types::{short_hex, AppResult, ExecMode, GovParams, Hash, Address};
use std::sync::Arc;
use tracing::{info, warn};

/// Proposals that changed partition during one block end.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GovBlockEvents {
    pub frozen: Vec<Hash>,
    pub applied: Vec<Hash>,
}

/// The governance controller.
pub struct GovernanceController {
    pub(crate) ledger: RwLock<DualViewLedger>,
    pub(crate) powers: Arc<dyn ValidatorPower>,
    pub(crate) max_message_len: usize,
}

impl GovernanceController {
    pub fn new(
        store: Box<dyn VersionedStore>,
        powers: Arc<dyn ValidatorPower>,
        max_message_len: usize,
    ) -> Self {
        Self {
            ledger: RwLock::new(DualViewLedger::new("gov", store)),
            powers,
            max_message_len,
        }
    }

    /// Current parameters. All zero before genesis.
    pub fn params(&self, mode: ExecMode) -> AppResult<GovParams> {
        Ok(self
            .ledger
            .read()
            .get(keys::PARAMS, mode)?
            .unwrap_or_default())
    }

    /// Seed the genesis parameters into both views.
    pub fn set_genesis_params(&self, params: &GovParams) -> AppResult<()> {
        params.validate()?;
        let mut ledger = self.ledger.write();
        ledger.set(keys::PARAMS, params, ExecMode::Admission)?;
        ledger.set(keys::PARAMS, params, ExecMode::Execution)?;
        Ok(())
    }

    /// A proposal and the partition it lives in.
    pub fn find_proposal(
        &self,
        tx_hash: &Hash,
        mode: ExecMode,
    ) -> AppResult<Option<(GovProposal, ProposalState)>> {
        let ledger = self.ledger.read();
        find_in(&ledger, tx_hash, mode)
    }

    pub fn active_proposals(&self, mode: ExecMode) -> AppResult<Vec<GovProposal>> {
        let ledger = self.ledger.read();
        scan(&ledger, keys::ACTIVE, mode)
    }

    pub fn frozen_proposals(&self, mode: ExecMode) -> AppResult<Vec<GovProposal>> {
        let ledger = self.ledger.read();
        scan(&ledger, keys::FROZEN, mode)
    }

    /// Recount an active proposal and return its majority option, if any.
    pub fn update_major_option(&self, tx_hash: &Hash, mode: ExecMode) -> AppResult<Option<VoteOption>> {
        let mut ledger = self.ledger.write();
        let key = keys::active(tx_hash);
        let Some(mut proposal) = ledger.get::<GovProposal>(&key, mode)? else {
            return Ok(match find_in(&ledger, tx_hash, mode)? {
                Some((frozen, _)) => frozen.major_option().cloned(),
                None => None,
            });
        };

        let before = proposal.major_option;
        proposal.update_major_option();
        if proposal.major_option != before {
            ledger.set(&key, &proposal, mode)?;
        }
        Ok(proposal.major_option().cloned())
    }

    /// Block-end processing in the execution view.
    ///
    /// Recounts every active proposal, freezes those whose voting window has
    /// closed, and applies and deletes frozen proposals that reached their
    /// apply height. Running it twice at one height changes nothing.
    pub fn end_block(&self, height: u64) -> AppResult<GovBlockEvents> {
        let mode = ExecMode::Execution;
        let mut ledger = self.ledger.write();
        let mut events = GovBlockEvents::default();

        for mut proposal in scan(&ledger, keys::ACTIVE, mode)? {
            let before = proposal.major_option;
            proposal.update_major_option();
            let key = keys::active(&proposal.tx_hash);
            if height > proposal.end_voting_height {
                ledger.delete(&key, mode);
                ledger.set(&keys::frozen(&proposal.tx_hash), &proposal, mode)?;
                info!(
                    "[sc-05] proposal {} frozen at height {} (majority {:?})",
                    short_hex(&proposal.tx_hash),
                    height,
                    proposal.major_option
                );
                events.frozen.push(proposal.tx_hash);
            } else if proposal.major_option != before {
                ledger.set(&key, &proposal, mode)?;
            }
        }

        for proposal in scan(&ledger, keys::FROZEN, mode)? {
            match proposal.check_apply_height(height) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => warn!(
                    "[sc-05] proposal {} applied late: {}",
                    short_hex(&proposal.tx_hash),
                    e
                ),
            }
            apply_proposal(&mut ledger, &proposal, mode)?;
            ledger.delete(&keys::frozen(&proposal.tx_hash), mode);
            events.applied.push(proposal.tx_hash);
        }

        Ok(events)
    }

    /// Slash `slash_ratio` percent of `addr`'s power in every proposal it
    /// votes in. Returns the total power removed.
    pub fn do_punish(&self, addr: &Address, slash_ratio: u64) -> AppResult<u64> {
        let mode = ExecMode::Execution;
        let mut ledger = self.ledger.write();
        let mut slashed_total = 0u64;

        for (prefix, key_of) in [
            (keys::ACTIVE, keys::active as fn(&Hash) -> Vec<u8>),
            (keys::FROZEN, keys::frozen as fn(&Hash) -> Vec<u8>),
        ] {
            for mut proposal in scan(&ledger, prefix, mode)? {
                let slashed = proposal.punish(addr, slash_ratio);
                if slashed > 0 {
                    ledger.set(&key_of(&proposal.tx_hash), &proposal, mode)?;
                    slashed_total = slashed_total.saturating_add(slashed);
                }
            }
        }

        if slashed_total > 0 {
            info!(
                "[sc-05] punished {}: {} voting power slashed",
                short_hex(addr),
                slashed_total
            );
        }
        Ok(slashed_total)
    }

    pub fn commit(&self) -> AppResult<(Hash, u64)> {
        let (hash, version) = self.ledger.write().commit()?;
        info!("[sc-05] committed version {} hash {}", version, short_hex(&hash));
        Ok((hash, version))
    }

    pub fn working_hash(&self) -> AppResult<Hash> {
        Ok(self.ledger.read().working_hash()?)
    }

    pub fn version(&self) -> u64 {
        self.ledger.read().version()
    }

    pub fn immutable_at(&self, height: u64) -> AppResult<ImmutableGovController> {
        Ok(ImmutableGovController {
            ledger: self.ledger.read().immutable_at(height)?,
        })
    }

    pub fn close(&self) -> AppResult<()> {
        Ok(self.ledger.write().close()?)
    }
}

/// Historical, read-only governance lookups.
pub struct ImmutableGovController {
    ledger: ImmutableLedger,
}

impl ImmutableGovController {
    pub fn params(&self) -> AppResult<GovParams> {
        Ok(self.ledger.get(keys::PARAMS)?.unwrap_or_default())
    }

    pub fn find_proposal(&self, tx_hash: &Hash) -> AppResult<Option<(GovProposal, ProposalState)>> {
        if let Some(p) = self.ledger.get(&keys::active(tx_hash))? {
            return Ok(Some((p, ProposalState::Active)));
        }
        Ok(self
            .ledger
            .get(&keys::frozen(tx_hash))?
            .map(|p| (p, ProposalState::Frozen)))
    }

    pub fn version(&self) -> u64 {
        self.ledger.version()
    }
}

pub(crate) fn find_in(
    ledger: &DualViewLedger,
    tx_hash: &Hash,
    mode: ExecMode,
) -> AppResult<Option<(GovProposal, ProposalState)>> {
    if let Some(p) = ledger.get(&keys::active(tx_hash), mode)? {
        return Ok(Some((p, ProposalState::Active)));
    }
    Ok(ledger
        .get(&keys::frozen(tx_hash), mode)?
        .map(|p| (p, ProposalState::Frozen)))
}

fn scan(ledger: &DualViewLedger, prefix: u8, mode: ExecMode) -> AppResult<Vec<GovProposal>> {
    Ok(ledger
        .scan_prefix::<GovProposal>(&[prefix], mode)?
        .into_iter()
        .map(|(_, p)| p)
        .collect())
}

/// Merge the majority option into the current parameters. A proposal that
/// closed without a majority, or whose option no longer yields a valid
/// parameter set, is dropped without effect.
fn apply_proposal(ledger: &mut DualViewLedger, proposal: &GovProposal, mode: ExecMode) -> AppResult<()> {
    let Some(option) = proposal.major_option() else {
        info!(
            "[sc-05] proposal {} closed without majority",
            short_hex(&proposal.tx_hash)
        );
        return Ok(());
    };

    match proposal.kind {
        ProposalKind::GovParams => {
            let current: GovParams = ledger.get(keys::PARAMS, mode)?.unwrap_or_default();
            let update = match GovParams::from_json(&option.option) {
                Ok(update) => update,
                Err(e) => {
                    warn!("[sc-05] proposal {} not applied: {}", short_hex(&proposal.tx_hash), e);
                    return Ok(());
                }
            };
            let merged = current.merged(&update);
            if let Err(e) = merged.validate() {
                warn!("[sc-05] proposal {} not applied: {}", short_hex(&proposal.tx_hash), e);
                return Ok(());
            }
            ledger.set(keys::PARAMS, &merged, mode)?;
            info!(
                "[sc-05] proposal {} applied: params version {}",
                short_hex(&proposal.tx_hash),
                merged.version
            );
        }
    }
    Ok(())
}
