//! # Governance Proposals
//!
//! ## Lifecycle
//!
//! ```text
//! created ──votes in [start, end)──→ (majority option may be set, never unset)
//!    │
//!    └─ first block end with height > end ──→ frozen ──height ≥ apply──→ applied, deleted
//! ```
//!
//! Voters and their power are snapshotted when the proposal is created. A
//! voter changing choice first cancels the previous choice's tally, so a
//! vote is never counted twice and `sum(votes) <= total_voting_power` holds
//! at all times.

use serde::{Deserialize, Serialize};
use sc_02_transaction::{ProposalKind, ProposalPayload};
use shared_types::{Address, AppError, AppResult, Hash};

/// Smallest vote total that is at least two thirds of `total`.
pub fn majority_threshold(total: u64) -> u64 {
    ((u128::from(total) * 2 + 2) / 3) as u64
}

/// One vote option and the power that voted for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOption {
    /// Option body. For parameter proposals, a JSON `GovParams`.
    pub option: Vec<u8>,
    pub votes: u64,
}

/// A voter snapshotted at proposal creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub address: Address,
    pub power: u64,
    /// Index of the chosen option. `None` until the voter votes.
    pub choice: Option<usize>,
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovProposal {
    /// Hash of the proposal transaction.
    pub tx_hash: Hash,
    pub proposer: Address,
    pub message: String,
    pub kind: ProposalKind,
    pub start_voting_height: u64,
    /// First height at which voting is closed.
    pub end_voting_height: u64,
    pub apply_height: u64,
    pub total_voting_power: u64,
    pub majority_power: u64,
    pub options: Vec<VoteOption>,
    /// Sorted by address.
    pub voters: Vec<Voter>,
    pub major_option: Option<usize>,
}

impl GovProposal {
    /// Create a proposal from its transaction payload and a voter snapshot.
    pub fn new(
        tx_hash: Hash,
        proposer: Address,
        payload: &ProposalPayload,
        voters: Vec<(Address, u64)>,
        lazy_apply_blocks: u64,
    ) -> AppResult<Self> {
        let end_voting_height = payload
            .start_voting_height
            .checked_add(payload.voting_period_blocks)
            .ok_or(AppError::Overflow("end voting height"))?;
        let apply_height = end_voting_height
            .checked_add(lazy_apply_blocks)
            .ok_or(AppError::Overflow("apply height"))?;

        let mut voters: Vec<Voter> = voters
            .into_iter()
            .map(|(address, power)| Voter {
                address,
                power,
                choice: None,
            })
            .collect();
        voters.sort_by(|a, b| a.address.cmp(&b.address));
        voters.dedup_by(|a, b| a.address == b.address);

        let total_voting_power = voters
            .iter()
            .try_fold(0u64, |acc, v| acc.checked_add(v.power))
            .ok_or(AppError::Overflow("total voting power"))?;

        Ok(Self {
            tx_hash,
            proposer,
            message: payload.message.clone(),
            kind: payload.kind,
            start_voting_height: payload.start_voting_height,
            end_voting_height,
            apply_height,
            total_voting_power,
            majority_power: majority_threshold(total_voting_power),
            options: payload
                .options
                .iter()
                .map(|option| VoteOption {
                    option: option.clone(),
                    votes: 0,
                })
                .collect(),
            voters,
            major_option: None,
        })
    }

    /// Voting is open in `[start_voting_height, end_voting_height)`.
    pub fn is_voting_height(&self, height: u64) -> bool {
        height >= self.start_voting_height && height < self.end_voting_height
    }

    /// Whether block end at `height` applies this proposal. Block ends run at
    /// consecutive heights, so a height past `apply_height` means the apply
    /// height was skipped.
    pub fn check_apply_height(&self, height: u64) -> AppResult<bool> {
        match height.cmp(&self.apply_height) {
            std::cmp::Ordering::Less => Ok(false),
            std::cmp::Ordering::Equal => Ok(true),
            std::cmp::Ordering::Greater => Err(AppError::InvalidApplyHeight {
                expected: self.apply_height,
                actual: height,
            }),
        }
    }

    pub fn find_voter(&self, addr: &Address) -> Option<&Voter> {
        self.voter_index(addr).map(|i| &self.voters[i])
    }

    fn voter_index(&self, addr: &Address) -> Option<usize> {
        self.voters
            .binary_search_by(|v| v.address.cmp(addr))
            .ok()
    }

    /// Check a vote without applying it.
    pub fn check_vote(&self, addr: &Address, choice: i32, height: u64) -> AppResult<()> {
        if !self.is_voting_height(height) {
            return Err(AppError::NotVotingPeriod {
                height,
                start: self.start_voting_height,
                end: self.end_voting_height,
            });
        }
        if self.voter_index(addr).is_none() {
            return Err(AppError::NoRight);
        }
        self.choice_index(choice).map(|_| ())
    }

    fn choice_index(&self, choice: i32) -> AppResult<usize> {
        usize::try_from(choice)
            .ok()
            .filter(|c| *c < self.options.len())
            .ok_or(AppError::InvalidChoice(choice))
    }

    /// Record `addr`'s vote for `choice`, replacing any previous choice.
    pub fn do_vote(&mut self, addr: &Address, choice: i32) -> AppResult<()> {
        let index = self.voter_index(addr).ok_or(AppError::NoRight)?;
        let choice = self.choice_index(choice)?;
        let power = self.voters[index].power;

        if let Some(previous) = self.voters[index].choice {
            self.options[previous].votes -= power;
        }
        self.options[choice].votes += power;
        self.voters[index].choice = Some(choice);
        Ok(())
    }

    /// Take back `addr`'s current vote, restoring `previous` as its choice.
    ///
    /// A majority that only this vote established is cleared and recomputed,
    /// so votes cast by others since then keep their effect.
    pub fn undo_vote(
        &mut self,
        addr: &Address,
        previous: Option<usize>,
        major_before: Option<usize>,
    ) -> AppResult<()> {
        let index = self.voter_index(addr).ok_or(AppError::NoRight)?;
        if previous.is_some_and(|p| p >= self.options.len()) {
            return Err(AppError::InvalidState(format!("vote option {:?} out of range", previous)));
        }
        let power = self.voters[index].power;

        if let Some(current) = self.voters[index].choice {
            self.options[current].votes -= power;
        }
        if let Some(previous) = previous {
            self.options[previous].votes += power;
        }
        self.voters[index].choice = previous;

        if major_before.is_none() {
            self.major_option = None;
            self.update_major_option();
        }
        Ok(())
    }

    /// Set the majority option if one has reached the threshold.
    ///
    /// Returns the majority option index. Once set it is returned unchanged
    /// by every later call.
    pub fn update_major_option(&mut self) -> Option<usize> {
        if self.major_option.is_some() {
            return self.major_option;
        }

        // Highest votes first, lowest index on ties.
        let leader = self
            .options
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.votes.cmp(&b.votes).then(ib.cmp(ia)));

        if let Some((index, option)) = leader {
            if self.total_voting_power > 0 && option.votes >= self.majority_power {
                self.major_option = Some(index);
            }
        }
        self.major_option
    }

    pub fn major_option(&self) -> Option<&VoteOption> {
        self.major_option.map(|i| &self.options[i])
    }

    pub fn sum_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// Slash `ratio` percent of `addr`'s voting power. The slashed power
    /// leaves the voter's option tally and the proposal total together.
    ///
    /// Returns the power removed (zero when `addr` is not a voter).
    pub fn punish(&mut self, addr: &Address, ratio: u64) -> u64 {
        let Some(index) = self.voter_index(addr) else {
            return 0;
        };
        let voter = &mut self.voters[index];
        let slashed = (u128::from(voter.power) * u128::from(ratio.min(100)) / 100) as u64;

        voter.power -= slashed;
        if let Some(choice) = voter.choice {
            self.options[choice].votes -= slashed;
        }
        self.total_voting_power -= slashed;
        self.majority_power = majority_threshold(self.total_voting_power);
        slashed
    }
}
