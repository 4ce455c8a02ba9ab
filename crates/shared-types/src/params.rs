//! # Governance Parameters
//!
//! On-chain protocol parameters owned by the governance controller and read
//! (as snapshots) by every other controller.
//!
//! ## Merge Semantics
//!
//! A governance proposal carries partial parameter sets. Applying one merges
//! it into the current set: every non-zero field of the incoming set
//! overwrites the current value, every zero field is left untouched.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Protocol parameters.
///
/// `#[serde(default)]` lets proposal options name only the fields they
/// change; missing fields decode as zero and are skipped by [`GovParams::merge`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovParams {
    pub version: u64,
    /// Maximum number of validators reported to the consensus engine.
    pub max_validator_count: u64,
    /// Stake amount that buys one unit of power.
    pub amount_per_power: u128,
    /// Reward accrued per unit of power per block.
    pub reward_per_power: u128,
    /// Blocks an unstaked amount stays frozen before it is refunded.
    pub lazy_unstaking_blocks: u64,
    /// Blocks between the end of voting and the application of a proposal.
    pub lazy_apply_blocks: u64,
    pub min_voting_period_blocks: u64,
    pub max_voting_period_blocks: u64,
    /// Minimum gas (fee) a transaction must carry.
    pub min_trx_gas: u64,
    /// Percentage of power removed from a punished validator.
    pub slash_ratio: u64,
}

impl GovParams {
    /// Parameters used by devnets and tests.
    pub fn devnet() -> Self {
        Self {
            version: 1,
            max_validator_count: 21,
            amount_per_power: 1_000_000,
            reward_per_power: 1,
            lazy_unstaking_blocks: 20,
            lazy_apply_blocks: 10,
            min_voting_period_blocks: 10,
            max_voting_period_blocks: 10_000,
            min_trx_gas: 10,
            slash_ratio: 50,
        }
    }

    /// Overwrite every field that is non-zero in `update`.
    pub fn merge(&mut self, update: &GovParams) {
        macro_rules! merge_fields {
            ($($field:ident),* $(,)?) => {
                $(
                    if update.$field != 0 {
                        self.$field = update.$field;
                    }
                )*
            };
        }

        merge_fields!(
            version,
            max_validator_count,
            amount_per_power,
            reward_per_power,
            lazy_unstaking_blocks,
            lazy_apply_blocks,
            min_voting_period_blocks,
            max_voting_period_blocks,
            min_trx_gas,
            slash_ratio,
        );
    }

    /// Returns a copy of `self` with `update` merged in.
    pub fn merged(&self, update: &GovParams) -> GovParams {
        let mut params = self.clone();
        params.merge(update);
        params
    }

    /// Check the internal consistency of a complete parameter set.
    pub fn validate(&self) -> AppResult<()> {
        if self.amount_per_power == 0 {
            return Err(AppError::InvalidPayload(
                "amount_per_power must be positive".to_string(),
            ));
        }
        if self.max_validator_count == 0 {
            return Err(AppError::InvalidPayload(
                "max_validator_count must be positive".to_string(),
            ));
        }
        if self.min_voting_period_blocks > self.max_voting_period_blocks {
            return Err(AppError::InvalidPayload(format!(
                "voting period bounds inverted: min {} > max {}",
                self.min_voting_period_blocks, self.max_voting_period_blocks
            )));
        }
        if self.slash_ratio > 100 {
            return Err(AppError::InvalidPayload(format!(
                "slash_ratio {} exceeds 100",
                self.slash_ratio
            )));
        }
        Ok(())
    }

    /// Decode a (possibly partial) parameter set from JSON.
    pub fn from_json(bytes: &[u8]) -> AppResult<GovParams> {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::InvalidPayload(format!("gov params: {e}")))
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Vec<u8> {
        // Plain struct of integers: serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
