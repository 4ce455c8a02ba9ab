//! # sc-04-staking
//!
//! The stake controller.
//!
//! ## Responsibilities
//!
//! - Stake records and the delegatees (validator candidates) they back
//! - Validator ordering: descending power, ties by ascending address
//! - `update_validators`: the validator-set delta for the consensus engine
//! - `apply_reward`: per-power rewards plus the proposer's block fee
//! - `do_punish`: slashing on misbehaviour evidence
//! - Frozen unstaked amounts, released by `process_frozen`
//!
//! Same dual-view commit contract as the account controller.

pub mod controller;
pub mod domain;
pub mod handler;

pub use controller::{ImmutableStakeController, StakeController};
pub use domain::{Delegatee, Reward, Stake, Validator, ValidatorUpdate};
