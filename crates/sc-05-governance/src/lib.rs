//! # sc-05-governance
//!
//! The governance controller: on-chain protocol parameters and the proposal
//! state machine.
//!
//! ## Proposal Rules
//!
//! | Rule | Error |
//! |------|-------|
//! | Proposer must hold validator power | `NotValidator` |
//! | Start height after current height, period within bounds | `InvalidPayload` |
//! | Height arithmetic must not overflow | `Overflow` |
//! | Proposal hash unique across both partitions | `DuplicateKey` |
//! | Voter in the snapshotted voter set | `NoRight` |
//! | Vote height in `[start, end)` | `NotVotingPeriod` |
//! | Choice indexes an option | `InvalidChoice` |
//! | Referenced proposal exists | `NotFound` |
//!
//! Majority threshold: `ceil(2 * total_voting_power / 3)`.

pub mod controller;
pub mod domain;
pub mod handler;

pub use controller::{GovBlockEvents, GovernanceController, ImmutableGovController};
pub use domain::{majority_threshold, GovProposal, ProposalState, VoteOption, Voter};
