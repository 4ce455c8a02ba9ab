//! # sc-07-block-app
//!
//! The protocol-facing side of the node: receives the consensus engine's
//! block lifecycle calls and turns them into controller operations.
//!
//! ## Protocol
//!
//! | Call | Effect |
//! |------|--------|
//! | `info` | last committed height and app hash |
//! | `init_chain` | seed genesis state, return the genesis app hash |
//! | `check_tx` | validate and apply against the admission view |
//! | `begin_block` | open block `last + 1` |
//! | `deliver_tx` | validate and apply against the execution view |
//! | `end_block` | punish, freeze/apply proposals, refund, reward, validator delta |
//! | `commit` | commit gov → account → stake, combine hashes, persist meta |
//! | `query` | path-routed reads at a committed height |
//!
//! ## App Hash
//!
//! `keccak256(gov_hash ‖ account_hash ‖ stake_hash)`. The order is part of
//! the protocol.

pub mod app;
pub mod config;
pub mod events;
pub mod genesis;
pub mod meta;
pub mod query;
pub mod resolver;

pub use app::{
    halt, AppInfo, AppStores, BlockApplication, BlockHeader, CommitResponse, EndBlockResponse, Evidence, Phase,
    TxResponse,
};
pub use config::{AppConfig, DEFAULT_QUERY_HISTORY};
pub use events::{tx_event, Event, EventAttribute};
pub use genesis::{GenesisDoc, GenesisHolder, GenesisValidator};
pub use meta::{AppMeta, BlockSummary};
pub use query::{QueryRequest, QueryResponse};
pub use resolver::AppResolver;
