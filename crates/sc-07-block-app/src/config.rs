//! Application configuration.
//!
//! Passed explicitly to `BlockApplication::new`. Protocol parameters are not
//! here: they live on-chain in the governance ledger.

use sc_06_execution::ExecutorConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Expected genesis chain id. Empty accepts any.
    pub chain_id: String,
    pub executor: ExecutorConfig,
    /// Longest accepted proposal message, in bytes.
    pub max_proposal_message_len: usize,
    /// Committed versions kept for historical queries by the in-memory
    /// stores. Every retained version holds a full copy of its ledger, so
    /// `None` (keep all) grows memory with every block.
    pub query_history_limit: Option<usize>,
}

/// Versions retained by default: about an hour of one-second blocks.
pub const DEFAULT_QUERY_HISTORY: usize = 3_600;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            executor: ExecutorConfig::default(),
            max_proposal_message_len: 256,
            query_history_limit: Some(DEFAULT_QUERY_HISTORY),
        }
    }
}
