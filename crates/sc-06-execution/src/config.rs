//! Executor configuration.

use serde::{Deserialize, Serialize};

/// Worker pool and delivery settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Number of shard workers. Each sender always maps to the same shard.
    pub shard_count: usize,
    /// Bounded mailbox size per shard.
    pub queue_capacity: usize,
    /// Deliver in-block transactions through the shard pool instead of on
    /// the caller's thread.
    pub async_delivery: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shard_count: 8,
            queue_capacity: 1024,
            async_delivery: false,
        }
    }
}
