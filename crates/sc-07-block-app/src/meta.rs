//! Block metadata kept outside the controller ledgers for restart recovery.

use sc_01_ledger::MetaStore;
use serde::{Deserialize, Serialize};
use shared_types::{Address, AppError, AppResult, Hash, ZERO_ADDRESS, ZERO_HASH};

const META_KEY: &[u8] = b"app_meta";

/// Proposer and fee totals of one committed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub height: u64,
    pub proposer: Address,
    pub tx_count: u64,
    pub gas_used: u64,
    pub fee: u128,
}

impl Default for BlockSummary {
    fn default() -> Self {
        Self {
            height: 0,
            proposer: ZERO_ADDRESS,
            tx_count: 0,
            gas_used: 0,
            fee: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMeta {
    pub chain_id: String,
    pub last_height: u64,
    pub app_hash: Hash,
    pub last_block: BlockSummary,
}

impl Default for AppMeta {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            last_height: 0,
            app_hash: ZERO_HASH,
            last_block: BlockSummary::default(),
        }
    }
}

pub fn load(store: &dyn MetaStore) -> AppResult<Option<AppMeta>> {
    let Some(bytes) = store.get(META_KEY)? else {
        return Ok(None);
    };
    bincode::deserialize(&bytes)
        .map(Some)
        .map_err(|e| AppError::Storage(format!("app meta: {e}")))
}

pub fn save(store: &mut dyn MetaStore, meta: &AppMeta) -> AppResult<()> {
    let bytes = bincode::serialize(meta).map_err(|e| AppError::Storage(format!("app meta: {e}")))?;
    store.put(META_KEY, &bytes)?;
    Ok(())
}
