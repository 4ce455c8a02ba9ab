pub mod proposal;

pub use proposal::*;

use shared_types::Hash;

/// Where a proposal currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum ProposalState {
    /// Created, voting open or not yet started.
    Active,
    /// Voting closed, waiting for its apply height.
    Frozen,
}

/// Ledger key layout.
pub mod keys {
    use super::*;

    pub const PARAMS: &[u8] = b"params";
    pub const ACTIVE: u8 = b'a';
    pub const FROZEN: u8 = b'f';

    pub fn active(tx_hash: &Hash) -> Vec<u8> {
        proposal(ACTIVE, tx_hash)
    }

    pub fn frozen(tx_hash: &Hash) -> Vec<u8> {
        proposal(FROZEN, tx_hash)
    }

    fn proposal(prefix: u8, tx_hash: &Hash) -> Vec<u8> {
        let mut key = Vec::with_capacity(33);
        key.push(prefix);
        key.extend_from_slice(tx_hash);
        key
    }
}
