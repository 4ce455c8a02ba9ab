pub mod entities;

pub use entities::*;

use shared_types::{Address, Hash};

/// Ledger key layout. One prefix byte per record kind.
pub mod keys {
    use super::*;

    pub const DELEGATEE: u8 = b'd';
    pub const STAKE: u8 = b's';
    pub const FROZEN: u8 = b'f';
    pub const REWARD: u8 = b'r';
    pub const VALIDATOR_SET: &[u8] = b"v";

    pub fn delegatee(addr: &Address) -> Vec<u8> {
        prefixed(DELEGATEE, addr)
    }

    pub fn stake(tx_hash: &Hash) -> Vec<u8> {
        prefixed(STAKE, tx_hash)
    }

    pub fn reward(addr: &Address) -> Vec<u8> {
        prefixed(REWARD, addr)
    }

    /// Frozen stakes sort by refund height, so one height is one prefix.
    pub fn frozen(refund_height: u64, tx_hash: &Hash) -> Vec<u8> {
        let mut key = frozen_at(refund_height);
        key.extend_from_slice(tx_hash);
        key
    }

    pub fn frozen_at(refund_height: u64) -> Vec<u8> {
        let mut key = vec![FROZEN];
        key.extend_from_slice(&refund_height.to_be_bytes());
        key
    }

    fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + body.len());
        key.push(prefix);
        key.extend_from_slice(body);
        key
    }
}
