//! # Staking Entities

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};

/// One stake record, created by a staking transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub owner: Address,
    /// The delegatee (validator) the stake is placed on.
    pub to: Address,
    pub amount: u128,
    pub power: u64,
    /// Hash of the staking transaction. Unique key of the stake.
    pub tx_hash: Hash,
    pub start_height: u64,
    /// Height at which a frozen (unstaked) amount is refunded. Zero while the
    /// stake is active.
    pub refund_height: u64,
}

impl Stake {
    pub fn is_self_stake(&self) -> bool {
        self.owner == self.to
    }
}

/// A validator candidate and the power delegated to it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegatee {
    pub address: Address,
    /// Compressed secp256k1 public key reported to the consensus engine.
    pub pub_key: Vec<u8>,
    /// Power from the delegatee's own stakes.
    pub self_power: u64,
    /// Power from all stakes, own ones included.
    pub total_power: u64,
}

impl Delegatee {
    pub fn new(address: Address, pub_key: Vec<u8>) -> Self {
        Self {
            address,
            pub_key,
            ..Default::default()
        }
    }

    pub fn add_stake(&mut self, stake: &Stake) {
        self.total_power = self.total_power.saturating_add(stake.power);
        if stake.is_self_stake() {
            self.self_power = self.self_power.saturating_add(stake.power);
        }
    }

    pub fn remove_power(&mut self, power: u64, self_stake: bool) {
        self.total_power = self.total_power.saturating_sub(power);
        if self_stake {
            self.self_power = self.self_power.saturating_sub(power);
        }
    }
}

/// Accumulated block rewards of one address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub address: Address,
    pub cumulated: u128,
    pub last_height: u64,
}

/// A member of the active validator set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    pub pub_key: Vec<u8>,
    pub power: u64,
}

/// One entry of a validator-set delta. `power == 0` removes the validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub address: Address,
    pub pub_key: Vec<u8>,
    pub power: u64,
}

/// Sort by descending power, ties by ascending address.
pub fn sort_by_power(validators: &mut [Validator]) {
    validators.sort_by(|a, b| b.power.cmp(&a.power).then(a.address.cmp(&b.address)));
}

/// Delta turning `old` into `new`, ordered by address.
pub fn validator_delta(old: &[Validator], new: &[Validator]) -> Vec<ValidatorUpdate> {
    let mut updates = Vec::new();

    for prev in old {
        if !new.iter().any(|v| v.address == prev.address) {
            updates.push(ValidatorUpdate {
                address: prev.address,
                pub_key: prev.pub_key.clone(),
                power: 0,
            });
        }
    }
    for next in new {
        let unchanged = old
            .iter()
            .any(|v| v.address == next.address && v.power == next.power);
        if !unchanged {
            updates.push(ValidatorUpdate {
                address: next.address,
                pub_key: next.pub_key.clone(),
                power: next.power,
            });
        }
    }

    updates.sort_by(|a, b| a.address.cmp(&b.address));
    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(byte: u8, power: u64) -> Validator {
        Validator {
            address: [byte; 20],
            pub_key: vec![byte],
            power,
        }
    }

    #[test]
    fn test_sort_ties_break_by_address() {
        let mut set = vec![v(3, 10), v(1, 10), v(2, 30)];
        sort_by_power(&mut set);
        let order: Vec<u8> = set.iter().map(|v| v.address[0]).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn test_delta_reports_additions_removals_and_changes() {
        let old = vec![v(1, 10), v(2, 20), v(3, 30)];
        let new = vec![v(2, 20), v(3, 35), v(4, 5)];

        let delta = validator_delta(&old, &new);
        let summary: Vec<(u8, u64)> = delta.iter().map(|u| (u.address[0], u.power)).collect();
        assert_eq!(summary, vec![(1, 0), (3, 35), (4, 5)]);
    }

    #[test]
    fn test_delta_of_identical_sets_is_empty() {
        let set = vec![v(1, 10), v(2, 20)];
        assert!(validator_delta(&set, &set).is_empty());
    }

    #[test]
    fn test_delegatee_tracks_self_power() {
        let mut d = Delegatee::new([1u8; 20], vec![]);
        let own = Stake {
            owner: [1u8; 20],
            to: [1u8; 20],
            amount: 10,
            power: 10,
            tx_hash: [0u8; 32],
            start_height: 1,
            refund_height: 0,
        };
        let delegated = Stake {
            owner: [2u8; 20],
            power: 4,
            ..own.clone()
        };
        d.add_stake(&own);
        d.add_stake(&delegated);
        assert_eq!((d.self_power, d.total_power), (10, 14));

        d.remove_power(4, false);
        assert_eq!((d.self_power, d.total_power), (10, 10));
    }
}
