//! # Stake Controller
//!
//! Delegatees, stakes, frozen (unstaked) amounts, rewards and the last
//! emitted validator set, all in one dual-view ledger behind one lock.

use crate::domain::{keys, sort_by_power, validator_delta, Delegatee, Reward, Stake, Validator, ValidatorUpdate};
use parking_lot::RwLock;
use sc_01_ledger::{DualViewLedger, ImmutableLedger, VersionedStore};
use sc_02_transaction::ValidatorPower;
use shared_types::{short_hex, Address, AppError, AppResult, ExecMode, Hash};
use tracing::{debug, info};

/// The stake controller.
pub struct StakeController {
    pub(crate) ledger: RwLock<DualViewLedger>,
}

impl StakeController {
    pub fn new(store: Box<dyn VersionedStore>) -> Self {
        Self {
            ledger: RwLock::new(DualViewLedger::new("stake", store)),
        }
    }

    pub fn find_delegatee(&self, addr: &Address, mode: ExecMode) -> AppResult<Option<Delegatee>> {
        Ok(self.ledger.read().get(&keys::delegatee(addr), mode)?)
    }

    pub fn delegatees(&self, mode: ExecMode) -> AppResult<Vec<Delegatee>> {
        let ledger = self.ledger.read();
        all_delegatees(&ledger, mode)
    }

    pub fn find_stake(&self, tx_hash: &Hash, mode: ExecMode) -> AppResult<Option<Stake>> {
        Ok(self.ledger.read().get(&keys::stake(tx_hash), mode)?)
    }

    /// Active stakes owned by `owner`.
    pub fn stakes_of(&self, owner: &Address, mode: ExecMode) -> AppResult<Vec<Stake>> {
        let ledger = self.ledger.read();
        Ok(all_stakes(&ledger, mode)?
            .into_iter()
            .filter(|s| s.owner == *owner)
            .collect())
    }

    /// Power delegated to `addr`, own stakes included.
    pub fn power_of(&self, addr: &Address, mode: ExecMode) -> AppResult<u64> {
        Ok(self
            .find_delegatee(addr, mode)?
            .map(|d| d.total_power)
            .unwrap_or(0))
    }

    pub fn self_power_of(&self, addr: &Address, mode: ExecMode) -> AppResult<u64> {
        Ok(self
            .find_delegatee(addr, mode)?
            .map(|d| d.self_power)
            .unwrap_or(0))
    }

    /// Sum of the power of every delegatee.
    pub fn total_power(&self, mode: ExecMode) -> AppResult<u64> {
        Ok(self
            .delegatees(mode)?
            .iter()
            .fold(0u64, |acc, d| acc.saturating_add(d.total_power)))
    }

    /// The top `max_count` delegatees by power and their total power.
    pub fn validators(&self, max_count: usize, mode: ExecMode) -> AppResult<(Vec<Validator>, u64)> {
        let ledger = self.ledger.read();
        let set = ranked_validators(&ledger, max_count, mode)?;
        let total = set.iter().fold(0u64, |acc, v| acc.saturating_add(v.power));
        Ok((set, total))
    }

    /// The validator set last reported to the consensus engine.
    pub fn current_validator_set(&self, mode: ExecMode) -> AppResult<Vec<Validator>> {
        Ok(self
            .ledger
            .read()
            .get(keys::VALIDATOR_SET, mode)?
            .unwrap_or_default())
    }

    /// Recompute the validator set in the execution view and return only the
    /// changes against the previously stored set.
    pub fn update_validators(&self, max_count: usize) -> AppResult<Vec<ValidatorUpdate>> {
        let mode = ExecMode::Execution;
        let mut ledger = self.ledger.write();

        let old: Vec<Validator> = ledger.get(keys::VALIDATOR_SET, mode)?.unwrap_or_default();
        let new = ranked_validators(&ledger, max_count, mode)?;
        let delta = validator_delta(&old, &new);

        if !delta.is_empty() {
            ledger.set(keys::VALIDATOR_SET, &new, mode)?;
            info!(
                "[sc-04] validator set changed: {} updates, {} validators",
                delta.len(),
                new.len()
            );
        }
        Ok(delta)
    }

    /// Accrue block rewards in the execution view.
    ///
    /// Every member of the current validator set earns
    /// `power * reward_per_power`; the proposer also earns `block_fee`.
    /// Returns the total amount issued.
    pub fn apply_reward(
        &self,
        proposer: &Address,
        block_fee: u128,
        reward_per_power: u128,
        height: u64,
    ) -> AppResult<u128> {
        let mode = ExecMode::Execution;
        let mut ledger = self.ledger.write();
        let set: Vec<Validator> = ledger.get(keys::VALIDATOR_SET, mode)?.unwrap_or_default();

        let mut issued = 0u128;
        for validator in &set {
            let amount = u128::from(validator.power)
                .checked_mul(reward_per_power)
                .ok_or(AppError::Overflow("block reward"))?;
            let fee = if validator.address == *proposer { block_fee } else { 0 };
            let total = amount.checked_add(fee).ok_or(AppError::Overflow("block reward"))?;
            accrue(&mut ledger, &validator.address, total, height)?;
            issued = issued.saturating_add(total);
        }

        if block_fee > 0 && !set.iter().any(|v| v.address == *proposer) {
            accrue(&mut ledger, proposer, block_fee, height)?;
            issued = issued.saturating_add(block_fee);
        }

        debug!(
            "[sc-04] rewards at height {}: issued {} (fee {} to {})",
            height,
            issued,
            block_fee,
            short_hex(proposer)
        );
        Ok(issued)
    }

    pub fn find_reward(&self, addr: &Address, mode: ExecMode) -> AppResult<Option<Reward>> {
        Ok(self.ledger.read().get(&keys::reward(addr), mode)?)
    }

    /// Slash `slash_ratio` percent of every stake delegated to `addr`.
    ///
    /// Returns the total power removed.
    pub fn do_punish(&self, addr: &Address, slash_ratio: u64) -> AppResult<u64> {
        let mode = ExecMode::Execution;
        let mut ledger = self.ledger.write();
        let Some(mut delegatee) = ledger.get::<Delegatee>(&keys::delegatee(addr), mode)? else {
            return Ok(0);
        };

        let ratio = slash_ratio.min(100);
        let mut slashed_total = 0u64;
        for (_, mut stake) in ledger.scan_prefix::<Stake>(&[keys::STAKE], mode)? {
            if stake.to != *addr {
                continue;
            }
            let slashed_power = percent_u64(stake.power, ratio);
            let slashed_amount = stake
                .amount
                .checked_mul(u128::from(ratio))
                .ok_or(AppError::Overflow("slashed amount"))?
                / 100;
            stake.power -= slashed_power;
            stake.amount -= slashed_amount;
            delegatee.remove_power(slashed_power, stake.is_self_stake());
            slashed_total = slashed_total.saturating_add(slashed_power);
            ledger.set(&keys::stake(&stake.tx_hash), &stake, mode)?;
        }

        ledger.set(&keys::delegatee(addr), &delegatee, mode)?;
        info!(
            "[sc-04] punished {}: slashed {} power ({}%)",
            short_hex(addr),
            slashed_total,
            ratio
        );
        Ok(slashed_total)
    }

    /// Remove and return the frozen stakes due for refund at `height`.
    pub fn process_frozen(&self, height: u64) -> AppResult<Vec<Stake>> {
        let mode = ExecMode::Execution;
        let mut ledger = self.ledger.write();

        let due: Vec<(Vec<u8>, Stake)> = ledger
            .scan_prefix::<Stake>(&[keys::FROZEN], mode)?
            .into_iter()
            .take_while(|(_, s)| s.refund_height <= height)
            .collect();

        for (key, stake) in &due {
            ledger.delete(key, mode);
            debug!(
                "[sc-04] unfroze {} for {}",
                stake.amount,
                short_hex(&stake.owner)
            );
        }
        Ok(due.into_iter().map(|(_, s)| s).collect())
    }

    /// Register a genesis validator with a self stake, in both views.
    pub fn add_genesis_validator(
        &self,
        addr: &Address,
        pub_key: Vec<u8>,
        power: u64,
        amount_per_power: u128,
    ) -> AppResult<()> {
        let amount = u128::from(power)
            .checked_mul(amount_per_power)
            .ok_or(AppError::Overflow("genesis stake"))?;
        let mut genesis_hash = [0u8; 32];
        genesis_hash[..20].copy_from_slice(addr);

        let stake = Stake {
            owner: *addr,
            to: *addr,
            amount,
            power,
            tx_hash: genesis_hash,
            start_height: 0,
            refund_height: 0,
        };
        let mut delegatee = Delegatee::new(*addr, pub_key);
        delegatee.add_stake(&stake);

        let mut ledger = self.ledger.write();
        for mode in [ExecMode::Admission, ExecMode::Execution] {
            ledger.set(&keys::stake(&stake.tx_hash), &stake, mode)?;
            ledger.set(&keys::delegatee(addr), &delegatee, mode)?;
        }
        Ok(())
    }

    /// Store the genesis validator set in both views without emitting a
    /// delta: the consensus engine already knows it.
    pub fn init_validator_set(&self, max_count: usize) -> AppResult<Vec<Validator>> {
        let mut ledger = self.ledger.write();
        let set = ranked_validators(&ledger, max_count, ExecMode::Execution)?;
        for mode in [ExecMode::Admission, ExecMode::Execution] {
            ledger.set(keys::VALIDATOR_SET, &set, mode)?;
        }
        Ok(set)
    }

    pub fn commit(&self) -> AppResult<(Hash, u64)> {
        let (hash, version) = self.ledger.write().commit()?;
        info!("[sc-04] committed version {} hash {}", version, short_hex(&hash));
        Ok((hash, version))
    }

    pub fn working_hash(&self) -> AppResult<Hash> {
        Ok(self.ledger.read().working_hash()?)
    }

    pub fn version(&self) -> u64 {
        self.ledger.read().version()
    }

    pub fn immutable_at(&self, height: u64) -> AppResult<ImmutableStakeController> {
        Ok(ImmutableStakeController {
            ledger: self.ledger.read().immutable_at(height)?,
        })
    }

    pub fn close(&self) -> AppResult<()> {
        Ok(self.ledger.write().close()?)
    }
}

impl ValidatorPower for StakeController {
    fn power_of(&self, addr: &Address, mode: ExecMode) -> AppResult<u64> {
        StakeController::power_of(self, addr, mode)
    }

    fn validator_powers(&self, max_count: usize, mode: ExecMode) -> AppResult<Vec<(Address, u64)>> {
        let (set, _) = self.validators(max_count, mode)?;
        Ok(set.into_iter().map(|v| (v.address, v.power)).collect())
    }
}

/// Historical, read-only stake lookups.
pub struct ImmutableStakeController {
    ledger: ImmutableLedger,
}

impl ImmutableStakeController {
    pub fn find_delegatee(&self, addr: &Address) -> AppResult<Option<Delegatee>> {
        Ok(self.ledger.get(&keys::delegatee(addr))?)
    }

    pub fn stakes_of(&self, owner: &Address) -> AppResult<Vec<Stake>> {
        Ok(self
            .ledger
            .scan_prefix::<Stake>(&[keys::STAKE])?
            .into_iter()
            .map(|(_, s)| s)
            .filter(|s| s.owner == *owner)
            .collect())
    }

    pub fn find_reward(&self, addr: &Address) -> AppResult<Option<Reward>> {
        Ok(self.ledger.get(&keys::reward(addr))?)
    }

    pub fn validator_set(&self) -> AppResult<Vec<Validator>> {
        Ok(self.ledger.get(keys::VALIDATOR_SET)?.unwrap_or_default())
    }

    pub fn version(&self) -> u64 {
        self.ledger.version()
    }
}

pub(crate) fn all_delegatees(ledger: &DualViewLedger, mode: ExecMode) -> AppResult<Vec<Delegatee>> {
    Ok(ledger
        .scan_prefix::<Delegatee>(&[keys::DELEGATEE], mode)?
        .into_iter()
        .map(|(_, d)| d)
        .collect())
}

fn all_stakes(ledger: &DualViewLedger, mode: ExecMode) -> AppResult<Vec<Stake>> {
    Ok(ledger
        .scan_prefix::<Stake>(&[keys::STAKE], mode)?
        .into_iter()
        .map(|(_, s)| s)
        .collect())
}

fn ranked_validators(ledger: &DualViewLedger, max_count: usize, mode: ExecMode) -> AppResult<Vec<Validator>> {
    let mut set: Vec<Validator> = all_delegatees(ledger, mode)?
        .into_iter()
        .filter(|d| d.total_power > 0)
        .map(|d| Validator {
            address: d.address,
            pub_key: d.pub_key,
            power: d.total_power,
        })
        .collect();
    sort_by_power(&mut set);
    set.truncate(max_count);
    Ok(set)
}

fn accrue(ledger: &mut DualViewLedger, addr: &Address, amount: u128, height: u64) -> AppResult<()> {
    let key = keys::reward(addr);
    let mut reward: Reward = ledger.get(&key, ExecMode::Execution)?.unwrap_or(Reward {
        address: *addr,
        ..Default::default()
    });
    reward.cumulated = reward
        .cumulated
        .checked_add(amount)
        .ok_or(AppError::Overflow("cumulated reward"))?;
    reward.last_height = height;
    Ok(ledger.set(&key, &reward, ExecMode::Execution)?)
}

fn percent_u64(value: u64, ratio: u64) -> u64 {
    (u128::from(value) * u128::from(ratio) / 100) as u64
}
