//! # Block Application
//!
//! Drives the three controllers through the block lifecycle:
//!
//! ```text
//! Uninitialized ──init_chain──→ Ready ──begin_block──→ Began ──deliver_tx──→ Executing
//!                                 ↑                                              │
//!                                 └──────commit────── Ended ←────end_block───────┘
//! ```
//!
//! A lifecycle call out of order, a height that does not continue the
//! committed chain, or controllers committing to different versions halt the
//! process: continuing would yield an app hash no other replica agrees on.

use crate::config::AppConfig;
use crate::events::{tx_event, Event};
use crate::genesis::GenesisDoc;
use crate::meta::{self, AppMeta, BlockSummary};
use crate::query::{self, ProposalView, QueryPath, QueryRequest, QueryResponse};
use crate::resolver::AppResolver;
use parking_lot::Mutex;
use sc_01_ledger::{InMemoryMetaStore, InMemoryVersionedStore, MetaStore, VersionedStore};
use sc_02_transaction::{TrxContextBuilder, TrxHandlers};
use sc_03_account::AccountController;
use sc_04_staking::{StakeController, ValidatorUpdate};
use sc_05_governance::GovernanceController;
use sc_06_execution::{TrxExecutor, TrxOutcome};
use shared_types::{
    combine_hashes, short_hex, Account, Address, AppError, AppResult, ExecMode, Hash, CODE_OK, ZERO_HASH,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Log and abort. Used for violations that make the local state diverge
/// from the replicated log.
pub fn halt(reason: impl std::fmt::Display) -> ! {
    error!("[sc-07] FATAL: {}", reason);
    panic!("halting: {reason}");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Began,
    Executing,
    Ended,
}

/// Misbehaviour reported by the consensus engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evidence {
    pub address: Address,
    pub height: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    pub proposer: Address,
    /// Proposer of the previous block as the consensus engine saw it, when
    /// the engine reports one.
    pub last_proposer: Option<Address>,
    pub byzantine_validators: Vec<Evidence>,
}

impl BlockHeader {
    pub fn new(height: u64, proposer: Address) -> Self {
        Self {
            height,
            proposer,
            last_proposer: None,
            byzantine_validators: Vec::new(),
        }
    }

    pub fn with_last_proposer(mut self, last_proposer: Address) -> Self {
        self.last_proposer = Some(last_proposer);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppInfo {
    pub chain_id: String,
    pub last_height: u64,
    pub last_app_hash: Hash,
}

/// Response of `check_tx` and `deliver_tx`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxResponse {
    pub code: u32,
    pub log: String,
    pub tx_hash: Option<Hash>,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub events: Vec<Event>,
}

impl TxResponse {
    fn from_outcome(outcome: &TrxOutcome, with_events: bool) -> Self {
        match outcome {
            Ok(receipt) => Self {
                code: CODE_OK,
                log: String::new(),
                tx_hash: Some(receipt.tx_hash),
                gas_wanted: receipt.gas_wanted,
                gas_used: receipt.gas_used,
                events: if with_events { vec![tx_event(receipt)] } else { Vec::new() },
            },
            Err(e) => Self::rejected(e),
        }
    }

    fn rejected(e: &AppError) -> Self {
        Self {
            code: e.code(),
            log: e.to_string(),
            ..Default::default()
        }
    }

    /// Accepted into a shard queue. The outcome is reported by `end_block`.
    fn queued() -> Self {
        Self {
            log: "queued".to_string(),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndBlockResponse {
    pub validator_updates: Vec<ValidatorUpdate>,
    pub proposals_frozen: Vec<Hash>,
    pub proposals_applied: Vec<Hash>,
    pub refunded_stakes: usize,
    /// Outcomes of transactions delivered through the shard pool, in
    /// completion order.
    pub tx_results: Vec<TxResponse>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitResponse {
    pub height: u64,
    pub app_hash: Hash,
}

/// Backing stores of the three controllers and the metadata store.
pub struct AppStores {
    pub gov: Box<dyn VersionedStore>,
    pub account: Box<dyn VersionedStore>,
    pub stake: Box<dyn VersionedStore>,
    pub meta: Box<dyn MetaStore>,
}

impl AppStores {
    /// In-memory stores retaining at most `history` committed versions each.
    /// `None` retains every version.
    pub fn in_memory(history: Option<usize>) -> Self {
        let store = |name: &'static str| -> Box<dyn VersionedStore> {
            match history {
                Some(limit) => Box::new(InMemoryVersionedStore::with_history(name, limit)),
                None => Box::new(InMemoryVersionedStore::new(name)),
            }
        };
        Self {
            gov: store("gov"),
            account: store("account"),
            stake: store("stake"),
            meta: Box::new(InMemoryMetaStore::new()),
        }
    }
}

struct AppState {
    phase: Phase,
    chain_id: String,
    last_height: u64,
    last_app_hash: Hash,
    last_block: BlockSummary,
    block: Option<BlockHeader>,
    /// Set by `end_block`, persisted by `commit`.
    pending: Option<BlockSummary>,
}

/// Fee and gas totals of the open block.
#[derive(Default)]
struct BlockTally {
    tx_count: u64,
    gas_used: u64,
    fee: u128,
    async_results: Vec<TxResponse>,
}

impl BlockTally {
    fn record(&mut self, outcome: &TrxOutcome) {
        if let Ok(receipt) = outcome {
            self.tx_count += 1;
            self.gas_used = self.gas_used.saturating_add(receipt.gas_used);
            self.fee = self.fee.saturating_add(u128::from(receipt.gas_used));
        }
    }
}

pub struct BlockApplication {
    config: AppConfig,
    gov: Arc<GovernanceController>,
    account: Arc<AccountController>,
    stake: Arc<StakeController>,
    executor: TrxExecutor,
    meta: Mutex<Box<dyn MetaStore>>,
    state: Mutex<AppState>,
    tally: Arc<Mutex<BlockTally>>,
}

impl BlockApplication {
    /// Wire the controllers and recover the last committed block from the
    /// metadata store. Every controller must sit at the recorded height.
    pub fn new(config: AppConfig, stores: AppStores) -> AppResult<Self> {
        let stake = Arc::new(StakeController::new(stores.stake));
        let account = Arc::new(AccountController::new(stores.account));
        let gov = Arc::new(GovernanceController::new(
            stores.gov,
            stake.clone(),
            config.max_proposal_message_len,
        ));

        let handlers = TrxHandlers {
            gov: gov.clone(),
            account: account.clone(),
            stake: stake.clone(),
        };
        let resolver = AppResolver::new(account.clone(), gov.clone(), handlers);
        let executor = TrxExecutor::new(TrxContextBuilder::new(Arc::new(resolver)), config.executor.clone())?;

        let versions = [gov.version(), account.version(), stake.version()];
        let state = match meta::load(stores.meta.as_ref())? {
            Some(recorded) => {
                if versions.iter().any(|v| *v != recorded.last_height) {
                    halt(format!(
                        "ledger versions (gov, account, stake) {:?} do not match recorded height {}",
                        versions, recorded.last_height
                    ));
                }
                if recorded.last_height > 0 && recorded.last_block.height != recorded.last_height {
                    halt(format!(
                        "recorded block context is for height {}, recorded height is {}",
                        recorded.last_block.height, recorded.last_height
                    ));
                }
                info!(
                    "[sc-07] recovered chain {} at height {} app hash {}",
                    recorded.chain_id,
                    recorded.last_height,
                    short_hex(&recorded.app_hash)
                );
                AppState {
                    phase: Phase::Ready,
                    chain_id: recorded.chain_id,
                    last_height: recorded.last_height,
                    last_app_hash: recorded.app_hash,
                    last_block: recorded.last_block,
                    block: None,
                    pending: None,
                }
            }
            None => {
                if versions != [0, 0, 0] {
                    halt(format!("ledger versions {versions:?} without block metadata"));
                }
                AppState {
                    phase: Phase::Uninitialized,
                    chain_id: config.chain_id.clone(),
                    last_height: 0,
                    last_app_hash: ZERO_HASH,
                    last_block: BlockSummary::default(),
                    block: None,
                    pending: None,
                }
            }
        };

        Ok(Self {
            config,
            gov,
            account,
            stake,
            executor,
            meta: Mutex::new(stores.meta),
            state: Mutex::new(state),
            tally: Arc::new(Mutex::new(BlockTally::default())),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn account_controller(&self) -> &Arc<AccountController> {
        &self.account
    }

    pub fn stake_controller(&self) -> &Arc<StakeController> {
        &self.stake
    }

    pub fn gov_controller(&self) -> &Arc<GovernanceController> {
        &self.gov
    }

    pub fn info(&self) -> AppInfo {
        let state = self.state.lock();
        AppInfo {
            chain_id: state.chain_id.clone(),
            last_height: state.last_height,
            last_app_hash: state.last_app_hash,
        }
    }

    /// Seed parameters, holders and validators from the genesis document.
    ///
    /// Writes both views of every controller without committing; block 1
    /// commits the genesis state together with its own changes. Returns the
    /// genesis app hash.
    pub fn init_chain(&self, genesis: &GenesisDoc) -> AppResult<Hash> {
        let mut state = self.state.lock();
        if state.phase != Phase::Uninitialized {
            return Err(AppError::InvalidState(format!("init_chain in phase {:?}", state.phase)));
        }
        if !self.config.chain_id.is_empty() && self.config.chain_id != genesis.chain_id {
            return Err(AppError::InvalidPayload(format!(
                "genesis chain id {} does not match configured {}",
                genesis.chain_id, self.config.chain_id
            )));
        }
        genesis.validate()?;

        let params = &genesis.gov_params;
        self.gov.set_genesis_params(params)?;
        for holder in &genesis.holders {
            self.account
                .put_genesis_account(&Account::new(holder.address).with_balance(holder.balance))?;
        }
        for v in &genesis.validators {
            self.stake
                .add_genesis_validator(&v.address, v.pub_key.clone(), v.power, params.amount_per_power)?;
        }
        let set = self.stake.init_validator_set(max_validators(params.max_validator_count))?;

        let app_hash = combine_hashes(&[
            self.gov.working_hash()?,
            self.account.working_hash()?,
            self.stake.working_hash()?,
        ]);
        state.phase = Phase::Ready;
        state.chain_id = genesis.chain_id.clone();
        state.last_app_hash = app_hash;

        info!(
            "[sc-07] genesis {}: {} holders, {} validators, app hash {}",
            genesis.chain_id,
            genesis.holders.len(),
            set.len(),
            short_hex(&app_hash)
        );
        Ok(app_hash)
    }

    /// Validate and apply `raw` against the admission view.
    pub fn check_tx(&self, raw: &[u8]) -> TxResponse {
        let height = {
            let state = self.state.lock();
            if state.phase == Phase::Uninitialized {
                return TxResponse::rejected(&AppError::InvalidState("chain not initialized".to_string()));
            }
            state.last_height + 1
        };
        let outcome = self.executor.execute_sync(raw, height, ExecMode::Admission);
        if let Err(e) = &outcome {
            debug!("[sc-07] check_tx rejected: {}", e);
        }
        TxResponse::from_outcome(&outcome, false)
    }

    pub fn begin_block(&self, header: BlockHeader) {
        let mut state = self.state.lock();
        if state.phase != Phase::Ready {
            halt(format!("begin_block {} in phase {:?}", header.height, state.phase));
        }
        if header.height != state.last_height + 1 {
            halt(format!(
                "begin_block height {} does not follow committed height {}",
                header.height, state.last_height
            ));
        }
        // The previous block's fee goes to its recorded proposer at this
        // block's end; the engine must agree on who that was.
        if let Some(last_proposer) = header.last_proposer {
            if state.last_height > 0 && last_proposer != state.last_block.proposer {
                halt(format!(
                    "block {} names {} as previous proposer, block {} recorded {}",
                    header.height,
                    short_hex(&last_proposer),
                    state.last_height,
                    short_hex(&state.last_block.proposer)
                ));
            }
        }

        *self.tally.lock() = BlockTally::default();
        info!(
            "[sc-07] begin block {} proposer {} ({} evidence)",
            header.height,
            short_hex(&header.proposer),
            header.byzantine_validators.len()
        );
        state.block = Some(header);
        state.phase = Phase::Began;
    }

    /// Apply `raw` against the execution view. With async delivery the
    /// transaction is queued and its outcome reported by `end_block`.
    pub async fn deliver_tx(&self, raw: Vec<u8>) -> TxResponse {
        let height = {
            let mut state = self.state.lock();
            if !matches!(state.phase, Phase::Began | Phase::Executing) {
                halt(format!("deliver_tx in phase {:?}", state.phase));
            }
            state.phase = Phase::Executing;
            state.last_height + 1
        };

        if self.executor.config().async_delivery {
            let tally = self.tally.clone();
            self.executor
                .submit(
                    raw,
                    height,
                    Box::new(move |outcome| {
                        let mut tally = tally.lock();
                        tally.record(&outcome);
                        tally.async_results.push(TxResponse::from_outcome(&outcome, true));
                    }),
                )
                .await;
            return TxResponse::queued();
        }

        let outcome = self.executor.execute_sync(&raw, height, ExecMode::Execution);
        self.tally.lock().record(&outcome);
        TxResponse::from_outcome(&outcome, true)
    }

    /// Drain queued transactions, then run punishment, proposal
    /// freeze/apply, unstake refunds, rewards and the validator-set update.
    ///
    /// Fees collected in this block are recorded at commit and paid to this
    /// block's proposer at the end of the next block.
    pub async fn end_block(&self, height: u64) -> EndBlockResponse {
        let (header, previous) = {
            let state = self.state.lock();
            if !matches!(state.phase, Phase::Began | Phase::Executing) {
                halt(format!("end_block {} in phase {:?}", height, state.phase));
            }
            let header = match &state.block {
                Some(block) if block.height == height => block.clone(),
                Some(block) => halt(format!("end_block {} for open block {}", height, block.height)),
                None => halt(format!("end_block {height} without an open block")),
            };
            (header, state.last_block.clone())
        };

        self.executor.flush().await;
        let tally = std::mem::take(&mut *self.tally.lock());

        let mut response = match self.finish_block(&header, &previous) {
            Ok(response) => response,
            Err(e) => halt(format!("end_block {height}: {e}")),
        };
        response.tx_results = tally.async_results;

        info!(
            "[sc-07] end block {}: {} txs, fee {}, {} validator updates",
            height,
            tally.tx_count,
            tally.fee,
            response.validator_updates.len()
        );

        let mut state = self.state.lock();
        state.pending = Some(BlockSummary {
            height,
            proposer: header.proposer,
            tx_count: tally.tx_count,
            gas_used: tally.gas_used,
            fee: tally.fee,
        });
        state.phase = Phase::Ended;
        response
    }

    fn finish_block(&self, header: &BlockHeader, previous: &BlockSummary) -> AppResult<EndBlockResponse> {
        let mode = ExecMode::Execution;
        let params = self.gov.params(mode)?;

        for evidence in &header.byzantine_validators {
            let stake_slashed = self.stake.do_punish(&evidence.address, params.slash_ratio)?;
            let vote_slashed = self.gov.do_punish(&evidence.address, params.slash_ratio)?;
            info!(
                "[sc-07] evidence against {} at {}: {} stake power, {} voting power slashed",
                short_hex(&evidence.address),
                evidence.height,
                stake_slashed,
                vote_slashed
            );
        }

        let gov_events = self.gov.end_block(header.height)?;

        let refunds = self.stake.process_frozen(header.height)?;
        for stake in &refunds {
            self.account.credit(&stake.owner, stake.amount, mode)?;
        }

        // A proposal applied above may have changed the parameters.
        let params = self.gov.params(mode)?;
        self.stake.apply_reward(
            &previous.proposer,
            previous.fee,
            params.reward_per_power,
            header.height,
        )?;
        let validator_updates = self
            .stake
            .update_validators(max_validators(params.max_validator_count))?;

        Ok(EndBlockResponse {
            validator_updates,
            proposals_frozen: gov_events.frozen,
            proposals_applied: gov_events.applied,
            refunded_stakes: refunds.len(),
            tx_results: Vec::new(),
        })
    }

    /// Commit governance, account and stake, in that order, and combine
    /// their hashes into the app hash.
    pub fn commit(&self) -> CommitResponse {
        let mut state = self.state.lock();
        if state.phase != Phase::Ended {
            halt(format!("commit in phase {:?}", state.phase));
        }
        let height = state.last_height + 1;

        let mut hashes = [ZERO_HASH; 3];
        let mut versions = [0u64; 3];
        let results = [
            ("gov", self.gov.commit()),
            ("account", self.account.commit()),
            ("stake", self.stake.commit()),
        ];
        for (i, (name, result)) in results.into_iter().enumerate() {
            match result {
                Ok((hash, version)) => {
                    hashes[i] = hash;
                    versions[i] = version;
                }
                Err(e) => halt(format!("{name} commit at height {height}: {e}")),
            }
        }
        if versions.iter().any(|v| *v != height) {
            halt(format!(
                "controller versions (gov, account, stake) {versions:?} diverge at height {height}"
            ));
        }

        let app_hash = combine_hashes(&hashes);
        let summary = state.pending.take().unwrap_or_default();
        let recorded = AppMeta {
            chain_id: state.chain_id.clone(),
            last_height: height,
            app_hash,
            last_block: summary.clone(),
        };
        if let Err(e) = meta::save(self.meta.lock().as_mut(), &recorded) {
            halt(format!("persist block meta at height {height}: {e}"));
        }

        state.last_height = height;
        state.last_app_hash = app_hash;
        state.last_block = summary;
        state.block = None;
        state.phase = Phase::Ready;

        info!("[sc-07] committed block {} app hash {}", height, short_hex(&app_hash));
        CommitResponse { height, app_hash }
    }

    pub fn query(&self, request: &QueryRequest) -> QueryResponse {
        let last_height = self.state.lock().last_height;
        let height = if request.height == 0 { last_height } else { request.height };
        QueryResponse::from_result(height, self.route_query(request, height, last_height))
    }

    fn route_query(&self, request: &QueryRequest, height: u64, last_height: u64) -> AppResult<Vec<u8>> {
        let path = QueryPath::parse(&request.path)?;
        if height > last_height {
            return Err(AppError::InvalidQueryData(format!(
                "height {height} is above the committed height {last_height}"
            )));
        }
        let data = request.data.as_slice();

        match path {
            QueryPath::Account => {
                let addr = query::address_arg(data)?;
                let account = self
                    .account
                    .immutable_at(height)?
                    .find_account(&addr)?
                    .ok_or_else(|| query::not_found("account", &addr))?;
                query::to_json(&account)
            }
            QueryPath::Stakes => {
                let owner = query::address_arg(data)?;
                query::to_json(&self.stake.immutable_at(height)?.stakes_of(&owner)?)
            }
            QueryPath::Delegatee => {
                let addr = query::address_arg(data)?;
                let delegatee = self
                    .stake
                    .immutable_at(height)?
                    .find_delegatee(&addr)?
                    .ok_or_else(|| query::not_found("delegatee", &addr))?;
                query::to_json(&delegatee)
            }
            QueryPath::Reward => {
                let addr = query::address_arg(data)?;
                let reward = self
                    .stake
                    .immutable_at(height)?
                    .find_reward(&addr)?
                    .ok_or_else(|| query::not_found("reward", &addr))?;
                query::to_json(&reward)
            }
            QueryPath::Proposal => {
                let hash = query::hash_arg(data)?;
                let (proposal, state) = self
                    .gov
                    .immutable_at(height)?
                    .find_proposal(&hash)?
                    .ok_or_else(|| query::not_found("proposal", &hash))?;
                query::to_json(&ProposalView {
                    state,
                    proposal: &proposal,
                })
            }
            QueryPath::GovParams => Ok(self.gov.immutable_at(height)?.params()?.to_json()),
            QueryPath::Validators => query::to_json(&self.stake.immutable_at(height)?.validator_set()?),
        }
    }

    /// Drain the shard pool, then release the stores.
    pub async fn close(&self) -> AppResult<()> {
        self.executor.shutdown().await;
        self.gov.close()?;
        self.account.close()?;
        self.stake.close()?;
        info!("[sc-07] closed at height {}", self.state.lock().last_height);
        Ok(())
    }
}

fn max_validators(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}
