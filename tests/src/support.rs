//! Chain fixture shared by the integration tests and benchmarks.

use sc_02_transaction::test_utils::TestWallet;
use sc_02_transaction::{ProposalKind, ProposalPayload, Trx, TrxPayload};
use sc_07_block_app::{
    AppConfig, AppStores, BlockApplication, BlockHeader, CommitResponse, EndBlockResponse, GenesisDoc,
    GenesisHolder, GenesisValidator, QueryRequest, TxResponse,
};
use shared_types::{Account, Address, GovParams, Hash};

pub const GAS: u64 = 10;

/// Balance of every genesis holder.
pub const FUNDS: u128 = 1_000_000;

/// Everything one block produced.
pub struct BlockResult {
    pub responses: Vec<TxResponse>,
    pub end: EndBlockResponse,
    pub commit: CommitResponse,
}

pub struct Chain {
    pub app: BlockApplication,
    /// Genesis validators, in genesis order.
    pub validators: Vec<TestWallet>,
}

/// Validator `i` of a chain uses seed `1000 + i`.
pub fn validator_wallet(i: usize) -> TestWallet {
    TestWallet::from_seed(1000 + i as u64)
}

/// Genesis with one funded validator per entry of `powers`, plus `holders`.
pub fn genesis(powers: &[u64], holders: &[(Address, u128)]) -> GenesisDoc {
    let wallets: Vec<_> = (0..powers.len()).map(validator_wallet).collect();
    GenesisDoc {
        chain_id: "sc-test".into(),
        validators: wallets
            .iter()
            .zip(powers)
            .map(|(w, power)| GenesisValidator {
                address: w.address,
                pub_key: w.pubkey(),
                power: *power,
            })
            .collect(),
        holders: wallets
            .iter()
            .map(|w| (w.address, FUNDS))
            .chain(holders.iter().copied())
            .map(|(address, balance)| GenesisHolder { address, balance })
            .collect(),
        gov_params: GovParams::devnet(),
    }
}

impl Chain {
    pub fn new(powers: &[u64], holders: &[(Address, u128)]) -> Self {
        Self::with_config(powers, holders, AppConfig::default())
    }

    pub fn with_config(powers: &[u64], holders: &[(Address, u128)], config: AppConfig) -> Self {
        let app = BlockApplication::new(config, AppStores::in_memory(None)).expect("block application");
        app.init_chain(&genesis(powers, holders)).expect("genesis");
        Self {
            app,
            validators: (0..powers.len()).map(validator_wallet).collect(),
        }
    }

    pub fn height(&self) -> u64 {
        self.app.info().last_height
    }

    /// Run one block proposed by the first validator.
    pub async fn block(&self, txs: Vec<Vec<u8>>) -> BlockResult {
        let height = self.height() + 1;
        self.block_with(BlockHeader::new(height, self.validators[0].address), txs)
            .await
    }

    pub async fn block_with(&self, header: BlockHeader, txs: Vec<Vec<u8>>) -> BlockResult {
        let height = header.height;
        self.app.begin_block(header);
        let mut responses = Vec::with_capacity(txs.len());
        for raw in txs {
            responses.push(self.app.deliver_tx(raw).await);
        }
        let end = self.app.end_block(height).await;
        let commit = self.app.commit();
        BlockResult {
            responses,
            end,
            commit,
        }
    }

    /// Run empty blocks up to and including `height`, collecting their
    /// end-block responses.
    pub async fn advance_to(&self, height: u64) -> Vec<EndBlockResponse> {
        let mut ends = Vec::new();
        while self.height() < height {
            ends.push(self.block(vec![]).await.end);
        }
        ends
    }

    /// Committed account at the latest height.
    pub fn account(&self, addr: &Address) -> Option<Account> {
        let resp = self.app.query(&QueryRequest::new("account", addr.to_vec()));
        resp.is_ok()
            .then(|| serde_json::from_slice(&resp.value).expect("account json"))
    }

    pub fn balance(&self, addr: &Address) -> u128 {
        self.account(addr).map(|a| a.balance).unwrap_or(0)
    }
}

pub fn signed(wallet: &TestWallet, to: Address, nonce: u64, amount: u128, payload: TrxPayload) -> Vec<u8> {
    let mut trx = Trx::new(wallet.address, to, nonce, amount, GAS, payload);
    wallet.sign(&mut trx)
}

pub fn proposal(
    wallet: &TestWallet,
    nonce: u64,
    start_voting_height: u64,
    voting_period_blocks: u64,
    options: Vec<Vec<u8>>,
) -> Vec<u8> {
    let payload = ProposalPayload {
        message: "update parameters".into(),
        start_voting_height,
        voting_period_blocks,
        kind: ProposalKind::GovParams,
        options,
    };
    signed(wallet, wallet.address, nonce, 0, TrxPayload::Proposal(payload))
}

pub fn vote(wallet: &TestWallet, nonce: u64, tx_hash: Hash, choice: i32) -> Vec<u8> {
    signed(wallet, wallet.address, nonce, 0, TrxPayload::Voting { tx_hash, choice })
}
