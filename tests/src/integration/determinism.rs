//! Identical inputs must produce identical app hashes, whichever delivery
//! path runs the transactions.

#[cfg(test)]
mod tests {
    use crate::support::{proposal, signed, vote, Chain, FUNDS, GAS};
    use sc_02_transaction::test_utils::TestWallet;
    use sc_02_transaction::TrxPayload;
    use sc_06_execution::ExecutorConfig;
    use sc_07_block_app::AppConfig;
    use shared_types::{Hash, ZERO_HASH};

    const POWERS: [u64; 4] = [10, 20, 30, 40];

    fn users(count: u64) -> Vec<TestWallet> {
        (0..count).map(|i| TestWallet::from_seed(500 + i)).collect()
    }

    fn funded(users: &[TestWallet]) -> Vec<([u8; 20], u128)> {
        users.iter().map(|w| (w.address, 10 * FUNDS)).collect()
    }

    fn async_config(shard_count: usize) -> AppConfig {
        AppConfig {
            executor: ExecutorConfig {
                shard_count,
                queue_capacity: 4,
                async_delivery: true,
            },
            ..AppConfig::default()
        }
    }

    /// Three blocks mixing every transaction type.
    fn workload(chain: &Chain, users: &[TestWallet]) -> Vec<Vec<Vec<u8>>> {
        let validator = &chain.validators[3];
        let proposal_tx = proposal(validator, 1, 3, 10, vec![br#"{"reward_per_power":2}"#.to_vec()]);
        let proposal_hash = sc_02_transaction::trx_hash(&proposal_tx);

        let mut first = vec![proposal_tx];
        for (i, user) in users.iter().enumerate() {
            first.push(user.signed_transfer(users[(i + 1) % users.len()].address, 1, 1_000, GAS));
        }

        // Delegations alternate between the first two validators.
        let second = users
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let to = chain.validators[i % 2].address;
                signed(user, to, 2, 2 * FUNDS, TrxPayload::Staking)
            })
            .collect();

        let third = chain
            .validators
            .iter()
            .map(|v| vote(v, if v.address == validator.address { 2 } else { 1 }, proposal_hash, 0))
            .collect();

        vec![first, second, third]
    }

    async fn run(chain: &Chain, blocks: Vec<Vec<Vec<u8>>>) -> Vec<Hash> {
        let mut hashes = Vec::new();
        for txs in blocks {
            hashes.push(chain.block(txs).await.commit.app_hash);
        }
        hashes
    }

    /// (hash, version) of gov, account and stake, in commit order.
    fn controller_states(chain: &Chain) -> [(Hash, u64); 3] {
        let app = &chain.app;
        [
            (app.gov_controller().working_hash().unwrap(), app.gov_controller().version()),
            (app.account_controller().working_hash().unwrap(), app.account_controller().version()),
            (app.stake_controller().working_hash().unwrap(), app.stake_controller().version()),
        ]
    }

    #[tokio::test]
    async fn test_replay_yields_identical_app_hashes() {
        let users = users(6);
        let a = Chain::new(&POWERS, &funded(&users));
        let b = Chain::new(&POWERS, &funded(&users));
        assert_eq!(a.app.info().last_app_hash, b.app.info().last_app_hash);

        let hashes_a = run(&a, workload(&a, &users)).await;
        let hashes_b = run(&b, workload(&b, &users)).await;

        assert_eq!(hashes_a, hashes_b);
        assert!(hashes_a.iter().all(|h| *h != ZERO_HASH));
        assert_ne!(hashes_a[0], hashes_a[1]);
        assert_eq!(controller_states(&a), controller_states(&b));
        assert_eq!(controller_states(&a).map(|(_, version)| version), [3, 3, 3]);
    }

    #[tokio::test]
    async fn test_empty_blocks_still_move_the_hash() {
        let chain = Chain::new(&POWERS, &[]);
        let hashes = run(&chain, vec![vec![], vec![]]).await;
        // Rewards accrue every block.
        assert_ne!(hashes[0], hashes[1]);
    }

    #[tokio::test]
    async fn test_sharded_delivery_matches_sync_delivery() {
        let users = users(8);
        let sync = Chain::new(&POWERS, &funded(&users));
        let sharded = Chain::with_config(&POWERS, &funded(&users), async_config(3));

        let sync_hashes = run(&sync, workload(&sync, &users)).await;

        let mut sharded_hashes = Vec::new();
        for txs in workload(&sharded, &users) {
            let count = txs.len();
            let block = sharded.block(txs).await;
            assert!(block.responses.iter().all(|r| r.log == "queued"));
            assert_eq!(block.end.tx_results.len(), count);
            assert!(block.end.tx_results.iter().all(|r| r.code == 0), "{:?}", block.end.tx_results);
            sharded_hashes.push(block.commit.app_hash);
        }

        assert_eq!(sync_hashes, sharded_hashes);
        for user in &users {
            assert_eq!(sync.account(&user.address), sharded.account(&user.address));
        }
    }

    #[tokio::test]
    async fn test_sender_order_survives_sharding() {
        let sender = TestWallet::from_seed(600);
        let receiver = [0x55; 20];
        let chain = Chain::with_config(&POWERS, &[(sender.address, FUNDS)], async_config(4));

        let txs = (1..=25).map(|n| sender.signed_transfer(receiver, n, 1, GAS)).collect();
        let block = chain.block(txs).await;

        assert!(block.end.tx_results.iter().all(|r| r.code == 0));
        assert_eq!(chain.account(&sender.address).unwrap().nonce, 25);
        assert_eq!(chain.balance(&receiver), 25);
    }
}
