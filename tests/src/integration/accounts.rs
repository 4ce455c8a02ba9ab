//! Transfers, staking and unstaking across blocks.

#[cfg(test)]
mod tests {
    use crate::support::{signed, Chain, FUNDS, GAS};
    use sc_02_transaction::test_utils::TestWallet;
    use sc_02_transaction::{TrxContextBuilder, TrxHandlers, TrxPayload};
    use sc_04_staking::{Stake, ValidatorUpdate};
    use sc_06_execution::{dispatch, execute_all, validate_all};
    use sc_07_block_app::{AppResolver, BlockHeader, QueryRequest};
    use shared_types::{AppError, ExecMode, Hash};
    use std::sync::Arc;

    const EXEC: ExecMode = ExecMode::Execution;

    // =========================================================================
    // TRANSFERS
    // =========================================================================

    #[tokio::test]
    async fn test_transfer_to_new_address() {
        let sender = TestWallet::from_seed(1);
        let receiver = [0xAB; 20];
        let chain = Chain::new(&[10], &[(sender.address, 1_000)]);

        let block = chain
            .block(vec![sender.signed_transfer(receiver, 1, 100, GAS)])
            .await;

        assert_eq!(block.responses[0].code, 0, "{}", block.responses[0].log);
        assert_eq!(block.commit.height, 1);

        let account = chain.account(&sender.address).unwrap();
        assert_eq!(account.balance, 890);
        assert_eq!(account.nonce, 1);
        assert_eq!(chain.balance(&receiver), 100);
    }

    #[tokio::test]
    async fn test_rejected_transfer_leaves_sender_untouched() {
        let sender = TestWallet::from_seed(2);
        let chain = Chain::new(&[10], &[(sender.address, 1_000)]);

        let block = chain
            .block(vec![sender.signed_transfer([0xCD; 20], 1, 995, GAS)])
            .await;

        let expected = AppError::InsufficientFunds {
            required: 1_005,
            available: 1_000,
        };
        assert_eq!(block.responses[0].code, expected.code());
        let account = chain.account(&sender.address).unwrap();
        assert_eq!((account.balance, account.nonce), (1_000, 0));
        assert!(chain.account(&[0xCD; 20]).is_none());
    }

    #[tokio::test]
    async fn test_nonces_chain_across_blocks() {
        let sender = TestWallet::from_seed(3);
        let receiver = [0x11; 20];
        let chain = Chain::new(&[10], &[(sender.address, 1_000)]);

        for nonce in 1..=3 {
            let block = chain
                .block(vec![sender.signed_transfer(receiver, nonce, 50, GAS)])
                .await;
            assert_eq!(block.responses[0].code, 0);
        }

        let replay = chain
            .block(vec![sender.signed_transfer(receiver, 3, 50, GAS)])
            .await;
        assert_eq!(replay.responses[0].code, 5);

        assert_eq!(chain.balance(&receiver), 150);
        assert_eq!(chain.balance(&sender.address), 1_000 - 3 * 60);
    }

    #[tokio::test]
    async fn test_history_queries_see_old_balances() {
        let sender = TestWallet::from_seed(4);
        let receiver = [0x22; 20];
        let chain = Chain::new(&[10], &[(sender.address, 1_000)]);

        chain.block(vec![]).await;
        chain
            .block(vec![sender.signed_transfer(receiver, 1, 100, GAS)])
            .await;

        let at_one = chain
            .app
            .query(&QueryRequest::new("account", sender.address.to_vec()).at(1));
        assert!(at_one.is_ok());
        let account: shared_types::Account = serde_json::from_slice(&at_one.value).unwrap();
        assert_eq!(account.balance, 1_000);
        assert_eq!(chain.balance(&sender.address), 890);
    }

    // =========================================================================
    // STAKING
    // =========================================================================

    fn stakes_of(chain: &Chain, owner: &[u8; 20]) -> Vec<Stake> {
        let resp = chain.app.query(&QueryRequest::new("stakes", owner.to_vec()));
        assert!(resp.is_ok(), "{}", resp.log);
        serde_json::from_slice(&resp.value).unwrap()
    }

    #[tokio::test]
    async fn test_delegation_then_unstake_refund() {
        let delegator = TestWallet::from_seed(5);
        let chain = Chain::new(&[10], &[(delegator.address, 10 * FUNDS)]);
        let validator = chain.validators[0].clone();
        let lazy = chain.app.gov_controller().params(shared_types::ExecMode::Execution).unwrap().lazy_unstaking_blocks;

        // Block 1: delegate three power units to the validator.
        let stake_tx = signed(&delegator, validator.address, 1, 3 * FUNDS, TrxPayload::Staking);
        let block = chain.block(vec![stake_tx]).await;
        assert_eq!(block.responses[0].code, 0, "{}", block.responses[0].log);
        assert_eq!(
            block.end.validator_updates,
            vec![ValidatorUpdate {
                address: validator.address,
                pub_key: validator.pubkey(),
                power: 13,
            }]
        );
        assert_eq!(chain.balance(&delegator.address), 7 * FUNDS - u128::from(GAS));
        let stake_hash: Hash = block.responses[0].tx_hash.unwrap();
        let stakes = stakes_of(&chain, &delegator.address);
        assert_eq!(stakes.len(), 1);
        assert_eq!(stakes[0].tx_hash, stake_hash);
        assert_eq!(stakes[0].power, 3);

        // Block 2: unstake. Power drops at once, the amount stays frozen.
        let unstake_tx = signed(
            &delegator,
            delegator.address,
            2,
            0,
            TrxPayload::Unstaking { tx_hash: stake_hash },
        );
        let block = chain.block(vec![unstake_tx]).await;
        assert_eq!(block.responses[0].code, 0, "{}", block.responses[0].log);
        assert_eq!(block.end.validator_updates[0].power, 10);
        assert!(stakes_of(&chain, &delegator.address).is_empty());
        assert_eq!(chain.balance(&delegator.address), 7 * FUNDS - 2 * u128::from(GAS));

        // The refund lands at height 2 + lazy_unstaking_blocks.
        let ends = chain.advance_to(2 + lazy - 1).await;
        assert!(ends.iter().all(|end| end.refunded_stakes == 0));
        let block = chain.block(vec![]).await;
        assert_eq!(block.commit.height, 2 + lazy);
        assert_eq!(block.end.refunded_stakes, 1);
        assert_eq!(chain.balance(&delegator.address), 10 * FUNDS - 2 * u128::from(GAS));
    }

    #[tokio::test]
    async fn test_stake_failing_after_debit_leaves_sender_untouched() {
        let owner = TestWallet::from_seed(7);
        let delegator = TestWallet::from_seed(8);
        let chain = Chain::new(
            &[10],
            &[(owner.address, 10 * FUNDS), (delegator.address, 10 * FUNDS)],
        );
        let app = &chain.app;

        // Block 1: the owner becomes a delegatee through a self stake.
        let block = chain
            .block(vec![signed(&owner, owner.address, 1, FUNDS, TrxPayload::Staking)])
            .await;
        assert_eq!(block.responses[0].code, 0, "{}", block.responses[0].log);
        let self_stake = block.responses[0].tx_hash.unwrap();

        let handlers = TrxHandlers {
            gov: app.gov_controller().clone(),
            account: app.account_controller().clone(),
            stake: app.stake_controller().clone(),
        };
        let resolver = AppResolver::new(app.account_controller().clone(), app.gov_controller().clone(), handlers);
        let builder = TrxContextBuilder::new(Arc::new(resolver));

        // The delegation passes validation while the delegatee exists...
        let raw = signed(&delegator, owner.address, 1, 2 * FUNDS, TrxPayload::Staking);
        let mut delegation = builder.build(&raw, 2, EXEC).unwrap();
        validate_all(&mut delegation).unwrap();

        // ...then the owner's unstake, run in between, removes it.
        let raw = signed(&owner, owner.address, 2, 0, TrxPayload::Unstaking { tx_hash: self_stake });
        let mut unstake = builder.build(&raw, 2, EXEC).unwrap();
        dispatch(&mut unstake).unwrap();
        assert!(app
            .stake_controller()
            .find_delegatee(&owner.address, EXEC)
            .unwrap()
            .is_none());

        let err = execute_all(&mut delegation).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "{err}");

        let sender = app
            .account_controller()
            .find_account(&delegator.address, EXEC)
            .unwrap()
            .unwrap();
        assert_eq!(sender.balance, 10 * FUNDS);
        assert_eq!(sender.nonce, 0);
        assert!(app
            .stake_controller()
            .find_stake(&delegation.tx_hash, EXEC)
            .unwrap()
            .is_none());

        // The same transaction still goes through once a delegatee exists.
        let raw = signed(&delegator, chain.validators[0].address, 1, 2 * FUNDS, TrxPayload::Staking);
        let mut retry = builder.build(&raw, 2, EXEC).unwrap();
        dispatch(&mut retry).unwrap();
        let sender = app
            .account_controller()
            .find_account(&delegator.address, EXEC)
            .unwrap()
            .unwrap();
        assert_eq!(sender.balance, 8 * FUNDS - u128::from(GAS));
        assert_eq!(sender.nonce, 1);
    }

    fn reward_of(chain: &Chain, addr: &[u8; 20]) -> sc_04_staking::Reward {
        let resp = chain.app.query(&QueryRequest::new("reward", addr.to_vec()));
        assert!(resp.is_ok(), "{}", resp.log);
        serde_json::from_slice(&resp.value).unwrap()
    }

    #[tokio::test]
    async fn test_proposer_collects_block_fees_next_block() {
        let sender = TestWallet::from_seed(6);
        let chain = Chain::new(&[10, 20], &[(sender.address, 1_000)]);
        let first = chain.validators[0].address;
        let second = chain.validators[1].address;

        // Block 1 is proposed by the second validator and collects 30 gas.
        chain
            .block_with(
                BlockHeader::new(1, second),
                vec![
                    sender.signed_transfer([0x33; 20], 1, 1, GAS),
                    sender.signed_transfer([0x33; 20], 2, 1, 2 * GAS),
                ],
            )
            .await;
        assert_eq!(reward_of(&chain, &second).cumulated, 20);

        // Block 2 pays block 1's fees to block 1's proposer.
        let header = BlockHeader::new(2, first).with_last_proposer(second);
        chain.block_with(header, vec![]).await;

        let reward = reward_of(&chain, &second);
        assert_eq!(reward.cumulated, 20 + 20 + 3 * u128::from(GAS));
        assert_eq!(reward.last_height, 2);
        assert_eq!(reward_of(&chain, &first).cumulated, 10 + 10);
    }
}
