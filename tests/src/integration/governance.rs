//! Proposal lifecycle through full blocks: creation, voting, freezing,
//! application, punishment and duplicate submissions.

#[cfg(test)]
mod tests {
    use crate::support::{proposal, vote, Chain, GAS};
    use sc_02_transaction::test_utils::TestWallet;
    use sc_02_transaction::{TrxContextBuilder, TrxHandlers};
    use sc_05_governance::{majority_threshold, ProposalState};
    use sc_06_execution::dispatch;
    use sc_07_block_app::{AppResolver, BlockHeader, Evidence, QueryRequest};
    use shared_types::{AppError, ExecMode, GovParams, Hash};
    use std::sync::Arc;

    const EXEC: ExecMode = ExecMode::Execution;

    /// Fourteen validators holding powers 1..=14.
    fn fourteen() -> Chain {
        let powers: Vec<u64> = (1..=14).collect();
        Chain::new(&powers, &[])
    }

    fn raise_gas() -> Vec<u8> {
        br#"{"version":2,"min_trx_gas":20}"#.to_vec()
    }

    fn keep_gas() -> Vec<u8> {
        br#"{"version":2}"#.to_vec()
    }

    /// Proposal from validator 0 in block 1: voting [2, 12), apply at 22.
    async fn propose(chain: &Chain) -> Hash {
        let raw = proposal(&chain.validators[0], 1, 2, 10, vec![raise_gas(), keep_gas()]);
        let block = chain.block(vec![raw]).await;
        assert_eq!(block.responses[0].code, 0, "{}", block.responses[0].log);
        block.responses[0].tx_hash.unwrap()
    }

    async fn cast(chain: &Chain, voters: &[TestWallet], tx_hash: Hash, choice: i32) {
        let votes = voters.iter().map(|w| vote(w, 1, tx_hash, choice)).collect();
        let block = chain.block(votes).await;
        for resp in &block.responses {
            assert_eq!(resp.code, 0, "{}", resp.log);
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_two_thirds_majority_is_applied() {
        let chain = fourteen();
        let gov = chain.app.gov_controller();
        let threshold = majority_threshold(105);
        assert_eq!(threshold, 70);

        let tx_hash = propose(&chain).await;
        let (created, state) = gov.find_proposal(&tx_hash, EXEC).unwrap().unwrap();
        assert_eq!(state, ProposalState::Active);
        assert_eq!(created.voters.len(), 14);
        assert_eq!(created.total_voting_power, 105);
        assert_eq!(created.majority_power, threshold);
        assert_eq!((created.end_voting_height, created.apply_height), (12, 22));

        // Block 2: the seven strongest validators (8..=14) vote option 0.
        cast(&chain, &chain.validators[7..], tx_hash, 0).await;
        let major = gov.update_major_option(&tx_hash, EXEC).unwrap().unwrap();
        assert_eq!(major.option, raise_gas());
        assert_eq!(major.votes, 77);
        assert!(major.votes >= threshold);
        assert_eq!(gov.update_major_option(&tx_hash, EXEC).unwrap(), Some(major.clone()));

        // Voting closes at 12; block 12 still sees the proposal active.
        let ends = chain.advance_to(12).await;
        assert!(ends.iter().all(|end| end.proposals_frozen.is_empty()));
        assert!(gov.frozen_proposals(EXEC).unwrap().is_empty());

        let block = chain.block(vec![]).await;
        assert_eq!(block.commit.height, 13);
        assert_eq!(block.end.proposals_frozen, vec![tx_hash]);
        let (frozen, state) = gov.find_proposal(&tx_hash, EXEC).unwrap().unwrap();
        assert_eq!(state, ProposalState::Frozen);
        assert_eq!(frozen.major_option, Some(0));
        assert!(gov.active_proposals(EXEC).unwrap().is_empty());

        // A late vote is refused.
        let late = chain
            .block(vec![vote(&chain.validators[0], 2, tx_hash, 1)])
            .await;
        assert_eq!(late.responses[0].code, 10);

        let ends = chain.advance_to(21).await;
        assert!(ends.iter().all(|end| end.proposals_applied.is_empty()));
        assert_eq!(gov.params(EXEC).unwrap(), GovParams::devnet());

        let block = chain.block(vec![]).await;
        assert_eq!(block.commit.height, 22);
        assert_eq!(block.end.proposals_applied, vec![tx_hash]);

        let mut expected = GovParams::devnet();
        expected.version = 2;
        expected.min_trx_gas = 20;
        assert_eq!(gov.params(EXEC).unwrap(), expected);
        assert!(gov.find_proposal(&tx_hash, EXEC).unwrap().is_none());

        let resp = chain.app.query(&QueryRequest::new("gov_params", vec![]));
        assert_eq!(GovParams::from_json(&resp.value).unwrap(), expected);
        let resp = chain.app.query(&QueryRequest::new("proposal", tx_hash.to_vec()));
        assert_eq!(resp.code, 12);

        // The new minimum gas binds the next block.
        let sender = &chain.validators[1];
        let block = chain
            .block(vec![
                sender.signed_transfer([0x44; 20], 1, 5, GAS),
                sender.signed_transfer([0x44; 20], 1, 5, 2 * GAS),
            ])
            .await;
        assert_eq!(block.responses[0].code, 3);
        assert_eq!(block.responses[1].code, 0, "{}", block.responses[1].log);
    }

    #[tokio::test]
    async fn test_proposal_without_majority_changes_nothing() {
        let chain = fourteen();
        let gov = chain.app.gov_controller();
        let tx_hash = propose(&chain).await;

        // 14 + 13 + 12 = 39, short of 70.
        cast(&chain, &chain.validators[11..], tx_hash, 0).await;
        assert_eq!(gov.update_major_option(&tx_hash, EXEC).unwrap(), None);

        chain.advance_to(13).await;
        let (frozen, state) = gov.find_proposal(&tx_hash, EXEC).unwrap().unwrap();
        assert_eq!(state, ProposalState::Frozen);
        assert_eq!(frozen.major_option, None);

        let ends = chain.advance_to(22).await;
        assert_eq!(ends.last().unwrap().proposals_applied, vec![tx_hash]);
        assert_eq!(gov.params(EXEC).unwrap(), GovParams::devnet());
        assert!(gov.find_proposal(&tx_hash, EXEC).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_split_vote_recounts_on_choice_change() {
        let chain = fourteen();
        let gov = chain.app.gov_controller();
        let tx_hash = propose(&chain).await;

        // Option 1 gets 14 + 13 + 12 + 11 + 10 = 60, option 0 gets 9 + 8 = 17.
        cast(&chain, &chain.validators[9..], tx_hash, 1).await;
        cast(&chain, &chain.validators[7..9], tx_hash, 0).await;
        assert_eq!(gov.update_major_option(&tx_hash, EXEC).unwrap(), None);

        // Validators 8 and 9 switch to option 1: 60 + 17 = 77.
        let switch = chain.validators[7..9]
            .iter()
            .map(|w| vote(w, 2, tx_hash, 1))
            .collect();
        chain.block(switch).await;

        let (current, _) = gov.find_proposal(&tx_hash, EXEC).unwrap().unwrap();
        assert_eq!(current.options[0].votes, 0);
        assert_eq!(current.options[1].votes, 77);
        assert_eq!(current.major_option, Some(1));
        assert!(current.sum_votes() <= current.total_voting_power);
    }

    #[tokio::test]
    async fn test_evidence_slashes_votes_and_keeps_majority() {
        let chain = fourteen();
        let gov = chain.app.gov_controller();
        let tx_hash = propose(&chain).await;
        cast(&chain, &chain.validators[7..], tx_hash, 0).await;

        let offender = chain.validators[13].address;
        let mut header = BlockHeader::new(3, chain.validators[0].address);
        header.byzantine_validators.push(Evidence {
            address: offender,
            height: 2,
        });
        let block = chain.block_with(header, vec![]).await;
        assert!(block
            .end
            .validator_updates
            .iter()
            .any(|u| u.address == offender && u.power == 7));

        let (p, _) = gov.find_proposal(&tx_hash, EXEC).unwrap().unwrap();
        assert_eq!(p.find_voter(&offender).unwrap().power, 7);
        assert_eq!(p.total_voting_power, 98);
        assert_eq!(p.options[0].votes, 70);
        assert_eq!(p.major_option, Some(0));
        assert!(p.sum_votes() <= p.total_voting_power);
    }

    #[tokio::test]
    async fn test_non_validator_cannot_propose_or_vote() {
        let outsider = TestWallet::from_seed(77);
        let powers: Vec<u64> = (1..=14).collect();
        let chain = Chain::new(&powers, &[(outsider.address, 1_000)]);

        let tx_hash = propose(&chain).await;

        let block = chain
            .block(vec![
                proposal(&outsider, 1, 5, 10, vec![raise_gas()]),
                vote(&outsider, 1, tx_hash, 0),
            ])
            .await;
        assert_eq!(block.responses[0].code, AppError::NotValidator.code());
        assert_eq!(block.responses[1].code, AppError::NoRight.code());
    }

    // =========================================================================
    // DUPLICATES
    // =========================================================================

    #[tokio::test]
    async fn test_duplicate_proposal_is_rejected() {
        let chain = Chain::new(&[10, 20], &[]);
        let app = &chain.app;
        let gov = app.gov_controller();

        let handlers = TrxHandlers {
            gov: app.gov_controller().clone(),
            account: app.account_controller().clone(),
            stake: app.stake_controller().clone(),
        };
        let resolver = AppResolver::new(app.account_controller().clone(), gov.clone(), handlers);
        let builder = TrxContextBuilder::new(Arc::new(resolver));

        let raw = proposal(&chain.validators[1], 1, 5, 10, vec![raise_gas()]);
        let mut ctx = builder.build(&raw, 1, EXEC).unwrap();
        dispatch(&mut ctx).unwrap();

        let err = dispatch(&mut ctx).unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
        assert_eq!(err.code(), 13);

        let active = gov.active_proposals(EXEC).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].tx_hash, ctx.tx_hash);
        assert!(gov.find_proposal(&ctx.tx_hash, EXEC).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resubmitted_proposal_bytes_create_one_proposal() {
        let chain = Chain::new(&[10, 20], &[]);
        let raw = proposal(&chain.validators[1], 1, 5, 10, vec![raise_gas()]);

        let block = chain.block(vec![raw.clone(), raw.clone()]).await;
        assert_eq!(block.responses[0].code, 0, "{}", block.responses[0].log);
        assert_ne!(block.responses[1].code, 0);

        let block = chain.block(vec![raw]).await;
        assert_ne!(block.responses[0].code, 0);

        assert_eq!(chain.app.gov_controller().active_proposals(EXEC).unwrap().len(), 1);
        let resp = chain
            .app
            .query(&QueryRequest::new("proposal", only_proposal(&chain).to_vec()));
        assert!(resp.is_ok(), "{}", resp.log);
    }

    fn only_proposal(chain: &Chain) -> Hash {
        chain.app.gov_controller().active_proposals(EXEC).unwrap()[0].tx_hash
    }
}
