//! Vote-casting workload.
//!
//! Setup registers `tx` voters, `items` votable items and one election. Each
//! submission has the next voter cast a ballot ranking every item in a freshly
//! shuffled order.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

use super::{CleanupReport, Workload, WorkloadBase};
use crate::config::{RoundArguments, WorkloadKind};
use crate::error::WorkloadError;
use crate::transport::{ContractFunction, Transport};
use crate::{ballot_id, election_id, voter_id, AssetId, WorkerContext};

/// Submits one `CastVote` per transaction, each from a different voter.
///
/// A voter can only vote once, so a worker can submit at most as many votes as
/// it created voters. Once they are used up, `submit_one` fails with
/// [`WorkloadError::Exhausted`] without dispatching anything.
#[derive(Default)]
pub struct CastVoteWorkload {
    base: WorkloadBase,
    voters: usize,
    /// Reshuffled in place before every vote.
    items: Vec<AssetId>,
}

impl CastVoteWorkload {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Workload for CastVoteWorkload {
    async fn initialize(
        &mut self,
        ctx: WorkerContext,
        args: &RoundArguments,
        transport: Arc<dyn Transport>,
    ) -> Result<(), WorkloadError> {
        let voters = args.voter_count()?;
        let items = args.item_count()?;

        let session = self.base.begin(ctx, args, transport)?;
        let roster = session.create_roster(voters, items).await?;

        self.voters = roster.voters.len();
        self.items = roster.items;
        self.base.finish_setup()
    }

    async fn submit_one(&mut self) -> Result<(), WorkloadError> {
        let session = self.base.session_mut("submit to")?;
        let seq = session.tx_index;
        if seq >= self.voters {
            return Err(WorkloadError::Exhausted {
                requested: seq,
                voters: self.voters,
            });
        }

        let ranking = session.shuffle_ranking(&mut self.items)?;
        let voter = voter_id(session.worker_index(), seq);
        let election = election_id(session.worker_index());
        let ballot = ballot_id(&voter, &election);
        trace!(worker = session.worker_index(), %ballot, "casting vote");

        session.ledger.record(ballot);
        session.tx_index += 1;
        session
            .invoke(
                ContractFunction::CastVote,
                vec![voter.into(), election.into(), ranking],
                false,
            )
            .await?;
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<CleanupReport, WorkloadError> {
        self.base.teardown().await
    }

    fn kind(&self) -> WorkloadKind {
        WorkloadKind::CastVote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, Request};
    use crate::workload::tests::round_args;
    use crate::item_id;
    use std::collections::HashSet;

    const ARGS: &str = r#"{"contractId":"govote","invokerId":"User1","tx":3,"items":4,"seed":11}"#;

    async fn initialized(worker: usize) -> (CastVoteWorkload, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let mut workload = CastVoteWorkload::new();
        workload
            .initialize(WorkerContext::new(worker, 2, 0), &round_args(ARGS), transport.clone())
            .await
            .unwrap();
        (workload, transport)
    }

    #[tokio::test]
    async fn test_setup_then_two_votes() {
        let (mut workload, transport) = initialized(1).await;
        // 3 voters + 4 items + 1 election.
        assert_eq!(workload.base.ledger().unwrap().len(), 8);

        workload.submit_one().await.unwrap();
        assert_eq!(workload.base.ledger().unwrap().len(), 9);

        let votes = transport.requests_for(ContractFunction::CastVote);
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].arguments[0], "1_voter_0");
        assert_eq!(votes[0].arguments[1], "1_election");
        assert!(!votes[0].read_only);

        let ranking: Vec<AssetId> = serde_json::from_str(&votes[0].arguments[2]).unwrap();
        let ranked: HashSet<_> = ranking.iter().cloned().collect();
        let expected: HashSet<_> = (0..4).map(|i| item_id(1, i)).collect();
        assert_eq!(ranking.len(), 4);
        assert_eq!(ranked, expected);

        workload.submit_one().await.unwrap();
        let votes = transport.requests_for(ContractFunction::CastVote);
        assert!(votes[1].arguments[0].ends_with("_voter_1"));
        assert!(workload
            .base
            .ledger()
            .unwrap()
            .contains(&ballot_id(&voter_id(1, 1), &election_id(1))));
    }

    #[tokio::test]
    async fn test_exhaustion_is_a_hard_stop() {
        let (mut workload, transport) = initialized(0).await;
        for _ in 0..3 {
            workload.submit_one().await.unwrap();
        }

        let err = workload.submit_one().await.unwrap_err();
        assert!(err.is_exhausted());
        assert!(matches!(
            err,
            WorkloadError::Exhausted {
                requested: 3,
                voters: 3
            }
        ));
        // Nothing dispatched, nothing recorded.
        assert_eq!(transport.requests_for(ContractFunction::CastVote).len(), 3);
        assert_eq!(workload.base.ledger().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_failed_vote_is_still_tracked() {
        let (mut workload, transport) = initialized(0).await;
        transport.fail_function(ContractFunction::CastVote);

        let err = workload.submit_one().await.unwrap_err();
        assert!(matches!(
            err,
            WorkloadError::Dispatch {
                function: ContractFunction::CastVote,
                ..
            }
        ));
        assert_eq!(workload.base.ledger().unwrap().len(), 9);

        // The counter moved on: the next vote comes from the next voter.
        transport.heal();
        workload.submit_one().await.unwrap();
        let votes = transport.requests_for(ContractFunction::CastVote);
        assert_eq!(votes[1].arguments[0], "0_voter_1");

        // The ballot that never landed is reported as missing, not as a failure.
        let report = workload.cleanup().await.unwrap();
        assert_eq!(report, CleanupReport { deleted: 9, missing: 1 });
    }

    #[tokio::test]
    async fn test_cleanup_deletes_exactly_the_ledger() {
        let (mut workload, transport) = initialized(1).await;
        workload.submit_one().await.unwrap();
        workload.submit_one().await.unwrap();

        let tracked: Vec<String> = workload
            .base
            .ledger()
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect();
        let report = workload.cleanup().await.unwrap();

        let deleted: Vec<String> = transport
            .requests_for(ContractFunction::DeleteAsset)
            .into_iter()
            .map(|r| r.arguments[0].clone())
            .collect();
        assert_eq!(deleted, tracked);
        assert_eq!(report.deleted, 10);
        assert!(transport.live_assets().is_empty());

        // Single invocation only.
        assert!(matches!(
            workload.cleanup().await,
            Err(WorkloadError::Phase { .. })
        ));
        assert_eq!(transport.requests_for(ContractFunction::DeleteAsset).len(), 10);
    }

    #[tokio::test]
    async fn test_lifecycle_order_is_enforced() {
        let transport = Arc::new(MemoryTransport::new());
        let mut workload = CastVoteWorkload::new();
        assert!(matches!(
            workload.submit_one().await,
            Err(WorkloadError::Phase { operation: "submit to", .. })
        ));

        workload
            .initialize(WorkerContext::new(0, 1, 0), &round_args(ARGS), transport.clone())
            .await
            .unwrap();
        assert!(matches!(
            workload
                .initialize(WorkerContext::new(0, 1, 0), &round_args(ARGS), transport.clone())
                .await,
            Err(WorkloadError::Phase { operation: "initialize", .. })
        ));

        workload.cleanup().await.unwrap();
        assert!(matches!(
            workload.submit_one().await,
            Err(WorkloadError::Phase { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_voter_count_is_a_config_error() {
        let transport = Arc::new(MemoryTransport::new());
        let mut workload = CastVoteWorkload::new();
        let err = workload
            .initialize(
                WorkerContext::new(0, 1, 0),
                &round_args(r#"{"contractId":"govote","invokerId":"User1","items":4}"#),
                transport.clone(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkloadError::Config(crate::ConfigError::Missing("tx"))
        ));
        assert!(transport.requests().is_empty());
        // Nothing was set up, so there is nothing to delete.
        assert_eq!(workload.cleanup().await.unwrap(), CleanupReport::default());
    }

    #[tokio::test]
    async fn test_workers_never_share_asset_ids() {
        let transport = Arc::new(MemoryTransport::new());
        let mut tracked = HashSet::new();
        for worker in 0..3 {
            let mut workload = CastVoteWorkload::new();
            workload
                .initialize(WorkerContext::new(worker, 3, 0), &round_args(ARGS), transport.clone())
                .await
                .unwrap();
            for _ in 0..3 {
                workload.submit_one().await.unwrap();
            }
            for id in workload.base.ledger().unwrap().iter() {
                assert!(tracked.insert(id.clone()), "duplicate asset id {}", id);
            }
        }
        assert_eq!(tracked.len(), 3 * 11);
        assert_eq!(transport.live_assets().len(), 3 * 11);
    }

    #[tokio::test]
    async fn test_setup_continues_past_a_failed_voter() {
        let transport = Arc::new(MemoryTransport::new());
        transport
            .send_request(Request {
                contract_id: "govote".to_string(),
                function: ContractFunction::NewVoter,
                invoker_id: "User1".to_string(),
                arguments: vec!["0_voter_0".to_string(), "Taken".to_string()],
                read_only: false,
            })
            .await
            .unwrap();

        let mut workload = CastVoteWorkload::new();
        let err = workload
            .initialize(WorkerContext::new(0, 1, 0), &round_args(ARGS), transport.clone())
            .await
            .unwrap_err();
        match &err {
            WorkloadError::Setup { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].asset, voter_id(0, 0));
                assert_eq!(failures[0].function, ContractFunction::NewVoter);
                assert!(matches!(
                    failures[0].error,
                    crate::DispatchError::AssetExists(_)
                ));
            }
            other => panic!("unexpected setup result: {:?}", other),
        }

        // The pre-existing voter plus all 8 setup requests.
        assert_eq!(transport.requests().len(), 9);
        assert_eq!(transport.requests_for(ContractFunction::NewElection).len(), 1);
        assert_eq!(workload.base.ledger().unwrap().len(), 8);

        // Submissions are still accepted.
        workload.submit_one().await.unwrap();
        assert_eq!(workload.base.ledger().unwrap().len(), 9);
    }

    /// Item sequence numbers in the order each vote ranked them.
    async fn ranking_sequence(worker: usize, seed: u64) -> Vec<Vec<String>> {
        let transport = Arc::new(MemoryTransport::new());
        let args = round_args(&format!(
            r#"{{"contractId":"govote","invokerId":"User1","tx":8,"items":6,"seed":{}}}"#,
            seed
        ));
        let mut workload = CastVoteWorkload::new();
        workload
            .initialize(WorkerContext::new(worker, 4, 0), &args, transport.clone())
            .await
            .unwrap();
        for _ in 0..8 {
            workload.submit_one().await.unwrap();
        }

        let prefix = format!("{}_vitem_", worker);
        transport
            .requests_for(ContractFunction::CastVote)
            .iter()
            .map(|vote| {
                let ranking: Vec<AssetId> = serde_json::from_str(&vote.arguments[2]).unwrap();
                ranking
                    .iter()
                    .map(|item| item.as_str().trim_start_matches(prefix.as_str()).to_string())
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_seed_makes_rankings_reproducible_per_worker() {
        let first = ranking_sequence(1, 99).await;
        let again = ranking_sequence(1, 99).await;
        assert_eq!(first.len(), 8);
        assert_eq!(first, again);

        let other_worker = ranking_sequence(2, 99).await;
        assert_ne!(first, other_worker);
    }
}
