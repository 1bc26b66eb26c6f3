//! Ballot-retrieval workload.
//!
//! Setup registers `ballots` voters, `items` votable items and one election,
//! then has every voter submit a ballot. Each submission reads back one of
//! those ballots, picked uniformly at random.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, trace};

use super::{CleanupReport, Workload, WorkloadBase};
use crate::config::{RoundArguments, WorkloadKind};
use crate::error::WorkloadError;
use crate::transport::{ContractFunction, Transport};
use crate::{ballot_id, AssetId, WorkerContext};

/// Submits one read-only `GetBallot` per transaction.
#[derive(Default)]
pub struct GetBallotWorkload {
    base: WorkloadBase,
    /// Ballots created at setup, indexed by voter sequence number.
    ballots: Vec<AssetId>,
}

impl GetBallotWorkload {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Workload for GetBallotWorkload {
    async fn initialize(
        &mut self,
        ctx: WorkerContext,
        args: &RoundArguments,
        transport: Arc<dyn Transport>,
    ) -> Result<(), WorkloadError> {
        let ballots = args.ballot_count()?;
        let items = args.item_count()?;

        let session = self.base.begin(ctx, args, transport)?;
        let mut roster = session.create_roster(ballots, items).await?;

        let worker = session.worker_index();
        self.ballots.reserve(roster.voters.len());
        for voter in &roster.voters {
            let ballot = ballot_id(voter, &roster.election);
            let ranking = session.shuffle_ranking(&mut roster.items)?;
            self.ballots.push(ballot.clone());
            let arguments = vec![voter.to_string(), roster.election.to_string(), ranking];
            session
                .create_asset(ContractFunction::NewBallot, ballot, arguments)
                .await;
        }
        info!(worker, count = self.ballots.len(), "created ballots");

        self.base.finish_setup()
    }

    async fn submit_one(&mut self) -> Result<(), WorkloadError> {
        let session = self.base.session_mut("submit to")?;
        let pick = session.rng.gen_range(0..self.ballots.len());
        let ballot = self.ballots[pick].clone();
        trace!(worker = session.worker_index(), %ballot, "reading ballot");

        session.tx_index += 1;
        session
            .invoke(ContractFunction::GetBallot, vec![ballot.into()], true)
            .await?;
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<CleanupReport, WorkloadError> {
        self.base.teardown().await
    }

    fn kind(&self) -> WorkloadKind {
        WorkloadKind::GetBallot
    }
}
