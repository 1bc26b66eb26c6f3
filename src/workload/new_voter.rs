//! Voter-creation workload. No setup; every submission registers a new voter.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

use super::{CleanupReport, Workload, WorkloadBase};
use crate::config::{RoundArguments, WorkloadKind};
use crate::error::WorkloadError;
use crate::transport::{ContractFunction, Transport};
use crate::{voter_id, WorkerContext};

/// Submits one `NewVoter` per transaction.
#[derive(Default)]
pub struct NewVoterWorkload {
    base: WorkloadBase,
    voter_name: String,
}

impl NewVoterWorkload {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Workload for NewVoterWorkload {
    async fn initialize(
        &mut self,
        ctx: WorkerContext,
        args: &RoundArguments,
        transport: Arc<dyn Transport>,
    ) -> Result<(), WorkloadError> {
        self.base.begin(ctx, args, transport)?;
        self.voter_name = args.voter_name().to_string();
        self.base.finish_setup()
    }

    async fn submit_one(&mut self) -> Result<(), WorkloadError> {
        let session = self.base.session_mut("submit to")?;
        let voter = voter_id(session.worker_index(), session.tx_index);
        trace!(worker = session.worker_index(), %voter, "registering voter");

        session.ledger.record(voter.clone());
        session.tx_index += 1;
        session
            .invoke(
                ContractFunction::NewVoter,
                vec![voter.into(), self.voter_name.clone()],
                false,
            )
            .await?;
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<CleanupReport, WorkloadError> {
        self.base.teardown().await
    }

    fn kind(&self) -> WorkloadKind {
        WorkloadKind::NewVoter
    }
}
