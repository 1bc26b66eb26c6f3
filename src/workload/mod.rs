//! Workload lifecycle.
//!
//! This module provides the [`Workload`] trait implemented by the three
//! workload variants, and the per-worker session state they share: the asset
//! ledger, the submission counter, the random source and the dispatch helpers.

mod cast_vote;
mod get_ballot;
mod new_voter;

pub use cast_vote::CastVoteWorkload;
pub use get_ballot::GetBallotWorkload;
pub use new_voter::NewVoterWorkload;

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{RoundArguments, WorkloadKind};
use crate::error::{DispatchError, SetupFailure, TeardownFailure, WorkloadError};
use crate::transport::{ContractFunction, Response, Request, Transport};
use crate::{election_id, item_id, voter_id, AssetId, AssetLedger, WorkerContext};

/// Lifecycle of one workload instance, driven by the benchmark harness.
///
/// The three entry points are called strictly in order from a single task:
/// `initialize` once, `submit_one` once per measured transaction, `cleanup`
/// once. Each call issues its requests one at a time and awaits every one of
/// them before returning.
///
/// # Implementing a New Workload
///
/// ```ignore
/// // A further variant, living next to the others in this module.
///
/// pub struct ResultsWorkload {
///     base: WorkloadBase,
/// }
///
/// #[async_trait]
/// impl Workload for ResultsWorkload {
///     async fn initialize(&mut self, ctx, args, transport) -> Result<(), WorkloadError> {
///         let session = self.base.begin(ctx, args, transport)?;
///         // Create whatever the measured transactions need.
///         session.create_asset(function, id, arguments).await;
///         self.base.finish_setup()
///     }
///
///     async fn submit_one(&mut self) -> Result<(), WorkloadError> {
///         let session = self.base.session_mut("submit to")?;
///         // Build and dispatch exactly one request.
///         todo!()
///     }
///
///     async fn cleanup(&mut self) -> Result<CleanupReport, WorkloadError> {
///         self.base.teardown().await
///     }
/// }
/// ```
#[async_trait]
pub trait Workload: Send {
    /// Runs the setup phase: validates the round arguments and creates every
    /// asset the measured transactions depend on.
    ///
    /// A failed creation does not stop the remaining ones. When any failed,
    /// [`WorkloadError::Setup`] lists them once every step has been attempted;
    /// the workload is initialized all the same.
    async fn initialize(
        &mut self,
        ctx: WorkerContext,
        args: &RoundArguments,
        transport: Arc<dyn Transport>,
    ) -> Result<(), WorkloadError>;

    /// Builds and dispatches exactly one benchmark transaction.
    async fn submit_one(&mut self) -> Result<(), WorkloadError>;

    /// Issues one deletion per tracked asset, in the order they were recorded.
    ///
    /// Deletion failures do not stop the sweep; they are returned together once
    /// every deletion has been attempted. Assets the contract reports as
    /// missing are counted but not treated as failures.
    async fn cleanup(&mut self) -> Result<CleanupReport, WorkloadError>;

    fn kind(&self) -> WorkloadKind;
}

/// Creates an uninitialized workload of the given kind.
pub fn new_workload(kind: WorkloadKind) -> Box<dyn Workload> {
    match kind {
        WorkloadKind::CastVote => Box::new(CastVoteWorkload::new()),
        WorkloadKind::GetBallot => Box::new(GetBallotWorkload::new()),
        WorkloadKind::NewVoter => Box::new(NewVoterWorkload::new()),
    }
}

/// Outcome of a teardown sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Assets deleted successfully.
    pub deleted: usize,
    /// Assets the contract did not know about (their creation never landed).
    pub missing: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.deleted + self.missing
    }
}

// ============================================================================
// Lifecycle State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Created,
    /// Setup started but has not completed.
    Initializing,
    Initialized,
    CleanedUp,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Created => "not initialized",
            Phase::Initializing => "still initializing",
            Phase::Initialized => "initialized",
            Phase::CleanedUp => "cleaned up",
        }
    }
}

/// Lifecycle bookkeeping shared by every workload variant.
#[derive(Default)]
pub(crate) struct WorkloadBase {
    phase: Phase,
    session: Option<Session>,
}

impl WorkloadBase {
    /// Opens the worker session. Must be the first step of `initialize`.
    pub(crate) fn begin(
        &mut self,
        ctx: WorkerContext,
        args: &RoundArguments,
        transport: Arc<dyn Transport>,
    ) -> Result<&mut Session, WorkloadError> {
        if self.phase != Phase::Created {
            return Err(WorkloadError::Phase {
                operation: "initialize",
                phase: self.phase.as_str(),
            });
        }
        let contract_id = args.contract_id()?.to_string();
        let invoker_id = args.invoker_id()?.to_string();

        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(ctx.worker_index as u64)),
            None => StdRng::from_entropy(),
        };

        self.phase = Phase::Initializing;
        Ok(self.session.insert(Session {
            ctx,
            contract_id,
            invoker_id,
            transport,
            ledger: AssetLedger::new(),
            rng,
            tx_index: 0,
            setup_failures: Vec::new(),
        }))
    }

    /// Marks setup as complete; submissions are accepted from now on.
    ///
    /// Returns the creations that failed along the way, if any.
    pub(crate) fn finish_setup(&mut self) -> Result<(), WorkloadError> {
        if self.phase == Phase::Initializing {
            self.phase = Phase::Initialized;
        }
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Ok(()),
        };
        let failures = std::mem::take(&mut session.setup_failures);
        info!(
            worker = session.ctx.worker_index,
            assets = session.ledger.len(),
            failed = failures.len(),
            "setup complete"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(WorkloadError::Setup { failures })
        }
    }

    /// Returns the session of a fully initialized workload.
    pub(crate) fn session_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut Session, WorkloadError> {
        match (self.phase, self.session.as_mut()) {
            (Phase::Initialized, Some(session)) => Ok(session),
            (phase, _) => Err(WorkloadError::Phase {
                operation,
                phase: phase.as_str(),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn ledger(&self) -> Option<&AssetLedger> {
        self.session.as_ref().map(|s| &s.ledger)
    }

    /// Deletes every tracked asset, once.
    pub(crate) async fn teardown(&mut self) -> Result<CleanupReport, WorkloadError> {
        if self.phase == Phase::CleanedUp {
            return Err(WorkloadError::Phase {
                operation: "clean up",
                phase: self.phase.as_str(),
            });
        }
        self.phase = Phase::CleanedUp;

        let session = match self.session.as_ref() {
            Some(session) => session,
            None => return Ok(CleanupReport::default()),
        };
        let worker = session.ctx.worker_index;
        info!(worker, assets = session.ledger.len(), "cleaning up");

        let mut report = CleanupReport::default();
        let mut failures = Vec::new();
        for asset in session.ledger.iter() {
            debug!(worker, %asset, "deleting asset");
            match session
                .send(ContractFunction::DeleteAsset, vec![asset.to_string()], false)
                .await
            {
                Ok(_) => report.deleted += 1,
                Err(DispatchError::AssetNotFound(_)) => {
                    warn!(worker, %asset, "asset was never created, skipping");
                    report.missing += 1;
                }
                Err(error) => {
                    warn!(worker, %asset, %error, "failed to delete asset");
                    failures.push(TeardownFailure {
                        asset: asset.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            worker,
            deleted = report.deleted,
            missing = report.missing,
            failed = failures.len(),
            "cleanup complete"
        );
        if failures.is_empty() {
            Ok(report)
        } else {
            Err(WorkloadError::Teardown { report, failures })
        }
    }
}

// ============================================================================
// Worker Session
// ============================================================================

/// State owned by one initialized worker.
pub(crate) struct Session {
    pub(crate) ctx: WorkerContext,
    contract_id: String,
    invoker_id: String,
    transport: Arc<dyn Transport>,
    pub(crate) ledger: AssetLedger,
    pub(crate) rng: StdRng,
    /// Incremented once per submission.
    pub(crate) tx_index: usize,
    setup_failures: Vec<SetupFailure>,
}

/// Assets created by the shared setup steps.
pub(crate) struct Roster {
    pub(crate) voters: Vec<AssetId>,
    pub(crate) items: Vec<AssetId>,
    pub(crate) election: AssetId,
}

impl Session {
    pub(crate) fn worker_index(&self) -> usize {
        self.ctx.worker_index
    }

    async fn send(
        &self,
        function: ContractFunction,
        arguments: Vec<String>,
        read_only: bool,
    ) -> Result<Response, DispatchError> {
        let request = Request {
            contract_id: self.contract_id.clone(),
            function,
            invoker_id: self.invoker_id.clone(),
            arguments,
            read_only,
        };
        self.transport.send_request(request).await
    }

    /// Dispatches one request and waits for it to settle.
    pub(crate) async fn invoke(
        &self,
        function: ContractFunction,
        arguments: Vec<String>,
        read_only: bool,
    ) -> Result<Response, WorkloadError> {
        self.send(function, arguments, read_only)
            .await
            .map_err(|source| {
                warn!(worker = self.ctx.worker_index, %function, %source, "dispatch failed");
                WorkloadError::Dispatch { function, source }
            })
    }

    /// Records `id`, then dispatches its creation. A failure is logged and kept
    /// for [`WorkloadBase::finish_setup`] instead of ending the setup phase.
    pub(crate) async fn create_asset(
        &mut self,
        function: ContractFunction,
        id: AssetId,
        arguments: Vec<String>,
    ) {
        let worker = self.worker_index();
        debug!(worker, asset = %id, %function, "creating asset");
        self.ledger.record(id.clone());
        if let Err(error) = self.send(function, arguments, false).await {
            warn!(worker, asset = %id, %function, %error, "setup request failed");
            self.setup_failures.push(SetupFailure {
                function,
                asset: id,
                error,
            });
        }
    }

    /// Permutes `items` in place and returns the new ordering as a JSON array.
    pub(crate) fn shuffle_ranking(&mut self, items: &mut [AssetId]) -> Result<String, WorkloadError> {
        items.shuffle(&mut self.rng);
        Ok(serde_json::to_string(items)?)
    }

    /// Creates `voters` voters, `items` votable items and the worker's election,
    /// in that order. Every id is recorded before its request is dispatched, and
    /// every creation is attempted whatever happened to the previous ones.
    pub(crate) async fn create_roster(
        &mut self,
        voters: usize,
        items: usize,
    ) -> Result<Roster, WorkloadError> {
        let worker = self.worker_index();

        let mut voter_ids = Vec::with_capacity(voters);
        for i in 0..voters {
            let id = voter_id(worker, i);
            voter_ids.push(id.clone());
            let arguments = vec![id.to_string(), format!("Voter{}", i)];
            self.create_asset(ContractFunction::NewVoter, id, arguments)
                .await;
        }
        info!(worker, count = voters, "created voters");

        let mut item_ids = Vec::with_capacity(items);
        for i in 0..items {
            let id = item_id(worker, i);
            item_ids.push(id.clone());
            let arguments = vec![
                id.to_string(),
                format!("Candidate{}", i),
                "Description".to_string(),
            ];
            self.create_asset(ContractFunction::NewVotableItem, id, arguments)
                .await;
        }
        info!(worker, count = items, "created votable items");

        let election = election_id(worker);
        let arguments = vec![
            election.to_string(),
            "Election".to_string(),
            serde_json::to_string(&voter_ids)?,
            serde_json::to_string(&item_ids)?,
        ];
        self.create_asset(ContractFunction::NewElection, election.clone(), arguments)
            .await;

        Ok(Roster {
            voters: voter_ids,
            items: item_ids,
            election,
        })
    }
}
