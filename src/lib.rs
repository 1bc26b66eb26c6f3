//! Benchmark workloads for a ranked-choice voting contract.
//!
//! This crate generates the input transactions a benchmark harness submits to a
//! voting contract, and keeps track of every asset those transactions create so
//! the round can be cleaned up afterwards.
//!
//! # Architecture
//!
//! The framework is organized around three main concepts:
//!
//! - **Workload**: A per-worker state machine with three lifecycle entry points
//!   (`initialize`, `submit_one`, `cleanup`)
//! - **Transport**: The request dispatcher a workload submits contract calls through
//! - **Asset Ledger**: The insertion-ordered record of every asset id a worker created
//!
//! Every identifier is namespaced by the worker index, so any number of workers
//! can run concurrently without coordinating.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use vote_workload::{
//!     new_workload, MemoryTransport, RoundArguments, WorkerContext, Workload, WorkloadKind,
//! };
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! // Round arguments as the harness would hand them over.
//! let args = RoundArguments::from_json_str(
//!     r#"{"contractId":"govote","invokerId":"User1","tx":3,"items":4}"#,
//! )?;
//! let transport = Arc::new(MemoryTransport::new());
//!
//! let mut workload = new_workload(WorkloadKind::CastVote);
//! workload.initialize(WorkerContext::new(0, 1, 0), &args, transport.clone()).await?;
//! workload.submit_one().await?;
//!
//! // 3 voters + 4 items + 1 election + 1 ballot.
//! let report = workload.cleanup().await?;
//! assert_eq!(report.deleted, 9);
//! # Ok::<(), vote_workload::WorkloadError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod round;
pub mod transport;
pub mod workload;

pub use config::{RoundArguments, WorkloadKind};
pub use error::{ConfigError, DispatchError, SetupFailure, TeardownFailure, WorkloadError};
pub use round::{run_round, run_worker, RoundConfig, RoundReport, WorkerReport};
pub use transport::{ContractFunction, MemoryTransport, Request, Response, Transport};
pub use workload::{new_workload, CleanupReport, Workload};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Worker Identity
// ============================================================================

/// Identity of one worker within a benchmark round.
///
/// Assigned once by the harness; immutable for the lifetime of the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerContext {
    /// Index of this worker, used to namespace every asset id it creates.
    pub worker_index: usize,
    /// Number of workers taking part in the round.
    pub total_workers: usize,
    /// Index of the round within the benchmark.
    pub round_index: usize,
}

impl WorkerContext {
    /// Creates the context for worker `worker_index` of `total_workers` in round `round_index`.
    pub fn new(worker_index: usize, total_workers: usize, round_index: usize) -> Self {
        Self {
            worker_index,
            total_workers,
            round_index,
        }
    }
}

// ============================================================================
// Identifier Scheme
// ============================================================================

/// Identifier of one on-ledger asset (voter, votable item, election or ballot).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Borrows the id as it is sent to the contract.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

/// Kinds of sequenced assets. Ballots are keyed by their voter and election instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Voter,
    VotableItem,
}

impl AssetKind {
    /// Tag embedded in the asset id.
    pub fn tag(&self) -> &'static str {
        match self {
            AssetKind::Voter => "voter",
            AssetKind::VotableItem => "vitem",
        }
    }
}

/// Derives `"{worker}_{kind}_{seq}"`.
pub fn sequenced_id(worker_index: usize, kind: AssetKind, seq: usize) -> AssetId {
    AssetId(format!("{}_{}_{}", worker_index, kind.tag(), seq))
}

/// Id of the `seq`-th voter created by a worker.
pub fn voter_id(worker_index: usize, seq: usize) -> AssetId {
    sequenced_id(worker_index, AssetKind::Voter, seq)
}

/// Id of the `seq`-th votable item created by a worker.
pub fn item_id(worker_index: usize, seq: usize) -> AssetId {
    sequenced_id(worker_index, AssetKind::VotableItem, seq)
}

/// Each worker owns exactly one election.
pub fn election_id(worker_index: usize) -> AssetId {
    AssetId(format!("{}_election", worker_index))
}

/// Ballots are identified by the voter who cast them and the election they belong to.
pub fn ballot_id(voter: &AssetId, election: &AssetId) -> AssetId {
    AssetId(format!("{}-{}", voter, election))
}

// ============================================================================
// Asset Ledger
// ============================================================================

/// Insertion-ordered set of every asset id a worker has created or attempted to create.
///
/// Ids are recorded before the creating request settles, so an asset whose
/// creation outcome is unknown is still swept at teardown. There is no removal:
/// the ledger is dropped together with its workload.
#[derive(Debug, Clone, Default)]
pub struct AssetLedger {
    assets: IndexSet<AssetId>,
}

impl AssetLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an asset id. Returns false if it was already present.
    pub fn record(&mut self, id: AssetId) -> bool {
        self.assets.insert(id)
    }

    /// True if `id` has been recorded.
    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.contains(id)
    }

    /// Number of recorded ids.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// True before anything has been recorded.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetId> {
        self.assets.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
