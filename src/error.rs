//! Error types for workload configuration, dispatch and lifecycle.

use crate::transport::ContractFunction;
use crate::workload::CleanupReport;
use crate::AssetId;
use thiserror::Error;

/// A round option is absent or unusable. Raised before any request is issued.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required round option `{0}`")]
    Missing(&'static str),
    #[error("invalid round option `{option}`: {reason}")]
    Invalid {
        option: &'static str,
        reason: String,
    },
    #[error("malformed round arguments: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure reported by the transport for a single request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("asset {0} does not exist")]
    AssetNotFound(String),
    #[error("asset {0} already exists")]
    AssetExists(String),
    #[error("{function} rejected: {reason}")]
    Rejected {
        function: ContractFunction,
        reason: String,
    },
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A creation that failed during setup.
#[derive(Debug, Clone)]
pub struct SetupFailure {
    pub function: ContractFunction,
    pub asset: AssetId,
    pub error: DispatchError,
}

/// A deletion that failed during teardown.
#[derive(Debug, Clone)]
pub struct TeardownFailure {
    pub asset: AssetId,
    pub error: DispatchError,
}

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{function} dispatch failed: {source}")]
    Dispatch {
        function: ContractFunction,
        #[source]
        source: DispatchError,
    },

    /// Every voter created at setup has already cast its ballot.
    #[error("voter pool exhausted: submission {requested} but only {voters} voters were created")]
    Exhausted { requested: usize, voters: usize },

    #[error("failed to encode contract arguments: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("cannot {operation} a workload that is {phase}")]
    Phase {
        operation: &'static str,
        phase: &'static str,
    },

    /// Some creations failed. Every setup step was still attempted and the
    /// workload accepts submissions.
    #[error("{} setup requests failed", failures.len())]
    Setup { failures: Vec<SetupFailure> },

    /// Some deletions failed. `report` counts the ones that did not.
    #[error("{} of the tracked assets could not be deleted", failures.len())]
    Teardown {
        report: CleanupReport,
        failures: Vec<TeardownFailure>,
    },
}

impl WorkloadError {
    /// True when no further submission can succeed for this worker.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, WorkloadError::Exhausted { .. })
    }
}
