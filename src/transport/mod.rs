//! Request dispatch.
//!
//! This module provides the [`Transport`] trait through which workloads submit
//! contract invocations, and [`MemoryTransport`], an in-process implementation
//! used by the CLI, benches and tests.

mod memory;

pub use memory::MemoryTransport;

use crate::error::DispatchError;
use async_trait::async_trait;
use std::fmt;

/// Contract functions the workloads invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractFunction {
    NewVoter,
    NewVotableItem,
    NewElection,
    NewBallot,
    CastVote,
    GetBallot,
    DeleteAsset,
}

impl ContractFunction {
    /// Function name as exposed by the contract.
    pub fn name(&self) -> &'static str {
        match self {
            ContractFunction::NewVoter => "NewVoter",
            ContractFunction::NewVotableItem => "NewVotableItem",
            ContractFunction::NewElection => "NewElection",
            ContractFunction::NewBallot => "NewBallot",
            ContractFunction::CastVote => "CastVote",
            ContractFunction::GetBallot => "GetBallot",
            ContractFunction::DeleteAsset => "DeleteAsset",
        }
    }
}

impl fmt::Display for ContractFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single named-function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub contract_id: String,
    pub function: ContractFunction,
    pub invoker_id: String,
    /// Ordered arguments. Collections are passed as JSON-encoded string arrays.
    pub arguments: Vec<String>,
    pub read_only: bool,
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Payload returned by the contract, if any.
    pub payload: Option<String>,
}

/// Dispatches one contract invocation and resolves once it has settled.
///
/// Retry and timeout policy belong to the implementation; callers submit one
/// request at a time and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(&self, request: Request) -> Result<Response, DispatchError>;
}
