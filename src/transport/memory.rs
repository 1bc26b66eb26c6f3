//! In-process transport backed by a plain key/value world state.
//!
//! Only asset existence is modelled: creations insert a key, lookups and
//! deletions require it. Voting rules are not enforced.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::trace;

use super::{ContractFunction, Request, Response, Transport};
use crate::error::DispatchError;

#[derive(Debug, Default)]
struct State {
    world: HashMap<String, String>,
    log: Vec<Request>,
    failing: HashSet<ContractFunction>,
}

/// Transport that settles every request immediately against an in-memory world state.
///
/// # Example
///
/// ```
/// use vote_workload::{ContractFunction, MemoryTransport, Request, Transport};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let transport = MemoryTransport::new();
/// let request = Request {
///     contract_id: "govote".to_string(),
///     function: ContractFunction::NewVoter,
///     invoker_id: "User1".to_string(),
///     arguments: vec!["0_voter_0".to_string(), "Voter0".to_string()],
///     read_only: false,
/// };
/// transport.send_request(request).await.unwrap();
/// assert!(transport.contains("0_voter_0"));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call to `function` fail with [`DispatchError::Unavailable`].
    pub fn fail_function(&self, function: ContractFunction) {
        self.state.lock().failing.insert(function);
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        self.state.lock().failing.clear();
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().log.clone()
    }

    /// Requests received for one function, in arrival order.
    pub fn requests_for(&self, function: ContractFunction) -> Vec<Request> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|r| r.function == function)
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().world.contains_key(id)
    }

    /// Ids currently present in the world state, sorted.
    pub fn live_assets(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.state.lock().world.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn apply(state: &mut State, request: &Request) -> Result<Response, DispatchError> {
        let args = &request.arguments;
        let arg = |i: usize| {
            args.get(i).ok_or_else(|| DispatchError::Rejected {
                function: request.function,
                reason: format!("expected at least {} arguments, got {}", i + 1, args.len()),
            })
        };

        match request.function {
            ContractFunction::NewVoter
            | ContractFunction::NewVotableItem
            | ContractFunction::NewElection => {
                let id = arg(0)?;
                Self::insert(&mut state.world, id.clone(), args[1..].join("|"))
            }
            ContractFunction::NewBallot | ContractFunction::CastVote => {
                let id = format!("{}-{}", arg(0)?, arg(1)?);
                let ranking = arg(2)?.clone();
                Self::insert(&mut state.world, id, ranking)
            }
            ContractFunction::GetBallot => {
                let id = arg(0)?;
                state
                    .world
                    .get(id)
                    .map(|payload| Response {
                        payload: Some(payload.clone()),
                    })
                    .ok_or_else(|| DispatchError::AssetNotFound(id.clone()))
            }
            ContractFunction::DeleteAsset => {
                let id = arg(0)?;
                state
                    .world
                    .remove(id)
                    .map(|_| Response::default())
                    .ok_or_else(|| DispatchError::AssetNotFound(id.clone()))
            }
        }
    }

    fn insert(
        world: &mut HashMap<String, String>,
        id: String,
        payload: String,
    ) -> Result<Response, DispatchError> {
        if world.contains_key(&id) {
            return Err(DispatchError::AssetExists(id));
        }
        world.insert(id, payload);
        Ok(Response::default())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_request(&self, request: Request) -> Result<Response, DispatchError> {
        let mut state = self.state.lock();
        trace!(function = %request.function, args = ?request.arguments, "dispatch");

        let result = if state.failing.contains(&request.function) {
            Err(DispatchError::Unavailable(format!(
                "{} is failing",
                request.function
            )))
        } else {
            Self::apply(&mut state, &request)
        };

        state.log.push(request);
        result
    }
}
