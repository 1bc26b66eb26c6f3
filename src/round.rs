//! Round driver.
//!
//! Runs workers through the full lifecycle (initialize, a fixed number of
//! submissions, cleanup) and aggregates what happened. Workers share nothing
//! but the transport handle.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::{RoundArguments, WorkloadKind};
use crate::error::WorkloadError;
use crate::transport::Transport;
use crate::workload::{new_workload, CleanupReport};
use crate::WorkerContext;

/// Submissions per worker when neither the caller nor the round arguments say otherwise.
pub const DEFAULT_TX_NUMBER: usize = 100;

/// Configuration of one benchmark round.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub kind: WorkloadKind,
    /// Number of independent workers.
    pub workers: usize,
    /// Submissions per worker. `None` derives it from the round arguments.
    pub tx_number: Option<usize>,
    pub round_index: usize,
    pub arguments: RoundArguments,
}

impl RoundConfig {
    /// Submissions each worker attempts.
    ///
    /// The vote-casting workload can submit at most one vote per voter, so it
    /// defaults to the voter count.
    pub fn tx_number(&self) -> usize {
        self.tx_number
            .or(self.arguments.tx)
            .unwrap_or(DEFAULT_TX_NUMBER)
    }
}

/// Result from a single worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub worker_index: usize,
    /// Submissions that settled successfully.
    pub successful: usize,
    /// Submissions that failed at dispatch.
    pub failed: usize,
    /// Set when the worker ran out of voters before reaching its submission count.
    pub exhausted: bool,
    /// Time spent in the submission phase.
    pub elapsed: Duration,
    /// Set when setup could not run; no submissions were attempted.
    pub setup_error: Option<String>,
    /// Creations that failed during an otherwise completed setup.
    pub setup_failures: usize,
    pub cleanup: CleanupReport,
    /// Deletions that failed during cleanup.
    pub cleanup_failures: usize,
}

/// Aggregated result of a round.
#[derive(Debug, Clone, Default)]
pub struct RoundReport {
    pub workers: Vec<WorkerReport>,
    pub successful: usize,
    pub failed: usize,
    pub setup_failures: usize,
    /// Wall-clock time of the slowest worker's submission phase.
    pub elapsed: Duration,
    pub deleted: usize,
    pub missing: usize,
    pub cleanup_failures: usize,
}

impl RoundReport {
    fn from_workers(workers: Vec<WorkerReport>) -> Self {
        let mut report = RoundReport::default();
        for worker in &workers {
            report.successful += worker.successful;
            report.failed += worker.failed;
            report.setup_failures += worker.setup_failures;
            report.elapsed = report.elapsed.max(worker.elapsed);
            report.deleted += worker.cleanup.deleted;
            report.missing += worker.cleanup.missing;
            report.cleanup_failures += worker.cleanup_failures;
        }
        report.workers = workers;
        report
    }

    /// Total submissions attempted.
    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    /// Successful submissions per second.
    pub fn tps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.successful as f64 / secs
    }
}

/// Drives one worker through initialize, `tx_number` submissions and cleanup.
///
/// Failed setup creations are counted and submissions go ahead. Cleanup always
/// runs, even when setup could not run at all, so everything the worker
/// recorded is swept.
pub async fn run_worker(
    kind: WorkloadKind,
    ctx: WorkerContext,
    args: &RoundArguments,
    transport: Arc<dyn Transport>,
    tx_number: usize,
) -> WorkerReport {
    let worker = ctx.worker_index;
    let mut report = WorkerReport {
        worker_index: worker,
        ..Default::default()
    };
    let mut workload = new_workload(kind);

    let ready = match workload.initialize(ctx, args, transport).await {
        Ok(()) => true,
        Err(WorkloadError::Setup { failures }) => {
            warn!(worker, failed = failures.len(), "setup finished with failed requests");
            report.setup_failures = failures.len();
            true
        }
        Err(e) => {
            error!(worker, kind = %workload.kind(), %e, "setup failed");
            report.setup_error = Some(e.to_string());
            false
        }
    };

    if ready {
        let start = Instant::now();
        for _ in 0..tx_number {
            match workload.submit_one().await {
                Ok(()) => report.successful += 1,
                Err(e) if e.is_exhausted() => {
                    warn!(worker, %e, "stopping submissions early");
                    report.exhausted = true;
                    break;
                }
                Err(_) => report.failed += 1,
            }
        }
        report.elapsed = start.elapsed();
    }

    match workload.cleanup().await {
        Ok(cleanup) => report.cleanup = cleanup,
        Err(WorkloadError::Teardown {
            report: cleanup,
            failures,
        }) => {
            report.cleanup = cleanup;
            report.cleanup_failures = failures.len();
        }
        Err(e) => error!(worker, %e, "cleanup failed"),
    }
    report
}

/// Runs every worker of a round concurrently, one task per worker.
pub async fn run_round(config: &RoundConfig, transport: Arc<dyn Transport>) -> RoundReport {
    let tx_number = config.tx_number();
    info!(
        workload = %config.kind,
        workers = config.workers,
        tx_number,
        round = config.round_index,
        "starting round"
    );

    let mut handles = Vec::with_capacity(config.workers);
    for worker_index in 0..config.workers {
        let ctx = WorkerContext::new(worker_index, config.workers, config.round_index);
        let args = config.arguments.clone();
        let transport = transport.clone();
        let kind = config.kind;
        handles.push(tokio::spawn(async move {
            run_worker(kind, ctx, &args, transport, tx_number).await
        }));
    }

    let mut workers = Vec::with_capacity(handles.len());
    for handle in handles {
        workers.push(handle.await.expect("worker task panicked"));
    }

    let report = RoundReport::from_workers(workers);
    info!(
        successful = report.successful,
        failed = report.failed,
        deleted = report.deleted,
        "round complete"
    );
    report
}
