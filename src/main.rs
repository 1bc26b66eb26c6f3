//! CLI for running voting workloads against an in-memory ledger.

use clap::Parser;
use eyre::WrapErr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vote_workload::{run_round, MemoryTransport, RoundArguments, RoundConfig, WorkloadKind};

#[derive(Debug, Parser)]
#[command(name = "vote-workload", about = "Benchmark workloads for a ranked-choice voting contract")]
struct Cli {
    /// Workloads to run, one round each, in order.
    #[arg(long = "workload", value_enum, num_args = 1.., default_values_t = [
        WorkloadKind::NewVoter,
        WorkloadKind::CastVote,
        WorkloadKind::GetBallot,
    ])]
    workloads: Vec<WorkloadKind>,

    /// Number of concurrent workers per round.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Submissions per worker. Defaults to `tx`, or 100 when `tx` is unset.
    #[arg(long)]
    tx_number: Option<usize>,

    /// JSON file holding the round arguments. Flags below override its values.
    #[arg(long)]
    round_args: Option<PathBuf>,

    #[arg(long)]
    contract_id: Option<String>,

    #[arg(long)]
    invoker_id: Option<String>,

    /// Voters per worker (cast-vote).
    #[arg(long)]
    tx: Option<usize>,

    /// Votable items per worker.
    #[arg(long)]
    items: Option<usize>,

    /// Pre-built ballots per worker (get-ballot).
    #[arg(long)]
    ballots: Option<usize>,

    /// Seed for reproducible shuffles and ballot picks.
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    /// Built-in defaults, then the round-args file, then individual flags.
    fn round_arguments(&self) -> eyre::Result<RoundArguments> {
        let mut args = RoundArguments {
            contract_id: Some("govote".to_string()),
            invoker_id: Some("User1".to_string()),
            tx: Some(100),
            items: Some(5),
            ballots: Some(100),
            ..Default::default()
        };

        if let Some(path) = &self.round_args {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            args = args.merge(RoundArguments::from_json_str(&json)?);
        }

        Ok(args.merge(RoundArguments {
            contract_id: self.contract_id.clone(),
            invoker_id: self.invoker_id.clone(),
            tx: self.tx,
            items: self.items,
            ballots: self.ballots,
            seed: self.seed,
            voter_name: None,
        }))
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let arguments = cli.round_arguments()?;
    for &kind in &cli.workloads {
        arguments
            .validate_for(kind)
            .wrap_err_with(|| format!("invalid round arguments for {}", kind))?;
    }

    println!("=== Voting Workload Benchmark ===\n");
    println!(
        "Configuration: {} workers, {} items, {} voters, {} ballots\n",
        cli.workers,
        arguments.items.unwrap_or_default(),
        arguments.tx.unwrap_or_default(),
        arguments.ballots.unwrap_or_default(),
    );

    for (round_index, &kind) in cli.workloads.iter().enumerate() {
        let config = RoundConfig {
            kind,
            workers: cli.workers,
            tx_number: cli.tx_number,
            round_index,
            arguments: arguments.clone(),
        };

        // Fresh ledger per round.
        let transport = Arc::new(MemoryTransport::new());
        let report = run_round(&config, transport.clone()).await;

        if let Some(err) = report.workers.iter().find_map(|w| w.setup_error.as_ref()) {
            eyre::bail!("{} setup failed: {}", kind, err);
        }

        println!(
            "{:12} | {:4} setup failed | {:6} successful | {:4} failed | {:8.2} ms | {:8.0} tx/s | {:6} deleted | {:4} left",
            kind.name(),
            report.setup_failures,
            report.successful,
            report.failed,
            report.elapsed.as_secs_f64() * 1000.0,
            report.tps(),
            report.deleted,
            transport.live_assets().len(),
        );
    }

    Ok(())
}
