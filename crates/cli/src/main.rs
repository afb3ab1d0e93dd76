mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use conflict_resolver::resolve;
use sched_core::{validate_snapshot, Optimizer, ValidationError};
use serde::Serialize;
use solver_ga::GeneticOptimizer;
use solver_sa::AnnealingOptimizer;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::{Assignment, EngineKind, ResolutionReport, SeedMode, Snapshot, SolveResult};

use settings::{load_config, read_json, SEED_ENV};

#[derive(Parser)]
#[command(
    name = "defense-scheduler",
    about = "Assigns project-defense sessions to classrooms, slots and juries",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Checks a snapshot for integrity problems
    Validate { snapshot: PathBuf },
    /// Searches for a schedule
    Optimize {
        snapshot: PathBuf,
        /// Optimizer configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Engine::Genetic)]
        engine: Engine,
        /// `fixed:<n>` or `time-based`
        #[arg(long)]
        seed: Option<SeedMode>,
        /// Run the conflict resolver over the best schedule
        #[arg(long)]
        resolve: bool,
    },
    /// Detects and repairs conflicts in a committed assignment list
    Resolve {
        snapshot: PathBuf,
        assignments: PathBuf,
    },
    /// Prints the JSON schema of the snapshot format
    Schema,
}

#[derive(Clone, Copy, ValueEnum)]
enum Engine {
    Genetic,
    Annealing,
}

impl From<Engine> for EngineKind {
    fn from(e: Engine) -> Self {
        match e {
            Engine::Genetic => EngineKind::Genetic,
            Engine::Annealing => EngineKind::Annealing,
        }
    }
}

#[derive(Serialize)]
struct ValidationReport {
    ok: bool,
    errors: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeOutput {
    engine: EngineKind,
    result: SolveResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<ResolutionReport>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Validate { snapshot } => {
            let snap: Snapshot = read_json(&snapshot)?;
            let report = match validate_snapshot(&snap) {
                Ok(()) => ValidationReport { ok: true, errors: vec![] },
                Err(ValidationError::InvalidSnapshot(msg) | ValidationError::InvalidConfig(msg)) => {
                    let errors = msg
                        .split(';')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                    ValidationReport { ok: false, errors }
                }
            };
            print_json(&report)
        }
        Command::Optimize {
            snapshot,
            config,
            engine,
            seed,
            resolve: run_resolver,
        } => {
            let snap: Snapshot = read_json(&snapshot)?;
            let cfg = load_config(config.as_deref(), seed, std::env::var(SEED_ENV).ok())?;
            let mut optimizer: Box<dyn Optimizer> = match engine {
                Engine::Genetic => Box::new(GeneticOptimizer::new(cfg)?),
                Engine::Annealing => Box::new(AnnealingOptimizer::new(cfg)?),
            };
            tracing::info!(engine = optimizer.name(), snapshot = %snapshot.display(), "optimizing");
            let result = optimizer.optimize(&snap);
            let resolution = run_resolver.then(|| resolve(&snap, &result.assignments));
            print_json(&OptimizeOutput {
                engine: engine.into(),
                result,
                resolution,
            })
        }
        Command::Resolve {
            snapshot,
            assignments,
        } => {
            let snap: Snapshot = read_json(&snapshot)?;
            let list: Vec<Assignment> = read_json(&assignments)?;
            print_json(&resolve(&snap, &list))
        }
        Command::Schema => print_json(&schemars::schema_for!(Snapshot)),
    }
}
