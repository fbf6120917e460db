use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use shopping_route::config::OptimizerConfig;
use shopping_route::error::OptimizeError;
use shopping_route::models::Time;
use shopping_route::services::memory::Fixture;
use shopping_route::{
    BruteForceTsp, CancellationToken, DynamicProgrammingTsp, Strategy, TspSolver,
};

#[derive(Parser)]
#[command(name = "shopping-route")]
#[command(version)]
#[command(about = "Finds the cheapest and fastest shopping trip over nearby stores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a shopping list against a JSON fixture of shops, durations and prices
    Optimize {
        #[arg(short, long)]
        fixture: PathBuf,

        #[arg(short, long, value_enum, default_value = "price")]
        strategy: StrategyArg,

        /// Optimizer configuration as JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Solve a round trip over a JSON cost matrix (-1 marks a missing edge)
    Tsp {
        #[arg(short, long)]
        matrix: PathBuf,

        #[arg(long, default_value = "0")]
        start: usize,

        #[arg(short, long, value_enum, default_value = "dp")]
        algorithm: Algorithm,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Minimum price plus time valued at the exchange rate
    Price,
    /// Shortest trip, prices ignored
    Nearest,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Price => Strategy::PriceOptimal,
            StrategyArg::Nearest => Strategy::NearestCoverage,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    Dp,
    Bruteforce,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Optimize {
            fixture,
            strategy,
            config,
        } => optimize(&fixture, strategy.into(), config.as_deref()),
        Commands::Tsp {
            matrix,
            start,
            algorithm,
        } => tsp(&matrix, start, algorithm),
    };

    match outcome {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(if err.is_infeasible() { 2 } else { 1 });
        }
    }
}

fn optimize(
    fixture: &Path,
    strategy: Strategy,
    config: Option<&Path>,
) -> Result<String, OptimizeError> {
    let config = match config {
        Some(path) => OptimizerConfig::from_file(path)?,
        None => OptimizerConfig::default(),
    };
    let fixture = Fixture::from_file(fixture)?;
    info!(
        "Optimizing {} products with {:?}",
        fixture.request.requirements.len(),
        strategy
    );

    let optimizer = fixture.optimizer(config)?;
    let result = optimizer.optimize(&fixture.request, strategy, &CancellationToken::new())?;
    to_json(&result)
}

fn tsp(matrix: &Path, start: usize, algorithm: Algorithm) -> Result<String, OptimizeError> {
    let text = fs::read_to_string(matrix).map_err(|e| {
        OptimizeError::InvalidInput(format!("cannot read matrix {}: {e}", matrix.display()))
    })?;
    let matrix: Vec<Vec<Time>> = serde_json::from_str(&text)
        .map_err(|e| OptimizeError::InvalidInput(format!("cannot parse matrix: {e}")))?;

    let solver: &dyn TspSolver = match algorithm {
        Algorithm::Dp => &DynamicProgrammingTsp,
        Algorithm::Bruteforce => &BruteForceTsp,
    };
    let tour = solver.solve(&matrix, start)?;
    to_json(&tour)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, OptimizeError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| OptimizeError::Internal(format!("cannot serialize output: {e}")))
}
