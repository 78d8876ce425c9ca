//! `cbsim` command-line entry point.
//!
//! Usage:
//!   cbsim <ml_args> <num_actions> <num_contexts> <min_p> <max_p> <no_click_cost>
//!         <click_cost> <p_strategy> <tot_iter> <mod_iter> <rnd_seed>
//!
//! Example:
//!   cbsim "--epsilon 0.1" 10 10 0.03 0.04 0 -1 0 100000 10000 1
//!
//! Report rows go to stdout; diagnostics go to stderr (filter with `RUST_LOG`).

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cbsim::{SimError, SimulationConfig, SimulationRunner, TabularLearner};

const USAGE: &str = "ml_args num_actions num_contexts min_p max_p no_click_cost click_cost p_strategy tot_iter mod_iter rnd_seed";

#[derive(Parser, Debug)]
#[command(name = "cbsim")]
#[command(version, about = "Simulate a contextual-bandit learner under a propensity-reporting strategy")]
struct Cli {
    /// Learner configuration string (e.g. "--epsilon 0.1" or "--softmax --lambda 8")
    #[arg(allow_hyphen_values = true)]
    ml_args: String,
    /// Number of actions per context
    num_actions: usize,
    /// Number of distinct contexts
    num_contexts: usize,
    /// Click probability of non-best actions
    #[arg(allow_negative_numbers = true)]
    min_p: f64,
    /// Click probability of the best action
    #[arg(allow_negative_numbers = true)]
    max_p: f64,
    /// Cost when no click happens
    #[arg(allow_negative_numbers = true)]
    no_click_cost: f64,
    /// Cost when a click happens
    #[arg(allow_negative_numbers = true)]
    click_cost: f64,
    /// Propensity-reporting strategy id (0, 1, 2, 6, 7, 13, 14)
    #[arg(allow_negative_numbers = true)]
    p_strategy: i64,
    /// Total iterations
    tot_iter: u64,
    /// Report every this many iterations
    mod_iter: u64,
    /// Random seed
    rnd_seed: u64,
}

impl From<Cli> for SimulationConfig {
    fn from(cli: Cli) -> Self {
        Self {
            learner_args: cli.ml_args,
            num_actions: cli.num_actions,
            num_contexts: cli.num_contexts,
            min_p: cli.min_p,
            max_p: cli.max_p,
            no_click_cost: cli.no_click_cost,
            click_cost: cli.click_cost,
            p_strategy: cli.p_strategy,
            total_iterations: cli.tot_iter,
            report_interval: cli.mod_iter,
            seed: cli.rnd_seed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("writing report: {0}")]
    Io(#[from] io::Error),
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let cfg = SimulationConfig::from(cli);
    let learner = TabularLearner::from_args(&cfg.learner_args).map_err(SimError::from)?;
    let mut runner = SimulationRunner::new(cfg, learner)?;

    let mut out = BufWriter::new(io::stdout().lock());
    runner.try_run_with(|row| -> Result<(), CliError> {
        writeln!(out, "{row}")?;
        out.flush()?;
        Ok(())
    })?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            // clap's rendering carries its own usage block; keep only the message.
            let rendered = e.to_string();
            let exe = std::env::args().next().unwrap_or_else(|| "cbsim".to_string());
            eprintln!("{}", rendered.lines().next().unwrap_or("error: invalid arguments"));
            eprintln!("Usage: {exe} {USAGE}");
            return ExitCode::from(1);
        }
    };

    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}
