//! ═══════════════════════════════════════════════════════════════════════════════
//! CCM — Command Line Entry Point
//! ═══════════════════════════════════════════════════════════════════════════════
//! Results go to stdout, logs to stderr.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use ccm::config::CcmConfig;
use ccm::synthetic::{coupled_logistic, LogisticParams};
use ccm::BidirectionalResult;

#[derive(Parser)]
#[command(name = "ccm")]
#[command(
    about = "Convergent Cross Mapping - causal inference between two time series",
    long_about = None
)]
struct Cli {
    /// JSON config file (merged over defaults, under CCM_* environment)
    #[arg(short, long, global = true, env = "CCM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CCM on a JSON file holding {"x": [...], "y": [...]}
    Run {
        /// Input file
        input: PathBuf,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run CCM on coupled logistic maps where Y drives X
    Demo {
        /// Series length
        #[arg(short, long, default_value = "400")]
        length: usize,

        /// Forcing of Y on X
        #[arg(long, default_value = "0.1")]
        coupling: f64,

        /// Random seed (initial conditions and libraries)
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Deserialize)]
struct SeriesPair {
    x: Vec<f64>,
    y: Vec<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CcmConfig::load(cli.config.as_deref()).context("loading configuration")?;
    ccm::logging::init(&config.logging).context("initialising logging")?;

    match cli.command {
        Commands::Run { input, seed, json } => run_file(&config, &input, seed, json),
        Commands::Demo {
            length,
            coupling,
            seed,
            json,
        } => run_demo(&config, length, coupling, seed, json),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_file(config: &CcmConfig, input: &Path, seed: Option<u64>, json: bool) -> Result<()> {
    let raw = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let pair: SeriesPair =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;

    let mut options = config.analysis.clone();
    if let Some(seed) = seed {
        options = options.with_seed(seed);
    }

    info!(input = %input.display(), len = pair.x.len(), "running CCM");
    let result = ccm::run(&pair.x, &pair.y, options)?;
    emit(&result, json)
}

fn run_demo(config: &CcmConfig, length: usize, coupling: f64, seed: u64, json: bool) -> Result<()> {
    let params = LogisticParams::y_drives_x(coupling);
    let (x, y) = coupled_logistic(length, &params, seed);
    let options = config.analysis.clone().with_seed(seed);

    if !json {
        println!("\x1b[36m═══════════════════════════════════════════════════════════════\x1b[0m");
        println!("\x1b[36m CCM DEMO — Coupled Logistic Maps (Y drives X)\x1b[0m");
        println!("\x1b[36m═══════════════════════════════════════════════════════════════\x1b[0m");
        println!();
        println!(
            "Config: n={}, rx={}, ry={}, beta_xy={}, beta_yx={}",
            length, params.rx, params.ry, params.beta_xy, params.beta_yx
        );
        println!("Expected: \"Y causes X\" converges, \"X causes Y\" does not");
        println!();
    }

    let result = ccm::run(&x, &y, options)?;
    emit(&result, json)
}

fn emit(result: &BidirectionalResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", result);
    }
    Ok(())
}
