//! Command-line parsing for the logistic model comparison tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling code. Every option can also be set through an environment variable
//! (a `.env` file is loaded before parsing).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "force-logit",
    version,
    about = "Compare logistic models of force-use outcomes (main effects, age spline, race x area)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a seeded synthetic encounter dataset to CSV.
    Generate(GenerateArgs),
    /// Fit, compare and plot models for an existing dataset.
    Analyze(AnalyzeArgs),
    /// Generate a dataset into the output directory, then analyze it.
    Run(RunArgs),
}

/// Synthetic dataset options.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Number of rows to generate.
    #[arg(short = 'n', long, env = "FORCE_LOGIT_ROWS", default_value_t = 2000)]
    pub rows: usize,

    /// Marginal probability of `outcome = 1`.
    #[arg(long, env = "FORCE_LOGIT_OUTCOME_RATE", default_value_t = 0.22)]
    pub outcome_rate: f64,

    /// Probability that a row's age is missing.
    #[arg(long, env = "FORCE_LOGIT_AGE_MISSING_RATE", default_value_t = 0.03)]
    pub age_missing_rate: f64,
}

/// Model fitting and output options.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Output directory for plots, CSV exports and the JSON summary.
    #[arg(short = 'o', long, env = "FORCE_LOGIT_OUT_DIR", default_value = "output")]
    pub out_dir: PathBuf,

    /// Number of cross-validation folds.
    #[arg(short = 'k', long, env = "FORCE_LOGIT_FOLDS", default_value_t = 10)]
    pub folds: usize,

    /// Confidence level for coefficient intervals.
    #[arg(long, env = "FORCE_LOGIT_CONFIDENCE", default_value_t = 0.95)]
    pub confidence: f64,

    /// Maximum IRLS iterations per fit.
    #[arg(long, env = "FORCE_LOGIT_MAX_ITER", default_value_t = 25)]
    pub max_iter: usize,

    /// IRLS relative deviance tolerance.
    #[arg(long, env = "FORCE_LOGIT_TOL", default_value_t = 1e-8)]
    pub tol: f64,

    /// Plot width (pixels).
    #[arg(long, env = "FORCE_LOGIT_PLOT_WIDTH", default_value_t = 900)]
    pub width: u32,

    /// Plot height (pixels).
    #[arg(long, env = "FORCE_LOGIT_PLOT_HEIGHT", default_value_t = 600)]
    pub height: u32,

    /// Worker threads (0 = one per core, 1 = sequential).
    #[arg(long, env = "FORCE_LOGIT_THREADS", default_value_t = 0)]
    pub threads: usize,
}

/// Options for `generate`.
#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// Destination CSV file.
    #[arg(long, value_name = "CSV", env = "FORCE_LOGIT_DATA")]
    pub out: PathBuf,

    /// Random seed.
    #[arg(long, env = "FORCE_LOGIT_SEED", default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub sample: SampleArgs,
}

/// Options for `analyze`.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Dataset CSV file.
    #[arg(short = 'i', long, value_name = "CSV", env = "FORCE_LOGIT_DATA")]
    pub input: PathBuf,

    /// Seed for the CV fold partition.
    #[arg(long, env = "FORCE_LOGIT_SEED", default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub fit: FitArgs,
}

/// Options for `run`.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Seed for both the synthetic dataset and the CV fold partition.
    #[arg(long, env = "FORCE_LOGIT_SEED", default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub fit: FitArgs,
}
