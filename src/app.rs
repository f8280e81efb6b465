//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - generates synthetic datasets
//! - runs the comparison pipeline
//! - prints the console report

use clap::Parser;

use crate::cli::{AnalyzeArgs, Command, FitArgs, GenerateArgs, RunArgs, SampleArgs};
use crate::domain::{GenerateConfig, IrlsOptions, RunConfig};
use crate::error::AppError;

pub mod pipeline;

/// File name used by `run` for the generated dataset inside the output directory.
pub const GENERATED_DATA_FILE: &str = "data.csv";

/// Entry point for the `force-logit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine; values then come from flags, the environment, or defaults.
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("loaded environment from {}", path.display());
    }
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Generate(args) => handle_generate(&args),
        Command::Analyze(args) => handle_analyze(&args),
        Command::Run(args) => handle_run(&args),
    }
}

fn handle_generate(args: &GenerateArgs) -> Result<(), AppError> {
    let config = generate_config_from_args(args.out.clone(), args.seed, &args.sample);
    let data = crate::data::generate_dataset(&config)?;
    crate::io::write_dataset_csv(&config.out, &data)?;
    println!("Wrote {} rows to {}", data.len(), config.out.display());
    Ok(())
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args.input.clone(), args.seed, &args.fit);
    analyze(&config, args.fit.threads)
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let data_path = args.fit.out_dir.join(GENERATED_DATA_FILE);
    let generate = generate_config_from_args(data_path.clone(), args.seed, &args.sample);
    let data = crate::data::generate_dataset(&generate)?;
    crate::io::write_dataset_csv(&data_path, &data)?;

    let config = run_config_from_args(data_path, args.seed, &args.fit);
    analyze(&config, args.fit.threads)
}

fn analyze(config: &RunConfig, threads: usize) -> Result<(), AppError> {
    config.validate()?;
    configure_threads(threads)?;

    let run = pipeline::run_analysis(config)?;
    println!("{}", pipeline::format_report(&run, config));
    println!("Artifacts written to {}", config.out_dir.display());
    Ok(())
}

/// Size the global rayon pool. `0` keeps rayon's default (one per core).
fn configure_threads(threads: usize) -> Result<(), AppError> {
    if threads == 0 {
        return Ok(());
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| AppError::config(format!("Failed to configure {threads} worker thread(s): {e}")))
}

pub fn run_config_from_args(input: std::path::PathBuf, seed: u64, args: &FitArgs) -> RunConfig {
    RunConfig {
        input,
        out_dir: args.out_dir.clone(),
        seed,
        folds: args.folds,
        confidence: args.confidence,
        irls: IrlsOptions {
            max_iterations: args.max_iter,
            tolerance: args.tol,
        },
        plot_width: args.width,
        plot_height: args.height,
        parallel: args.threads != 1,
    }
}

pub fn generate_config_from_args(out: std::path::PathBuf, seed: u64, args: &SampleArgs) -> GenerateConfig {
    GenerateConfig {
        out,
        rows: args.rows,
        seed,
        outcome_rate: args.outcome_rate,
        age_missing_rate: args.age_missing_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    #[test]
    fn single_thread_disables_parallelism() {
        let cli = Cli::try_parse_from(["force-logit", "analyze", "-i", "x.csv", "--threads", "1", "-k", "4"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = run_config_from_args(args.input.clone(), args.seed, &args.fit);
        assert!(!config.parallel);
        assert_eq!(config.folds, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_confidence_fails_validation() {
        let cli = Cli::try_parse_from(["force-logit", "analyze", "-i", "x.csv", "--confidence", "1.2"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = run_config_from_args(args.input.clone(), args.seed, &args.fit);
        assert!(config.parallel);
        assert!(config.validate().is_err());
    }
}
