//! Shared analysis pipeline used by the `analyze` and `run` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> complete cases -> fit/compare -> effects -> exports/plots
//!
//! The commands can then focus on presentation.

use std::path::PathBuf;

use crate::domain::{CoefficientRow, DatasetStats, ModelKind, RunConfig};
use crate::effects::{AgeEffect, age_effect, coefficient_table};
use crate::error::AppError;
use crate::fit::{ModelComparison, compare_models};
use crate::io::export::{
    AGE_EFFECT_FILE, COEFFICIENTS_FILE, COMPARISON_FILE, RunSummary, SUMMARY_FILE, ensure_out_dir,
    write_age_effect_csv, write_coefficients_csv, write_comparison_csv, write_summary_json,
};
use crate::io::ingest::load_dataset;
use crate::plot::{AGE_EFFECT_PLOT_FILE, COEFFICIENT_PLOT_FILE, render_age_effect_plot, render_coefficient_plot};

/// Model whose coefficients are displayed.
pub const COEFFICIENT_MODEL: ModelKind = ModelKind::Interaction;

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: DatasetStats,
    pub complete_cases: DatasetStats,
    pub comparison: ModelComparison,
    pub coefficients: Option<Vec<CoefficientRow>>,
    pub age_effect: Option<AgeEffect>,
    /// Artifacts not produced because a required model failed.
    pub skipped: Vec<String>,
    /// Files written, in write order.
    pub artifacts: Vec<PathBuf>,
}

/// Execute the full analysis and write every artifact into `config.out_dir`.
pub fn run_analysis(config: &RunConfig) -> Result<RunOutput, AppError> {
    config.validate()?;

    // 1) Ingest; schema and category errors abort here.
    let data = load_dataset(&config.input)?;
    let dataset = data.stats();

    // 2) One shared complete-case subset for every model.
    let complete = data.complete_cases();
    let complete_cases = complete.stats();
    if dataset.n_missing_age > 0 {
        log::info!(
            "dropped {} row(s) with missing age; fitting on {}",
            dataset.n_missing_age,
            complete.len()
        );
    }

    // 3) Fit and compare.
    let comparison = compare_models(&complete, config)?;

    // 4) Presentation artifacts.
    let mut skipped = Vec::new();

    let coefficients = match comparison.fit(COEFFICIENT_MODEL) {
        Some(fit) => Some(coefficient_table(fit, config.confidence)?),
        None => {
            let reason = format!("coefficient display: {} model failed", COEFFICIENT_MODEL.display_name());
            log::warn!("{reason}");
            skipped.push(reason);
            None
        }
    };

    let age_effect = match (comparison.fit(ModelKind::Main), comparison.fit(ModelKind::Spline)) {
        (Some(main), Some(spline)) => Some(age_effect(&complete, &[main, spline])?),
        _ => {
            let reason = "age effect: main or spline model failed".to_string();
            log::warn!("{reason}");
            skipped.push(reason);
            None
        }
    };

    // 5) Write artifacts.
    ensure_out_dir(&config.out_dir)?;
    let mut artifacts = Vec::new();
    let size = (config.plot_width, config.plot_height);

    let path = config.out_dir.join(COMPARISON_FILE);
    write_comparison_csv(&path, &comparison)?;
    artifacts.push(path);

    if let Some(rows) = &coefficients {
        let path = config.out_dir.join(COEFFICIENTS_FILE);
        write_coefficients_csv(&path, rows)?;
        artifacts.push(path);

        let path = config.out_dir.join(COEFFICIENT_PLOT_FILE);
        let title = format!(
            "{} model coefficients ({:.0}% CI)",
            COEFFICIENT_MODEL.display_name(),
            config.confidence * 100.0
        );
        render_coefficient_plot(&path, rows, &title, size)?;
        artifacts.push(path);
    }

    if let Some(effect) = &age_effect {
        let path = config.out_dir.join(AGE_EFFECT_FILE);
        write_age_effect_csv(&path, &effect.series)?;
        artifacts.push(path);

        let path = config.out_dir.join(AGE_EFFECT_PLOT_FILE);
        render_age_effect_plot(&path, effect, size)?;
        artifacts.push(path);
    }

    let path = config.out_dir.join(SUMMARY_FILE);
    let summary = RunSummary {
        tool: "force-logit",
        config,
        dataset: dataset.clone(),
        complete_cases: complete_cases.clone(),
        records: &comparison.records,
        failures: &comparison.failures,
        best_by_aic: comparison.best_by_aic,
        best_by_cv: comparison.best_by_cv,
        coefficients: coefficients.as_deref(),
        modal_profile: age_effect.as_ref().map(|e| e.profile),
        skipped: &skipped,
    };
    write_summary_json(&path, &summary)?;
    artifacts.push(path);

    log::info!("wrote {} artifact(s) to {}", artifacts.len(), config.out_dir.display());

    Ok(RunOutput {
        dataset,
        complete_cases,
        comparison,
        coefficients,
        age_effect,
        skipped,
        artifacts,
    })
}

/// Console report for a finished run.
pub fn format_report(run: &RunOutput, config: &RunConfig) -> String {
    let mut out =
        crate::report::format_run_summary(&run.dataset, &run.complete_cases, &run.comparison, config);
    if let Some(rows) = &run.coefficients {
        out.push_str(&crate::report::format_coefficients(rows, COEFFICIENT_MODEL, config.confidence));
        out.push('\n');
    }
    if let Some(effect) = &run.age_effect {
        out.push_str(&crate::report::format_modal_profile(&effect.profile, effect.ages));
    }
    out.push_str(&crate::report::format_skipped(&run.skipped));
    out
}
