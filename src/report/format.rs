//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays free of presentation concerns
//! - output changes are localized

use crate::domain::{
    Area, CoefficientRow, DatasetStats, Gender, Level, ModalProfile, ModelKind, Race, RunConfig, Violent,
};
use crate::fit::ModelComparison;

/// Format the run summary: dataset stats, per-model diagnostics, and the
/// best model under each criterion.
pub fn format_run_summary(
    dataset: &DatasetStats,
    complete: &DatasetStats,
    comparison: &ModelComparison,
    config: &RunConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== force-logit - logistic model comparison ===\n");
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Rows: n={} | complete={} | missing age={}\n",
        dataset.n_rows, dataset.n_complete, dataset.n_missing_age
    ));
    out.push_str(&format!(
        "Fitted on: n={} | age=[{}, {}] | outcome rate={:.3}\n",
        complete.n_rows,
        fmt_opt(complete.age_min),
        fmt_opt(complete.age_max),
        complete.outcome_rate
    ));
    out.push_str(&format!("CV: {} folds (seed={})\n", config.folds, config.seed));
    out.push_str(&format!(
        "Null model: logLik={:.3} AIC={:.3}\n",
        comparison.null.log_likelihood,
        crate::fit::aic(comparison.null.log_likelihood, comparison.null.param_count())
    ));

    out.push_str("\nModel diagnostics:\n");
    out.push_str(&format!(
        "  {:<12} {:>6} {:>12} {:>12} {:>10} {:>12}\n",
        "model", "params", "logLik", "AIC", "pseudoR2", "CV logloss"
    ));
    for kind in ModelKind::COMPARED {
        if let Some(r) = comparison.record(kind) {
            let mark = if comparison.best_by_aic == Some(kind) { "*" } else { " " };
            out.push_str(&format!(
                "{mark} {:<12} {:>6} {:>12.3} {:>12.3} {:>10.5} {:>12.5}\n",
                kind.display_name(),
                r.params,
                r.log_likelihood,
                r.aic,
                r.pseudo_r2,
                r.cv_log_loss
            ));
        } else if let Some(f) = comparison.failures.iter().find(|f| f.model == kind) {
            out.push_str(&format!(
                "  {:<12} FAILED ({}, n={}): {}\n",
                kind.display_name(),
                f.kind.label(),
                f.n_rows,
                f.message
            ));
        }
    }

    out.push_str("\nFormulas:\n");
    for kind in std::iter::once(ModelKind::Null).chain(ModelKind::COMPARED) {
        out.push_str(&format!("  {:<12} {}\n", kind.display_name(), kind.formula()));
    }

    out.push_str("\nBest model:\n");
    out.push_str(&format!("- by AIC       : {}\n", fmt_best(comparison.best_by_aic)));
    out.push_str(&format!("- by CV logloss: {}\n", fmt_best(comparison.best_by_cv)));
    out.push('\n');

    out
}

/// Format the coefficient display table.
pub fn format_coefficients(rows: &[CoefficientRow], model: ModelKind, confidence: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Coefficients ({} model, {:.0}% CI, log-odds):\n",
        model.display_name(),
        confidence * 100.0
    ));
    out.push_str(&format!(
        "Reference levels: {}, {}, {}, {}\n",
        reference::<Race>(),
        reference::<Gender>(),
        reference::<Area>(),
        reference::<Violent>()
    ));
    out.push_str(&format!("  {:<20} {:>10} {:>10} {:>10}\n", "term", "estimate", "lower", "upper"));
    for r in rows {
        out.push_str(&format!(
            "  {:<20} {:>10.4} {:>10.4} {:>10.4}\n",
            r.term, r.estimate, r.lower, r.upper
        ));
    }
    out
}

/// One-line description of the reference profile used for the age effect.
pub fn format_modal_profile(profile: &ModalProfile, ages: (u32, u32)) -> String {
    format!(
        "Age effect over [{}, {}] at race={}, gender={}, area={}, violent={}\n",
        ages.0,
        ages.1,
        profile.race.label(),
        profile.gender.label(),
        profile.high_crime_area.label(),
        profile.violent_crime_reason.label()
    )
}

/// Artifacts that were not produced, with the reason.
pub fn format_skipped(skipped: &[String]) -> String {
    let mut out = String::new();
    for reason in skipped {
        out.push_str(&format!("(skipped) {reason}\n"));
    }
    out
}

fn reference<L: Level>() -> String {
    format!("{}={}", L::TERM, L::baseline().label())
}

fn fmt_best(kind: Option<ModelKind>) -> &'static str {
    kind.map(ModelKind::display_name).unwrap_or("none (all models failed)")
}

fn fmt_opt(v: Option<u32>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComparisonRecord, FittedModel, Flag, IrlsOptions, ModelFailure};
    use crate::error::ErrorKind;

    fn null_fit() -> FittedModel {
        FittedModel {
            kind: ModelKind::Null,
            terms: vec!["(intercept)".into()],
            coefficients: vec![-1.2],
            std_errors: vec![0.05],
            aliased: vec![false],
            log_likelihood: -520.0,
            n_rows: 1000,
            iterations: 4,
            spline: None,
        }
    }

    fn comparison() -> ModelComparison {
        ModelComparison {
            null: null_fit(),
            fits: Vec::new(),
            records: vec![ComparisonRecord {
                model: ModelKind::Main,
                params: 9,
                n_rows: 1000,
                log_likelihood: -516.0,
                aic: 1050.0,
                pseudo_r2: 0.0077,
                cv_log_loss: 0.53,
            }],
            failures: vec![ModelFailure {
                model: ModelKind::Interaction,
                kind: ErrorKind::ConvergenceFailure,
                message: "no convergence after 25 iterations".into(),
                n_rows: 1000,
            }],
            best_by_aic: Some(ModelKind::Main),
            best_by_cv: Some(ModelKind::Main),
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            input: "data.csv".into(),
            out_dir: "output".into(),
            seed: 7,
            folds: 10,
            confidence: 0.95,
            irls: IrlsOptions::default(),
            plot_width: 900,
            plot_height: 600,
            parallel: false,
        }
    }

    fn stats(n: usize) -> DatasetStats {
        DatasetStats {
            n_rows: n,
            n_complete: 1000,
            n_missing_age: n - 1000,
            age_min: Some(16),
            age_max: Some(80),
            outcome_rate: 0.22,
        }
    }

    #[test]
    fn summary_marks_failures_and_best() {
        let text = format_run_summary(&stats(1030), &stats(1000), &comparison(), &config());
        assert!(text.contains("missing age=30"));
        assert!(text.contains("* main"));
        assert!(text.contains("interaction  FAILED (ConvergenceFailure, n=1000)"));
        assert!(text.contains("- by AIC       : main"));
        assert!(text.contains("outcome ~ race * area + age + gender + violent"));
    }

    #[test]
    fn coefficient_table_lists_every_row() {
        let rows = vec![
            CoefficientRow { term: "race=black".into(), estimate: -0.1, lower: -0.3, upper: 0.1 },
            CoefficientRow { term: "age".into(), estimate: 0.01, lower: 0.0, upper: 0.02 },
        ];
        let text = format_coefficients(&rows, ModelKind::Interaction, 0.95);
        assert!(text.starts_with("Coefficients (interaction model, 95% CI"));
        assert!(text.contains("Reference levels: race=white, gender=male, area=N, violent=N\n"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn modal_profile_line() {
        let profile = ModalProfile {
            race: Race::Black,
            gender: Gender::Male,
            high_crime_area: Area(Flag::Yes),
            violent_crime_reason: Violent(Flag::No),
        };
        assert_eq!(
            format_modal_profile(&profile, (16, 80)),
            "Age effect over [16, 80] at race=black, gender=male, area=Y, violent=N\n"
        );
    }
}
