//! Model comparison (main vs spline vs interaction).
//!
//! For each specification fit on the shared complete-case rows we compute:
//! - AIC = 2k - 2·logLik
//! - McFadden pseudo-R² = 1 - logLik / logLik(null)
//! - pooled K-fold CV log-loss
//!
//! Selection rules:
//! 1. Best by AIC = minimum AIC; best by CV = minimum pooled log-loss.
//! 2. Ties go to the model with fewer parameters, then to the order in
//!    `ModelKind::COMPARED`.
//!
//! AIC counts only estimable parameters: an aliased column (e.g. a level
//! that never occurs) does not add to `k`.
//!
//! A specification that fails (convergence, degenerate spline range) is
//! recorded as a `ModelFailure` and excluded from the records; siblings are
//! unaffected.

use rayon::prelude::*;

use crate::domain::{ComparisonRecord, Dataset, FittedModel, ModelFailure, ModelKind, RunConfig};
use crate::error::AppError;
use crate::fit::crossval::{assign_folds, cross_validate};
use crate::fit::fitter::fit_model;

/// Output of fitting + comparison.
#[derive(Debug, Clone)]
pub struct ModelComparison {
    pub null: FittedModel,
    /// Successful fits, in `ModelKind::COMPARED` order.
    pub fits: Vec<FittedModel>,
    pub records: Vec<ComparisonRecord>,
    pub failures: Vec<ModelFailure>,
    pub best_by_aic: Option<ModelKind>,
    pub best_by_cv: Option<ModelKind>,
}

impl ModelComparison {
    pub fn fit(&self, kind: ModelKind) -> Option<&FittedModel> {
        self.fits.iter().find(|f| f.kind == kind)
    }

    pub fn record(&self, kind: ModelKind) -> Option<&ComparisonRecord> {
        self.records.iter().find(|r| r.model == kind)
    }
}

pub fn aic(log_likelihood: f64, params: usize) -> f64 {
    2.0 * params as f64 - 2.0 * log_likelihood
}

pub fn mcfadden_r2(log_likelihood: f64, null_log_likelihood: f64) -> f64 {
    if null_log_likelihood == 0.0 {
        return 0.0;
    }
    1.0 - log_likelihood / null_log_likelihood
}

/// Fit every compared specification plus the null model on `data` and score
/// them.
///
/// `data` must be the shared complete-case dataset. Fold configuration errors
/// and a failing null model abort the comparison; per-model failures do not.
pub fn compare_models(data: &Dataset, config: &RunConfig) -> Result<ModelComparison, AppError> {
    if data.rows().iter().any(|r| !r.is_complete()) {
        return Err(AppError::data(
            "Model comparison requires the complete-case dataset (rows with missing age found).",
        ));
    }
    let n = data.len();
    let folds = assign_folds(n, config.folds, config.seed)?;

    let null = fit_model(ModelKind::Null, data, &config.irls)?;
    log::info!("null model: n={n} logLik={:.4}", null.log_likelihood);

    let run = |kind: ModelKind| -> (ModelKind, Result<(FittedModel, f64), AppError>) {
        let outcome = fit_model(kind, data, &config.irls).and_then(|fit| {
            let cv = cross_validate(kind, data, &folds, &config.irls, config.parallel)?;
            Ok((fit, cv))
        });
        (kind, outcome)
    };

    let outcomes: Vec<_> = if config.parallel {
        ModelKind::COMPARED.par_iter().map(|&k| run(k)).collect()
    } else {
        ModelKind::COMPARED.iter().map(|&k| run(k)).collect()
    };

    let mut fits = Vec::new();
    let mut records = Vec::new();
    let mut failures = Vec::new();

    for (kind, outcome) in outcomes {
        match outcome {
            Ok((fit, cv_log_loss)) => {
                let params = fit.param_count();
                let record = ComparisonRecord {
                    model: kind,
                    params,
                    n_rows: fit.n_rows,
                    log_likelihood: fit.log_likelihood,
                    aic: aic(fit.log_likelihood, params),
                    pseudo_r2: mcfadden_r2(fit.log_likelihood, null.log_likelihood),
                    cv_log_loss,
                };
                log::info!(
                    "{}: AIC={:.3} pseudoR2={:.5} cvLogLoss={:.5}",
                    kind.display_name(),
                    record.aic,
                    record.pseudo_r2,
                    record.cv_log_loss
                );
                records.push(record);
                fits.push(fit);
            }
            Err(err) => {
                log::warn!(
                    "model {} skipped (n={n}): {}",
                    kind.display_name(),
                    err
                );
                failures.push(ModelFailure {
                    model: kind,
                    kind: err.kind(),
                    message: err.message().to_string(),
                    n_rows: n,
                });
            }
        }
    }

    let best_by_aic = select_best(&records, |r| r.aic);
    let best_by_cv = select_best(&records, |r| r.cv_log_loss);

    Ok(ModelComparison {
        null,
        fits,
        records,
        failures,
        best_by_aic,
        best_by_cv,
    })
}

/// Minimum of `score`; ties go to fewer parameters, then declaration order.
pub fn select_best(records: &[ComparisonRecord], score: impl Fn(&ComparisonRecord) -> f64) -> Option<ModelKind> {
    let rank = |kind: ModelKind| ModelKind::COMPARED.iter().position(|&k| k == kind).unwrap_or(usize::MAX);

    records
        .iter()
        .filter(|r| score(r).is_finite())
        .min_by(|a, b| {
            score(a)
                .total_cmp(&score(b))
                .then(a.params.cmp(&b.params))
                .then(rank(a.model).cmp(&rank(b.model)))
        })
        .map(|r| r.model)
}
