//! Maximum-likelihood logistic regression by IRLS.
//!
//! Given a design matrix `X` and binary outcomes `y`, each iteration:
//! - computes `η = Xβ`, `μ = logit⁻¹(η)`
//! - forms working weights `w = μ(1 - μ)` and working response
//!   `z = η + (y - μ) / w`
//! - solves the weighted least squares problem for the next β
//!
//! and stops once the relative deviance change drops below the tolerance.
//! Standard errors come from `(XᵀWX)⁻¹` at the final β.
//!
//! Columns without information in the fitting rows (a declared level that
//! never occurs, an interaction cell missing from a CV training fold, or a
//! column collinear with earlier ones) are aliased: they are left out of the
//! fit, keep a `0.0` coefficient and a `NaN` standard error, and do not count
//! towards the parameter total.

use nalgebra::{DMatrix, DVector};

use crate::domain::{Dataset, FittedModel, IrlsOptions, ModelKind};
use crate::error::AppError;
use crate::math::{
    bernoulli_log_likelihood, estimable_columns, sigmoid, solve_weighted, weighted_gram_inverse,
};
use crate::models::Design;

/// Floor for IRLS working weights.
const MIN_WEIGHT: f64 = 1e-10;

/// Relative residual norm below which a column counts as aliased.
const ALIAS_TOLERANCE: f64 = 1e-7;

/// Fit one specification on `data`, with Wald standard errors.
///
/// `data` must already be the shared complete-case rows: a missing age is a
/// `DataIncompatible` error here, not a silent drop.
pub fn fit_model(kind: ModelKind, data: &Dataset, opts: &IrlsOptions) -> Result<FittedModel, AppError> {
    let estimate = fit_estimable(kind, data, opts)?;
    let p = estimate.coefficients.len();

    let mut std_errors = vec![f64::NAN; p];
    match weighted_gram_inverse(&estimate.x, &estimate.weights) {
        Some(cov) => {
            for (col, &j) in estimate.kept.iter().enumerate() {
                std_errors[j] = cov[(col, col)].max(0.0).sqrt();
            }
        }
        None => log::warn!(
            "{} (n={}): information matrix is singular at the estimate; standard errors unavailable",
            kind.display_name(),
            data.len()
        ),
    }

    let model = estimate.into_model(std_errors);
    let aliased = model.aliased_terms();
    if !aliased.is_empty() {
        log::warn!(
            "{} (n={}): not estimable from these rows, fixed at 0: {}",
            kind.display_name(),
            model.n_rows,
            aliased.join(", ")
        );
    }
    Ok(model)
}

/// Fit one specification for prediction only: coefficients and logLik, with
/// every standard error left as `NaN`. Used for CV training folds.
pub fn fit_coefficients(kind: ModelKind, data: &Dataset, opts: &IrlsOptions) -> Result<FittedModel, AppError> {
    let estimate = fit_estimable(kind, data, opts)?;
    let p = estimate.coefficients.len();
    Ok(estimate.into_model(vec![f64::NAN; p]))
}

/// Converged IRLS state on the estimable columns.
struct Estimate {
    kind: ModelKind,
    design: Design,
    /// Estimable column indices into the full design.
    kept: Vec<usize>,
    /// Design restricted to `kept`.
    x: DMatrix<f64>,
    weights: DVector<f64>,
    /// Full-width coefficients; aliased columns are `0.0`.
    coefficients: Vec<f64>,
    iterations: usize,
    log_likelihood: f64,
    n_rows: usize,
}

impl Estimate {
    fn into_model(self, std_errors: Vec<f64>) -> FittedModel {
        let aliased = (0..self.coefficients.len()).map(|j| !self.kept.contains(&j)).collect();
        FittedModel {
            kind: self.kind,
            terms: self.design.names(),
            coefficients: self.coefficients,
            std_errors,
            aliased,
            log_likelihood: self.log_likelihood,
            n_rows: self.n_rows,
            iterations: self.iterations,
            spline: self.design.spline,
        }
    }
}

fn fit_estimable(kind: ModelKind, data: &Dataset, opts: &IrlsOptions) -> Result<Estimate, AppError> {
    let design = Design::for_data(kind, data)?;
    let p = design.column_count();
    let n = data.len();

    if n <= p {
        return Err(AppError::data(format!(
            "Model {} is underdetermined: n={n} rows for {p} parameters.",
            kind.display_name()
        )));
    }

    let (full, y) = design.matrix(data)?;
    let kept = estimable_columns(&full, ALIAS_TOLERANCE);
    if kept.first() != Some(&0) {
        return Err(AppError::data(format!(
            "Model {} (n={n}): intercept column is not estimable.",
            kind.display_name()
        )));
    }
    let x = full.select_columns(&kept);

    let (beta, weights, iterations, log_likelihood) = irls(&x, &y, opts).map_err(|e| {
        AppError::new(
            e.kind(),
            format!("Model {} (n={n}): {}", kind.display_name(), e.message()),
        )
    })?;

    let mut coefficients = vec![0.0; p];
    for (col, &j) in kept.iter().enumerate() {
        coefficients[j] = beta[col];
    }

    log::debug!(
        "fitted {} on n={n}: rank={}/{p} logLik={log_likelihood:.4} after {iterations} iterations",
        kind.display_name(),
        kept.len()
    );

    Ok(Estimate {
        kind,
        design,
        kept,
        x,
        weights,
        coefficients,
        iterations,
        log_likelihood,
        n_rows: n,
    })
}

/// Run IRLS; returns `(β, final working weights, iterations, logLik)`.
fn irls(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    opts: &IrlsOptions,
) -> Result<(DVector<f64>, DVector<f64>, usize, f64), AppError> {
    let n = x.nrows();
    let p = x.ncols();

    let ybar = y.mean();
    if ybar <= 0.0 || ybar >= 1.0 {
        return Err(AppError::data(format!(
            "Outcome has no variation (event rate {ybar:.3}); the likelihood has no finite maximum."
        )));
    }

    // Start from the intercept-only solution.
    let mut beta = DVector::<f64>::zeros(p);
    beta[0] = (ybar / (1.0 - ybar)).ln();

    let y_slice: Vec<f64> = y.iter().copied().collect();
    let mut deviance_old = f64::INFINITY;

    for iter in 1..=opts.max_iterations {
        let eta = x * &beta;
        let mut w = DVector::<f64>::zeros(n);
        let mut z = DVector::<f64>::zeros(n);
        for i in 0..n {
            let mu = sigmoid(eta[i]);
            let wi = (mu * (1.0 - mu)).max(MIN_WEIGHT);
            w[i] = wi;
            z[i] = eta[i] + (y[i] - mu) / wi;
        }

        let next = solve_weighted(x, &z, &w)
            .ok_or_else(|| AppError::data("Weighted least squares step is singular."))?;
        if next.iter().any(|v| !v.is_finite()) {
            return Err(AppError::convergence(format!(
                "Non-finite coefficients at iteration {iter}."
            )));
        }
        beta = next;

        let mu: Vec<f64> = (x * &beta).iter().map(|&e| sigmoid(e)).collect();
        let log_likelihood = bernoulli_log_likelihood(&y_slice, &mu);
        let deviance = -2.0 * log_likelihood;
        if !deviance.is_finite() {
            return Err(AppError::convergence(format!("Non-finite deviance at iteration {iter}.")));
        }

        let rel_change = (deviance - deviance_old).abs() / (deviance.abs() + 0.1);
        log::trace!("irls iter={iter} deviance={deviance:.8} rel_change={rel_change:.3e}");
        if rel_change < opts.tolerance {
            let w_final: DVector<f64> = DVector::from_iterator(n, mu.iter().map(|&m| (m * (1.0 - m)).max(MIN_WEIGHT)));
            return Ok((beta, w_final, iter, log_likelihood));
        }
        deviance_old = deviance;
    }

    Err(AppError::convergence(format!(
        "IRLS did not converge within {} iterations (tolerance {:e}).",
        opts.max_iterations, opts.tolerance
    )))
}
