//! Natural cubic spline basis.
//!
//! We use the truncated-power form of the natural spline with `K` knots
//! `ξ1 < … < ξK` (two boundary knots plus `K - 2` interior knots):
//!
//! - `N1(x) = x`
//! - `N(k+1)(x) = d_k(x) - d_(K-1)(x)` for `k = 1..K-2`
//! - `d_k(x) = ((x - ξk)³₊ - (x - ξK)³₊) / (ξK - ξk)`
//!
//! Together with the model intercept this spans the same space as the B-spline
//! based `ns()` basis: piecewise cubic between knots, linear outside the
//! boundary knots. With `df = 3` we have two interior knots placed at the 1/3
//! and 2/3 sample quantiles.
//!
//! Numerical notes:
//! - `x` is rescaled to `[0, 1]` over the boundary knots before cubing so that
//!   the columns stay on the same scale as the dummy columns.
//! - Knots are stored so prediction on new rows (CV folds, effect grids) uses
//!   the training knots, not knots recomputed from the prediction rows.

use serde::Serialize;

use crate::error::AppError;

/// Fitted knot layout for a natural cubic spline basis (no intercept column).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NaturalSpline {
    pub boundary: (f64, f64),
    pub interior: Vec<f64>,
}

impl NaturalSpline {
    /// Place knots for a basis with `df` columns: boundary knots at the data
    /// range, `df - 1` interior knots at evenly spaced quantiles.
    pub fn from_data(x: &[f64], df: usize) -> Result<Self, AppError> {
        if df < 1 {
            return Err(AppError::config("Spline df must be >= 1."));
        }
        let mut sorted: Vec<f64> = x.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.len() < 2 {
            return Err(AppError::data("Spline basis needs at least two finite values."));
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let lo = sorted[0];
        let hi = sorted[sorted.len() - 1];
        if hi - lo <= 0.0 {
            return Err(AppError::data(format!(
                "Spline basis needs a non-degenerate range (all values equal {lo})."
            )));
        }

        let n_interior = df - 1;
        let interior = (1..=n_interior)
            .map(|i| quantile_sorted(&sorted, i as f64 / (n_interior + 1) as f64))
            .collect();

        Ok(Self {
            boundary: (lo, hi),
            interior,
        })
    }

    /// Number of basis columns.
    pub fn df(&self) -> usize {
        self.interior.len() + 1
    }

    /// Column labels, e.g. `ns(age)1`.
    pub fn names(&self, var: &str) -> Vec<String> {
        (1..=self.df()).map(|i| format!("ns({var}){i}")).collect()
    }

    /// Evaluate the basis at `x` into `out` (`out.len() == self.df()`).
    pub fn fill_row(&self, x: f64, out: &mut [f64]) {
        let (lo, hi) = self.boundary;
        let span = hi - lo;
        let scale = |v: f64| (v - lo) / span;

        let u = scale(x);
        out[0] = u;

        // Knots on the unit scale: [0, interior..., 1].
        let last = 1.0;
        let d_last_minus_one = self
            .interior
            .last()
            .map(|&k| d_k(u, scale(k), last))
            .unwrap_or(0.0);
        let first_d = d_k(u, 0.0, last);

        // k = 1 uses the lower boundary knot; k = 2.. use interior knots
        // except the last interior knot, which is the subtracted reference.
        let mut col = 1;
        if col < out.len() {
            out[col] = first_d - d_last_minus_one;
            col += 1;
        }
        for &k in self.interior.iter().take(self.interior.len().saturating_sub(1)) {
            if col >= out.len() {
                break;
            }
            out[col] = d_k(u, scale(k), last) - d_last_minus_one;
            col += 1;
        }
    }

    /// Evaluate the basis at `x` as a new vector.
    #[cfg(test)]
    pub fn row(&self, x: f64) -> Vec<f64> {
        let mut out = vec![0.0; self.df()];
        self.fill_row(x, &mut out);
        out
    }
}

fn cube_plus(v: f64) -> f64 {
    if v > 0.0 { v * v * v } else { 0.0 }
}

fn d_k(u: f64, knot: f64, last: f64) -> f64 {
    let denom = last - knot;
    if denom <= 0.0 {
        return 0.0;
    }
    (cube_plus(u - knot) - cube_plus(u - last)) / denom
}

/// Linear-interpolation quantile on sorted data (the common "type 7" rule).
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}
