//! Weighted least squares primitives for IRLS.
//!
//! Each IRLS step solves a weighted linear regression of the form:
//!
//! ```text
//! minimize Σ w_i (z_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - We scale rows by `sqrt(w_i)` and solve an ordinary least squares problem
//!   with SVD. This stays robust when the design is tall and when a dummy
//!   column is nearly empty in a small CV training fold.
//! - Columns with no information (all zero, or a linear combination of earlier
//!   columns) are detected once up front by `estimable_columns` and left out of
//!   the fit, the way R's pivoted QR marks them as aliased.
//! - The coefficient covariance `(XᵀWX)⁻¹` is computed once at convergence via
//!   Cholesky; `None` there means the standard errors are unavailable.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `min Σ w_i (y_i - x_i^T β)^2`.
pub fn solve_weighted(x: &DMatrix<f64>, y: &DVector<f64>, w: &DVector<f64>) -> Option<DVector<f64>> {
    let mut xw = x.clone();
    let mut yw = y.clone();
    for i in 0..x.nrows() {
        let sw = w[i].max(0.0).sqrt();
        xw.row_mut(i).scale_mut(sw);
        yw[i] *= sw;
    }
    solve_least_squares(&xw, &yw)
}

/// Indices of the columns of `x` that are linearly independent of the columns
/// before them, in order.
///
/// Greedy modified Gram-Schmidt: a column is kept when the norm of its residual
/// against the kept columns exceeds `tol` times its own norm. An all-zero column
/// is never kept.
pub fn estimable_columns(x: &DMatrix<f64>, tol: f64) -> Vec<usize> {
    let mut kept = Vec::new();
    let mut basis: Vec<DVector<f64>> = Vec::new();

    for j in 0..x.ncols() {
        let col: DVector<f64> = x.column(j).into_owned();
        let norm = col.norm();
        if norm == 0.0 || !norm.is_finite() {
            continue;
        }
        let mut r = col;
        for q in &basis {
            let proj = q.dot(&r);
            r.axpy(-proj, q, 1.0);
        }
        let r_norm = r.norm();
        if r_norm > tol * norm {
            basis.push(r / r_norm);
            kept.push(j);
        }
    }
    kept
}

/// `(XᵀWX)⁻¹`, or `None` when `XᵀWX` is not positive definite.
pub fn weighted_gram_inverse(x: &DMatrix<f64>, w: &DVector<f64>) -> Option<DMatrix<f64>> {
    let mut xw = x.clone();
    for i in 0..x.nrows() {
        xw.row_mut(i).scale_mut(w[i]);
    }
    let gram = x.transpose() * xw;
    let inv = gram.cholesky()?.inverse();
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert_abs_diff_eq!(beta[0], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(beta[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn zero_weight_rows_are_ignored() {
        // Third point is an outlier with zero weight.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 100.0]);
        let w = DVector::from_row_slice(&[1.0, 1.0, 0.0]);

        let beta = solve_weighted(&x, &y, &w).unwrap();
        assert_abs_diff_eq!(beta[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(beta[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn gram_inverse_detects_singular_design() {
        // Duplicate columns.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let w = DVector::from_element(3, 1.0);
        assert!(weighted_gram_inverse(&x, &w).is_none());
    }

    #[test]
    fn empty_and_duplicate_columns_are_not_estimable() {
        // intercept, x, zero column, copy of x, x + intercept, independent column
        let x = DMatrix::from_row_slice(
            4,
            6,
            &[
                1.0, 0.0, 0.0, 0.0, 1.0, 1.0, //
                1.0, 1.0, 0.0, 1.0, 2.0, 0.0, //
                1.0, 2.0, 0.0, 2.0, 3.0, 0.0, //
                1.0, 3.0, 0.0, 3.0, 4.0, 0.0,
            ],
        );
        assert_eq!(estimable_columns(&x, 1e-7), vec![0, 1, 5]);
    }

    #[test]
    fn full_rank_design_keeps_every_column() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        assert_eq!(estimable_columns(&x, 1e-7), vec![0, 1]);
    }

    #[test]
    fn gram_inverse_of_identity_design() {
        let x = DMatrix::<f64>::identity(2, 2);
        let w = DVector::from_row_slice(&[4.0, 0.25]);
        let inv = weighted_gram_inverse(&x, &w).unwrap();
        assert_abs_diff_eq!(inv[(0, 0)], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(inv[(1, 1)], 4.0, epsilon = 1e-12);
    }
}
