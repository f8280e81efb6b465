//! K-fold cross-validated log-loss.
//!
//! Folds are a fixed random partition of the complete-case rows: a seeded
//! shuffle of row indices, then round-robin assignment, so fold sizes differ
//! by at most one. Each fold's held-out loss is returned as a
//! `(loss_sum, count)` pair; pairs are collected in fold order and reduced
//! sequentially, which keeps the pooled value bit-identical whether folds ran
//! in parallel or not.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::domain::{Dataset, IrlsOptions, ModelKind};
use crate::error::AppError;
use crate::fit::fitter::fit_coefficients;
use crate::math::log_loss;
use crate::models::predict;

/// Held-out loss of one fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldLoss {
    pub loss_sum: f64,
    pub count: usize,
}

/// Partition `0..n` into `k` folds deterministically from `seed`.
pub fn assign_folds(n: usize, k: usize, seed: u64) -> Result<Vec<Vec<usize>>, AppError> {
    if k < 2 {
        return Err(AppError::config(format!("CV needs at least 2 folds, got {k}.")));
    }
    if k > n {
        return Err(AppError::data(format!(
            "{k}-fold CV requested on only {n} complete-case rows; folds would be empty."
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut folds = vec![Vec::with_capacity(n / k + 1); k];
    for (pos, idx) in order.into_iter().enumerate() {
        folds[pos % k].push(idx);
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Pooled out-of-fold log-loss for `kind`: total loss over every held-out
/// prediction divided by the total held-out count.
pub fn cross_validate(
    kind: ModelKind,
    data: &Dataset,
    folds: &[Vec<usize>],
    opts: &IrlsOptions,
    parallel: bool,
) -> Result<f64, AppError> {
    let per_fold: Vec<Result<FoldLoss, AppError>> = if parallel {
        (0..folds.len())
            .into_par_iter()
            .map(|f| fold_loss(kind, data, folds, f, opts))
            .collect()
    } else {
        (0..folds.len())
            .map(|f| fold_loss(kind, data, folds, f, opts))
            .collect()
    };

    let mut total = 0.0;
    let mut count = 0usize;
    for result in per_fold {
        let fold = result?;
        total += fold.loss_sum;
        count += fold.count;
    }
    if count == 0 {
        return Err(AppError::data("Cross-validation produced no held-out predictions."));
    }
    Ok(total / count as f64)
}

fn fold_loss(
    kind: ModelKind,
    data: &Dataset,
    folds: &[Vec<usize>],
    held_out: usize,
    opts: &IrlsOptions,
) -> Result<FoldLoss, AppError> {
    let train_idx: Vec<usize> = folds
        .iter()
        .enumerate()
        .filter(|(f, _)| *f != held_out)
        .flat_map(|(_, idx)| idx.iter().copied())
        .collect();
    let train = data.select(&train_idx);

    let model = fit_coefficients(kind, &train, opts).map_err(|e| {
        AppError::new(
            e.kind(),
            format!("CV fold {}/{}: {}", held_out + 1, folds.len(), e.message()),
        )
    })?;

    let mut loss_sum = 0.0;
    for &i in &folds[held_out] {
        let obs = &data.rows()[i];
        let p = predict(&model, obs)?;
        loss_sum += log_loss(obs.outcome_f64(), p);
    }

    log::debug!(
        "cv {} fold {}: n_train={} n_test={} loss={:.6}",
        kind.display_name(),
        held_out + 1,
        train.len(),
        folds[held_out].len(),
        loss_sum / folds[held_out].len().max(1) as f64
    );

    Ok(FoldLoss {
        loss_sum,
        count: folds[held_out].len(),
    })
}
