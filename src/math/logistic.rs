//! Logit link helpers and the Bernoulli likelihood.

/// Probabilities are clamped into `[PROB_EPS, 1 - PROB_EPS]` before logs.
pub const PROB_EPS: f64 = 1e-12;

/// Inverse logit, stable for large |η|.
pub fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

pub fn clamp_prob(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Binary log-loss for a single prediction (natural log, clamped).
pub fn log_loss(y: f64, p: f64) -> f64 {
    let p = clamp_prob(p);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

/// Bernoulli log-likelihood of outcomes `y` under probabilities `p`.
///
/// Exact zeros/ones are clamped, so a perfectly separated fit yields a large
/// finite value rather than `-inf`.
pub fn bernoulli_log_likelihood(y: &[f64], p: &[f64]) -> f64 {
    y.iter().zip(p).map(|(&yi, &pi)| -log_loss(yi, pi)).sum()
}
