//! Numerical helpers shared by the inference components.

use nalgebra::{Cholesky, DMatrix, DVector};

/// Numerically stable `ln(Σ exp(x))`. Returns `-inf` for an empty input or
/// when every term is `-inf`.
pub fn logsumexp<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let max = iter.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + iter.map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Bernoulli log-likelihood `y ln p + (1 - y) ln(1 - p)`, taking `0 ln 0 = 0`.
pub fn log_lik_bernoulli(y: f64, p: f64) -> f64 {
    let mut ll = 0.0;
    if y != 0.0 {
        ll += y * p.ln();
    }
    if y != 1.0 {
        ll += (1.0 - y) * (1.0 - p).ln();
    }
    ll
}

/// Entropy contribution `-exp(ll) * ll` of one outcome with log-probability
/// `ll`; impossible outcomes contribute nothing.
pub fn entropy_term(ll: f64) -> f64 {
    if ll == f64::NEG_INFINITY {
        0.0
    } else {
        -ll.exp() * ll
    }
}

/// Log density of `N(mean, cov)` at every row of `points`.
///
/// Returns `None` when `cov` is not positive definite.
pub fn mvn_log_density(
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
    points: &DMatrix<f64>,
) -> Option<Vec<f64>> {
    let k = mean.len();
    let chol = Cholesky::new(cov.clone())?;
    let log_det = 2.0 * chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>();
    let norm = -0.5 * (k as f64 * (2.0 * std::f64::consts::PI).ln() + log_det);

    let densities = points
        .row_iter()
        .map(|row| {
            let diff = DVector::from_iterator(k, row.iter().zip(mean.iter()).map(|(x, m)| x - m));
            let solved = chol.solve(&diff);
            norm - 0.5 * diff.dot(&solved)
        })
        .collect();
    Some(densities)
}
