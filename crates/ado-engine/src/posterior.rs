//! Log-space prior and posterior over the parameter grid.

use ado_types::{invalid_argument, AdoResult, Grid};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::numerics::logsumexp;

/// Marginal posterior of one parameter axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marginal {
    pub param: String,
    /// Distinct grid values of the parameter, ascending.
    pub values: Vec<f64>,
    /// Posterior mass at each value.
    pub probs: Vec<f64>,
}

/// Log-prior and log-posterior vectors, each normalized so that
/// `logsumexp == 0`.
#[derive(Debug, Clone)]
pub struct PosteriorStore {
    log_prior: DVector<f64>,
    log_post: DVector<f64>,
}

impl PosteriorStore {
    /// Uniform distribution over `n` grid points.
    pub fn uniform(n: usize) -> Self {
        let zeros = DVector::<f64>::zeros(n);
        let log_prior = zeros.add_scalar(-logsumexp(zeros.iter().copied()));
        Self {
            log_post: log_prior.clone(),
            log_prior,
        }
    }

    pub fn len(&self) -> usize {
        self.log_post.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_post.is_empty()
    }

    pub fn log_prior(&self) -> &DVector<f64> {
        &self.log_prior
    }

    pub fn log_posterior(&self) -> &DVector<f64> {
        &self.log_post
    }

    pub fn prior(&self) -> DVector<f64> {
        self.log_prior.map(f64::exp)
    }

    pub fn posterior(&self) -> DVector<f64> {
        self.log_post.map(f64::exp)
    }

    /// Replace the prior with the normalized `log_prior` and reset the
    /// posterior to it.
    pub fn reset_prior(&mut self, log_prior: DVector<f64>) -> AdoResult<()> {
        if log_prior.len() != self.len() {
            return Err(invalid_argument!(
                "prior has {} entries for {} grid points",
                log_prior.len(),
                self.len()
            ));
        }
        let norm = logsumexp(log_prior.iter().copied());
        if !norm.is_finite() {
            return Err(invalid_argument!("prior has no finite probability mass"));
        }
        self.log_prior = log_prior.add_scalar(-norm);
        self.log_post = self.log_prior.clone();
        Ok(())
    }

    /// Add a log-likelihood vector to the posterior and renormalize.
    ///
    /// Fails without touching the posterior when the observation is
    /// impossible at every grid point that still carries mass.
    pub fn observe(&mut self, log_lik: &[f64]) -> AdoResult<()> {
        if log_lik.len() != self.len() {
            return Err(invalid_argument!(
                "likelihood has {} entries for {} grid points",
                log_lik.len(),
                self.len()
            ));
        }
        let candidate = DVector::from_iterator(
            self.len(),
            self.log_post.iter().zip(log_lik).map(|(post, ll)| post + ll),
        );
        let norm = logsumexp(candidate.iter().copied());
        if !norm.is_finite() {
            return Err(invalid_argument!(
                "observation has zero likelihood under the current posterior"
            ));
        }
        self.log_post = candidate.add_scalar(-norm);
        Ok(())
    }

    /// Posterior-weighted average of the grid rows.
    pub fn mean(&self, grid: &Grid) -> DVector<f64> {
        grid.points().tr_mul(&self.posterior())
    }

    /// Posterior-weighted covariance of the grid rows.
    pub fn covariance(&self, grid: &Grid) -> DMatrix<f64> {
        let post = self.posterior();
        let mean = grid.points().tr_mul(&post);
        let points = grid.points();
        let dev = DMatrix::from_fn(points.nrows(), points.ncols(), |i, j| points[(i, j)] - mean[j]);
        let weighted = DMatrix::from_fn(dev.nrows(), dev.ncols(), |i, j| dev[(i, j)] * post[i]);
        dev.tr_mul(&weighted)
    }

    pub fn std_dev(&self, grid: &Grid) -> DVector<f64> {
        self.covariance(grid).diagonal().map(f64::sqrt)
    }

    /// Posterior mass bucketed by each parameter's distinct grid values.
    pub fn marginals(&self, grid: &Grid) -> Vec<Marginal> {
        let post = self.posterior();
        grid.labels()
            .iter()
            .enumerate()
            .map(|(j, param)| {
                let mut pairs: Vec<(f64, f64)> = grid
                    .points()
                    .column(j)
                    .iter()
                    .copied()
                    .zip(post.iter().copied())
                    .collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut values: Vec<f64> = Vec::new();
                let mut probs: Vec<f64> = Vec::new();
                for (value, mass) in pairs {
                    match (values.last(), probs.last_mut()) {
                        (Some(&last), Some(total)) if last == value => *total += mass,
                        _ => {
                            values.push(value);
                            probs.push(mass);
                        }
                    }
                }
                Marginal {
                    param: param.clone(),
                    values,
                    probs,
                }
            })
            .collect()
    }
}
