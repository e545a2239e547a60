//! Likelihood tensor over (design, parameter, response).

use ado_types::{AdoError, AdoResult, Grid, Model, Point};
use rayon::prelude::*;
use tracing::debug;

use crate::numerics::{entropy_term, log_lik_bernoulli};

/// `log P(response | design, parameter)` for every grid combination, plus the
/// per-(design, parameter) entropy of the response distribution.
#[derive(Debug, Clone)]
pub struct LikelihoodTensor {
    n_design: usize,
    n_param: usize,
    n_response: usize,
    /// Flattened `[design][param][response]`.
    log_lik: Vec<f64>,
    /// Flattened `[design][param]`.
    obs_entropy: Vec<f64>,
}

impl LikelihoodTensor {
    /// Evaluate `model` at every (design row, parameter row) pair.
    ///
    /// Fails with [`AdoError::ModelContractViolation`] when the model returns a
    /// value that is not a probability.
    pub fn build(
        model: &Model,
        designs: &Grid,
        params: &Grid,
        responses: &[f64],
    ) -> AdoResult<Self> {
        let n_design = designs.nrows();
        let n_param = params.nrows();
        let n_response = responses.len();

        let labels: Vec<String> = designs
            .labels()
            .iter()
            .chain(params.labels())
            .cloned()
            .collect();
        let param_rows: Vec<Vec<f64>> = (0..n_param).map(|p| params.row_values(p)).collect();

        let rows = (0..n_design)
            .into_par_iter()
            .map(|d| {
                let mut values = designs.row_values(d);
                let split = values.len();
                let mut log_lik = Vec::with_capacity(n_param * n_response);
                let mut obs_entropy = Vec::with_capacity(n_param);

                for (p, param_row) in param_rows.iter().enumerate() {
                    values.truncate(split);
                    values.extend_from_slice(param_row);
                    let prob = model.compute(&Point::new(&labels, &values));
                    if !(0.0..=1.0).contains(&prob) {
                        return Err(AdoError::ModelContractViolation {
                            design_row: d,
                            param_row: p,
                            value: prob,
                        });
                    }

                    let mut entropy = 0.0;
                    for &y in responses {
                        let ll = log_lik_bernoulli(y, prob);
                        entropy += entropy_term(ll);
                        log_lik.push(ll);
                    }
                    obs_entropy.push(entropy);
                }
                Ok((log_lik, obs_entropy))
            })
            .collect::<AdoResult<Vec<_>>>()?;

        let mut log_lik = Vec::with_capacity(n_design * n_param * n_response);
        let mut obs_entropy = Vec::with_capacity(n_design * n_param);
        for (ll, ent) in rows {
            log_lik.extend(ll);
            obs_entropy.extend(ent);
        }

        debug!(n_design, n_param, n_response, "built likelihood tensor");

        Ok(Self {
            n_design,
            n_param,
            n_response,
            log_lik,
            obs_entropy,
        })
    }

    pub fn n_design(&self) -> usize {
        self.n_design
    }

    pub fn n_param(&self) -> usize {
        self.n_param
    }

    pub fn n_response(&self) -> usize {
        self.n_response
    }

    pub fn log_lik(&self, design: usize, param: usize, response: usize) -> f64 {
        self.log_lik[(design * self.n_param + param) * self.n_response + response]
    }

    /// `log P(response | design, ·)` across every parameter row.
    pub fn slice(&self, design: usize, response: usize) -> Vec<f64> {
        (0..self.n_param)
            .map(|p| self.log_lik(design, p, response))
            .collect()
    }

    /// Entropy of the response distribution at one (design, parameter) pair.
    pub fn obs_entropy(&self, design: usize, param: usize) -> f64 {
        self.obs_entropy[design * self.n_param + param]
    }

    /// Entropies across every parameter row for one design.
    pub fn obs_entropy_row(&self, design: usize) -> &[f64] {
        let start = design * self.n_param;
        &self.obs_entropy[start..start + self.n_param]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ado_types::{GridAxes, Task};
    use std::sync::Arc;

    fn setup(func: impl Fn(&Point<'_>) -> f64 + Send + Sync + 'static) -> (Model, Grid, Grid) {
        let task = Arc::new(Task::new("t", ["x"], [0.0, 1.0]).unwrap());
        let model = Model::new("m", task, ["a"]).unwrap().with_func(func);
        let designs = Grid::from_axes(&GridAxes::new().add("x", [-1.0, 0.0, 1.0])).unwrap();
        let params = Grid::from_axes(&GridAxes::new().add("a", [-0.5, 0.5])).unwrap();
        (model, designs, params)
    }

    fn logistic(pt: &Point<'_>) -> f64 {
        1.0 / (1.0 + (-(pt.value("x") - pt.value("a"))).exp())
    }

    #[test]
    fn responses_sum_to_one() {
        let (model, designs, params) = setup(logistic);
        let tensor = LikelihoodTensor::build(&model, &designs, &params, &[0.0, 1.0]).unwrap();

        assert_eq!((tensor.n_design(), tensor.n_param(), tensor.n_response()), (3, 2, 2));
        for d in 0..3 {
            for p in 0..2 {
                let total: f64 = (0..2).map(|r| tensor.log_lik(d, p, r).exp()).sum();
                assert!((total - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn entries_follow_the_model() {
        let (model, designs, params) = setup(logistic);
        let tensor = LikelihoodTensor::build(&model, &designs, &params, &[0.0, 1.0]).unwrap();

        // design x = 1.0, parameter a = -0.5
        let p = 1.0 / (1.0 + (-1.5_f64).exp());
        assert!((tensor.log_lik(2, 0, 1) - p.ln()).abs() < 1e-12);
        assert!((tensor.log_lik(2, 0, 0) - (1.0 - p).ln()).abs() < 1e-12);
        assert_eq!(tensor.slice(2, 1).len(), 2);

        let expected = -(p * p.ln() + (1.0 - p) * (1.0 - p).ln());
        assert!((tensor.obs_entropy(2, 0) - expected).abs() < 1e-12);
        assert_eq!(tensor.obs_entropy_row(2)[0], tensor.obs_entropy(2, 0));
    }

    #[test]
    fn certain_outcomes_have_zero_entropy() {
        let (model, designs, params) = setup(|pt| if pt.value("x") > 0.0 { 1.0 } else { 0.0 });
        let tensor = LikelihoodTensor::build(&model, &designs, &params, &[0.0, 1.0]).unwrap();
        assert_eq!(tensor.log_lik(2, 0, 1), 0.0);
        assert_eq!(tensor.log_lik(2, 0, 0), f64::NEG_INFINITY);
        assert_eq!(tensor.obs_entropy(2, 1), 0.0);
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let (model, designs, params) = setup(|pt| if pt.value("a") > 0.0 { 1.5 } else { 0.5 });
        let err = LikelihoodTensor::build(&model, &designs, &params, &[0.0, 1.0]).unwrap_err();
        match err {
            AdoError::ModelContractViolation { param_row, value, .. } => {
                assert_eq!(param_row, 1);
                assert_eq!(value, 1.5);
            }
            other => panic!("expected contract violation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_nan_probability() {
        let (model, designs, params) = setup(|pt| pt.value("missing"));
        assert!(matches!(
            LikelihoodTensor::build(&model, &designs, &params, &[0.0, 1.0]),
            Err(AdoError::ModelContractViolation { .. })
        ));
    }
}
