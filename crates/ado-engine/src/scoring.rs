//! Mutual-information scoring of candidate designs.

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::likelihood::LikelihoodTensor;
use crate::numerics::{entropy_term, logsumexp};
use crate::posterior::PosteriorStore;

/// Per-design information scores under the current posterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// `log P(response | design)` with parameters integrated out,
    /// shape `(n_design, n_response)`.
    pub marg_log_lik: DMatrix<f64>,
    /// Entropy of the predictive response distribution.
    pub ent_marg: Vec<f64>,
    /// Expected response entropy given the parameters.
    pub ent_cond: Vec<f64>,
    /// `ent_marg - ent_cond`.
    pub mutual_info: Vec<f64>,
}

impl Scores {
    pub fn compute(tensor: &LikelihoodTensor, posterior: &PosteriorStore) -> Self {
        let log_post = posterior.log_posterior();
        let post = posterior.posterior();
        let n_response = tensor.n_response();

        let rows: Vec<(Vec<f64>, f64, f64)> = (0..tensor.n_design())
            .into_par_iter()
            .map(|d| {
                let mll: Vec<f64> = (0..n_response)
                    .map(|r| {
                        let terms: Vec<f64> = log_post
                            .iter()
                            .enumerate()
                            .map(|(p, lp)| tensor.log_lik(d, p, r) + lp)
                            .collect();
                        logsumexp(terms)
                    })
                    .collect();
                let ent_marg: f64 = mll.iter().map(|&ll| entropy_term(ll)).sum();
                let ent_cond: f64 = tensor
                    .obs_entropy_row(d)
                    .iter()
                    .zip(post.iter())
                    .map(|(h, w)| h * w)
                    .sum();
                (mll, ent_marg, ent_cond)
            })
            .collect();

        let n_design = rows.len();
        let mut marg_log_lik = DMatrix::zeros(n_design, n_response);
        let mut ent_marg = Vec::with_capacity(n_design);
        let mut ent_cond = Vec::with_capacity(n_design);
        for (d, (mll, marg, cond)) in rows.into_iter().enumerate() {
            for (r, ll) in mll.into_iter().enumerate() {
                marg_log_lik[(d, r)] = ll;
            }
            ent_marg.push(marg);
            ent_cond.push(cond);
        }
        let mutual_info = ent_marg.iter().zip(&ent_cond).map(|(m, c)| m - c).collect();

        Self {
            marg_log_lik,
            ent_marg,
            ent_cond,
            mutual_info,
        }
    }

    /// Index of the design with the highest mutual information; ties resolve
    /// to the first.
    pub fn best_design(&self) -> usize {
        let mut best = 0;
        for (i, &mi) in self.mutual_info.iter().enumerate() {
            if mi > self.mutual_info[best] {
                best = i;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ado_types::{Grid, GridAxes, Model, Point, Task};
    use std::sync::Arc;

    fn tensor() -> LikelihoodTensor {
        let task = Arc::new(Task::new("t", ["x"], [0.0, 1.0]).unwrap());
        let model = Model::new("m", task, ["a"]).unwrap().with_func(|pt: &Point<'_>| {
            1.0 / (1.0 + (-4.0 * (pt.value("x") - pt.value("a"))).exp())
        });
        let designs = Grid::from_axes(&GridAxes::new().add_linspace("x", -3.0, 3.0, 13)).unwrap();
        let params = Grid::from_axes(&GridAxes::new().add_linspace("a", -1.0, 1.0, 21)).unwrap();
        LikelihoodTensor::build(&model, &designs, &params, &[0.0, 1.0]).unwrap()
    }

    #[test]
    fn mutual_information_is_non_negative() {
        let tensor = tensor();
        let mut posterior = PosteriorStore::uniform(tensor.n_param());
        let scores = Scores::compute(&tensor, &posterior);
        assert!(scores.mutual_info.iter().all(|&mi| mi >= -1e-10));

        posterior.observe(&tensor.slice(6, 1)).unwrap();
        posterior.observe(&tensor.slice(8, 0)).unwrap();
        let scores = Scores::compute(&tensor, &posterior);
        assert!(scores.mutual_info.iter().all(|&mi| mi >= -1e-10));
    }

    #[test]
    fn predictive_distribution_is_normalized() {
        let tensor = tensor();
        let scores = Scores::compute(&tensor, &PosteriorStore::uniform(tensor.n_param()));
        for d in 0..tensor.n_design() {
            let total: f64 = scores.marg_log_lik.row(d).iter().map(|ll| ll.exp()).sum();
            assert!((total - 1.0).abs() < 1e-12);
            assert!(scores.ent_marg[d] <= 2.0_f64.ln() + 1e-12);
        }
    }

    #[test]
    fn most_informative_design_sits_over_the_prior() {
        // Parameters span [-1, 1]; designs far outside it are nearly certain.
        let tensor = tensor();
        let scores = Scores::compute(&tensor, &PosteriorStore::uniform(tensor.n_param()));
        let best = scores.best_design();
        assert_eq!(best, 6);
        assert!(scores.mutual_info[best] > scores.mutual_info[0]);
        assert!(scores.mutual_info[best] > scores.mutual_info[12]);
    }

    #[test]
    fn ties_pick_the_first_design() {
        let scores = Scores {
            marg_log_lik: DMatrix::zeros(3, 2),
            ent_marg: vec![0.0; 3],
            ent_cond: vec![0.0; 3],
            mutual_info: vec![0.1, 0.3, 0.3],
        };
        assert_eq!(scores.best_design(), 1);
    }
}
