//! Dynamic gridding: rebuild the parameter grid around the current posterior.
//!
//! A standardized grid is built from one set of axis coordinates replicated
//! across every parameter, then mapped into parameter space with a rotation
//! derived from the posterior covariance and shifted to the posterior mean.
//! Infeasible points are dropped and the inference state is rebuilt on the
//! new grid.

use ado_types::{internal_error, invalid_argument, AdoResult, AxisDef, Grid, GridAxes};
use chrono::{DateTime, Utc};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{PriorStrategy, RegridConfig, Rotation};
use crate::engine::{Engine, InferenceState};
use crate::numerics::mvn_log_density;

/// State captured immediately before an applied regrid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub recorded_at: DateTime<Utc>,
    /// Posterior mean the new grid is centered on.
    pub mean: DVector<f64>,
    /// Posterior covariance the new grid is shaped by.
    pub covariance: DMatrix<f64>,
    /// Points generated by this regrid (without previously kept points).
    pub grid: Grid,
    /// Prior over the old grid.
    pub prior: DVector<f64>,
    /// Posterior over the old grid.
    pub posterior: DVector<f64>,
}

/// Result of [`Engine::update_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegridOutcome {
    /// The parameter grid was replaced or extended.
    Applied {
        /// Feasible points generated by this regrid.
        new_points: usize,
        /// Size of the parameter grid afterwards.
        total_points: usize,
    },
    /// The posterior covariance cannot shape a new grid; nothing changed.
    Degenerate { determinant: f64 },
}

impl RegridOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Matrix `R` with `Rᵀ R = cov` (or, for [`Rotation::None`], the diagonal of
/// standard deviations).
pub fn rotation_matrix(rotation: Rotation, cov: &DMatrix<f64>) -> AdoResult<DMatrix<f64>> {
    match rotation {
        Rotation::Eig => {
            let eigen = cov.clone().symmetric_eigen();
            let scale = eigen.eigenvalues.map(|l| l.max(0.0).sqrt());
            // Eigenvectors of a symmetric matrix are orthonormal: V⁻¹ = Vᵀ.
            Ok(DMatrix::from_diagonal(&scale) * eigen.eigenvectors.transpose())
        }
        Rotation::Svd => {
            let svd = cov.clone().svd(false, true);
            let v_t = svd
                .v_t
                .ok_or_else(|| internal_error!("SVD did not produce right singular vectors"))?;
            Ok(DMatrix::from_diagonal(&svd.singular_values.map(f64::sqrt)) * v_t)
        }
        Rotation::None => Ok(DMatrix::from_diagonal(
            &cov.diagonal().map(|v| v.max(0.0).sqrt()),
        )),
    }
}

impl Engine {
    /// Re-center and re-shape the parameter grid around the current posterior.
    ///
    /// Returns [`RegridOutcome::Degenerate`] without changing anything when the
    /// posterior covariance is singular. Any error also leaves the engine
    /// unchanged.
    pub fn update_grid(&mut self, config: &RegridConfig) -> AdoResult<RegridOutcome> {
        let coords = config.axis_coordinates()?;

        let mean = self.post_mean();
        let cov = self.post_cov();
        let determinant = cov.determinant();
        if determinant == 0.0 || !determinant.is_finite() {
            warn!(engine_id = %self.id, determinant, "posterior covariance is singular, grid not updated");
            return Ok(RegridOutcome::Degenerate { determinant });
        }

        let rotation = rotation_matrix(config.rotation, &cov)?;
        let params = self.model.params().to_vec();
        let standard = Grid::from_axes(&GridAxes {
            axes: params
                .iter()
                .map(|name| AxisDef {
                    name: name.clone(),
                    values: coords.clone(),
                })
                .collect(),
        })?;

        let rotated = standard.points() * &rotation;
        let points = DMatrix::from_fn(rotated.nrows(), rotated.ncols(), |i, j| {
            rotated[(i, j)] + mean[j]
        });
        let fresh = Grid::new(params, points)?.filter_rows(|row| {
            row.iter().all(|v| v.is_finite()) && self.model.is_feasible(row)
        });
        if fresh.is_empty() {
            return Err(invalid_argument!(
                "regrid produced no feasible parameter points"
            ));
        }

        let grid = if config.append {
            self.state.param_grid.vstack(&fresh)?
        } else {
            fresh.clone()
        };
        let mut staged = InferenceState::build(
            &self.model,
            &self.design_grid,
            grid,
            self.task.responses(),
        )?;

        match config.prior {
            PriorStrategy::Recalc => {
                for obs in &self.observations {
                    let (_, design_idx) = self.resolve_design(&obs.design)?;
                    let response_idx = self.resolve_response(obs.response)?;
                    staged.observe(design_idx, response_idx)?;
                }
            }
            PriorStrategy::Normal => {
                let Some(density) = mvn_log_density(&mean, &cov, fresh.points()) else {
                    warn!(engine_id = %self.id, "posterior covariance is not positive definite, grid not updated");
                    return Ok(RegridOutcome::Degenerate { determinant });
                };
                let log_prior: Vec<f64> = if config.append {
                    self.state
                        .posterior
                        .log_prior()
                        .iter()
                        .copied()
                        .chain(density)
                        .collect()
                } else {
                    density
                };
                staged.posterior.reset_prior(DVector::from_vec(log_prior))?;
            }
            PriorStrategy::None => {}
        }

        let new_points = fresh.nrows();
        let total_points = staged.param_grid.nrows();
        self.history.push(GridSnapshot {
            recorded_at: Utc::now(),
            mean,
            covariance: cov,
            grid: fresh,
            prior: self.state.posterior.prior(),
            posterior: self.state.posterior.posterior(),
        });
        self.state = staged;

        info!(
            engine_id = %self.id,
            rotation = ?config.rotation,
            prior = ?config.prior,
            append = config.append,
            new_points,
            total_points,
            "updated parameter grid"
        );
        Ok(RegridOutcome::Applied {
            new_points,
            total_points,
        })
    }
}
