//! The adaptive design optimization engine.
//!
//! An [`Engine`] owns the design grid, the parameter grid and the inference
//! state built on top of them. The usual loop is:
//!
//! 1. [`Engine::get_design`] picks the next design,
//! 2. the experiment runs outside the engine,
//! 3. [`Engine::update`] folds the observed response into the posterior,
//!
//! with an occasional [`Engine::update_grid`] to re-resolve the parameter grid
//! around the current posterior.

use std::sync::Arc;

use ado_types::{
    config_error, invalid_argument, AdoError, AdoResult, Assignment, Grid, GridAxes, Model, Task,
};
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::likelihood::LikelihoodTensor;
use crate::posterior::{Marginal, PosteriorStore};
use crate::regrid::GridSnapshot;
use crate::scoring::Scores;
use crate::selection::DesignKind;

/// Unique engine identifier, attached to log records.
pub type EngineId = Uuid;

/// Column label of the response grid.
const RESPONSE_LABEL: &str = "y_obs";

/// A stored (design, response) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub design: Assignment,
    pub response: f64,
}

/// Everything derived from one parameter grid.
#[derive(Debug, Clone)]
pub(crate) struct InferenceState {
    pub(crate) param_grid: Grid,
    pub(crate) likelihood: LikelihoodTensor,
    pub(crate) posterior: PosteriorStore,
    /// `None` whenever the posterior changed since the last scoring.
    pub(crate) scores: Option<Scores>,
}

impl InferenceState {
    pub(crate) fn build(
        model: &Model,
        design_grid: &Grid,
        param_grid: Grid,
        responses: &[f64],
    ) -> AdoResult<Self> {
        let likelihood = LikelihoodTensor::build(model, design_grid, &param_grid, responses)?;
        let posterior = PosteriorStore::uniform(param_grid.nrows());
        Ok(Self {
            param_grid,
            likelihood,
            posterior,
            scores: None,
        })
    }

    pub(crate) fn observe(&mut self, design_idx: usize, response_idx: usize) -> AdoResult<()> {
        self.posterior
            .observe(&self.likelihood.slice(design_idx, response_idx))?;
        self.scores = None;
        Ok(())
    }

    fn scores(&mut self) -> &Scores {
        let (likelihood, posterior) = (&self.likelihood, &self.posterior);
        self.scores.get_or_insert_with(|| {
            let scores = Scores::compute(likelihood, posterior);
            debug!(n_design = scores.mutual_info.len(), "recomputed mutual information");
            scores
        })
    }
}

/// Bayesian adaptive design optimization engine.
pub struct Engine {
    pub(crate) id: EngineId,
    pub(crate) task: Arc<Task>,
    pub(crate) model: Model,
    pub(crate) config: EngineConfig,
    pub(crate) design_grid: Grid,
    pub(crate) response_grid: Grid,
    pub(crate) state: InferenceState,
    pub(crate) observations: Vec<Observation>,
    pub(crate) history: Vec<GridSnapshot>,
    rng: ChaCha8Rng,
}

impl Engine {
    /// Create an engine over the full grids spanned by `design_axes` and
    /// `param_axes`.
    pub fn new(
        task: Arc<Task>,
        model: Model,
        design_axes: &GridAxes,
        param_axes: &GridAxes,
    ) -> AdoResult<Self> {
        Self::with_config(task, model, design_axes, param_axes, EngineConfig::default())
    }

    pub fn with_config(
        task: Arc<Task>,
        model: Model,
        design_axes: &GridAxes,
        param_axes: &GridAxes,
        config: EngineConfig,
    ) -> AdoResult<Self> {
        if model.task().as_ref() != task.as_ref() {
            return Err(AdoError::MismatchedModel {
                task: task.key().to_string(),
                model_task: model.task().key().to_string(),
            });
        }
        if !task.is_binary() {
            return Err(config_error!(
                "task '{}' responses {:?} are not the binary set {{0, 1}}",
                task.name(),
                task.responses()
            ));
        }

        let design_grid = labeled_grid(design_axes, task.designs(), "design")?;
        let param_grid = labeled_grid(param_axes, model.params(), "parameter")?;
        let response_grid = Grid::new(
            vec![RESPONSE_LABEL.to_string()],
            DMatrix::from_column_slice(task.responses().len(), 1, task.responses()),
        )?;

        let state = InferenceState::build(&model, &design_grid, param_grid, task.responses())?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let id = Uuid::new_v4();
        info!(
            engine_id = %id,
            task = task.key(),
            model = model.key(),
            designs = design_grid.nrows(),
            params = state.param_grid.nrows(),
            "initialized ADO engine"
        );

        Ok(Self {
            id,
            task,
            model,
            config,
            design_grid,
            response_grid,
            state,
            observations: Vec::new(),
            history: Vec::new(),
            rng,
        })
    }

    // -----------------------------------------------------------------------
    // Design selection and updating
    // -----------------------------------------------------------------------

    /// Choose the next design.
    pub fn get_design(&mut self, kind: DesignKind) -> Assignment {
        let index = match kind {
            DesignKind::Optimal => self.state.scores().best_design(),
            DesignKind::Random => self.rng.gen_range(0..self.design_grid.nrows()),
        };
        debug!(engine_id = %self.id, %kind, index, "selected design");
        self.design_grid.row(index)
    }

    /// Update the posterior with the `response` observed at `design`.
    ///
    /// `design` must assign a value to every design variable of the task and to
    /// nothing else. Values are snapped to the nearest grid point. A response
    /// that no grid point with posterior mass can produce is rejected and
    /// leaves the engine unchanged. With
    /// `store`, the observation is kept for replay by
    /// [`PriorStrategy::Recalc`](crate::PriorStrategy::Recalc) regridding.
    pub fn update(&mut self, design: &Assignment, response: f64, store: bool) -> AdoResult<()> {
        let (resolved, design_idx) = self.resolve_design(design)?;
        let response_idx = self.resolve_response(response)?;

        self.state.observe(design_idx, response_idx)?;
        if store {
            self.observations.push(Observation {
                design: resolved,
                response,
            });
        }
        debug!(
            engine_id = %self.id,
            design_idx,
            response_idx,
            stored = store,
            "updated posterior"
        );
        Ok(())
    }

    /// [`Engine::update`] with design values given in task order.
    pub fn update_values(&mut self, values: &[f64], response: f64, store: bool) -> AdoResult<()> {
        let design = Assignment::new(self.task.designs().to_vec(), values.to_vec())?;
        self.update(&design, response, store)
    }

    pub(crate) fn resolve_design(&self, design: &Assignment) -> AdoResult<(Assignment, usize)> {
        let values = design.values_in_order(self.task.designs())?;
        let index = self.design_grid.nearest_index(&values)?;
        let resolved = Assignment::new(self.task.designs().to_vec(), values)?;
        Ok((resolved, index))
    }

    pub(crate) fn resolve_response(&self, response: f64) -> AdoResult<usize> {
        if !response.is_finite() {
            return Err(invalid_argument!("response {response} is not a valid value"));
        }
        self.response_grid.nearest_index(&[response])
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of design variables.
    pub fn num_design(&self) -> usize {
        self.task.designs().len()
    }

    /// Number of model parameters.
    pub fn num_param(&self) -> usize {
        self.model.params().len()
    }

    pub fn design_grid(&self) -> &Grid {
        &self.design_grid
    }

    pub fn param_grid(&self) -> &Grid {
        &self.state.param_grid
    }

    pub fn responses(&self) -> &[f64] {
        self.task.responses()
    }

    pub fn likelihood(&self) -> &LikelihoodTensor {
        &self.state.likelihood
    }

    pub fn log_prior(&self) -> &DVector<f64> {
        self.state.posterior.log_prior()
    }

    pub fn log_posterior(&self) -> &DVector<f64> {
        self.state.posterior.log_posterior()
    }

    pub fn prior(&self) -> DVector<f64> {
        self.state.posterior.prior()
    }

    pub fn posterior(&self) -> DVector<f64> {
        self.state.posterior.posterior()
    }

    pub fn post_mean(&self) -> DVector<f64> {
        self.state.posterior.mean(&self.state.param_grid)
    }

    pub fn post_cov(&self) -> DMatrix<f64> {
        self.state.posterior.covariance(&self.state.param_grid)
    }

    pub fn post_sd(&self) -> DVector<f64> {
        self.state.posterior.std_dev(&self.state.param_grid)
    }

    /// Marginal posterior of each parameter, in parameter order.
    pub fn marginal_posteriors(&self) -> Vec<Marginal> {
        self.state.posterior.marginals(&self.state.param_grid)
    }

    /// Information scores, recomputed first if the posterior changed.
    pub fn scores(&mut self) -> &Scores {
        self.state.scores()
    }

    /// Information scores from the last computation, if still valid.
    pub fn cached_scores(&self) -> Option<&Scores> {
        self.state.scores.as_ref()
    }

    pub fn mutual_info(&mut self) -> &[f64] {
        &self.state.scores().mutual_info
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Snapshots recorded by every applied regrid, oldest first.
    pub fn history(&self) -> &[GridSnapshot] {
        &self.history
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.id)
            .field("task", &self.task.key())
            .field("model", &self.model.key())
            .field("designs", &self.design_grid.nrows())
            .field("params", &self.state.param_grid.nrows())
            .field("observations", &self.observations.len())
            .field("regrids", &self.history.len())
            .finish()
    }
}

/// Build the grid of `axes` with columns in `names` order. The axis names must
/// be exactly `names`.
fn labeled_grid(axes: &GridAxes, names: &[String], what: &str) -> AdoResult<Grid> {
    if let Some(missing) = names.iter().find(|n| axes.get(n).is_none()) {
        return Err(config_error!("no grid axis given for {what} '{missing}'"));
    }
    if let Some(extra) = axes.axes.iter().find(|a| !names.contains(&a.name)) {
        return Err(config_error!("grid axis '{}' is not a {what} name", extra.name));
    }
    Grid::from_axes(axes)?.select(names)
}
