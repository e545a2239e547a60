//! Model descriptors: parameter names, the response probability function and
//! optional feasibility constraints on parameters.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::AdoResult;
use crate::grid::Point;
use crate::task::{derive_key, Task};
use crate::config_error;

/// Probability of response `1` given one combined design + parameter point.
pub type ProbabilityFn = Arc<dyn Fn(&Point<'_>) -> f64 + Send + Sync>;

/// Feasibility predicate over a single parameter value.
pub type Constraint = Arc<dyn Fn(f64) -> bool + Send + Sync>;

/// A statistical model of a [`Task`].
#[derive(Clone)]
pub struct Model {
    name: String,
    key: String,
    task: Arc<Task>,
    params: Vec<String>,
    func: Option<ProbabilityFn>,
    constraints: BTreeMap<String, Constraint>,
}

impl Model {
    pub fn new<S, I>(name: &str, task: Arc<Task>, params: I) -> AdoResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        if params.is_empty() {
            return Err(config_error!("model '{name}' declares no parameters"));
        }
        for (i, p) in params.iter().enumerate() {
            if params[..i].contains(p) {
                return Err(config_error!("model '{name}' repeats parameter '{p}'"));
            }
            if task.designs().contains(p) {
                return Err(config_error!(
                    "model '{name}' parameter '{p}' shadows a design variable of task '{}'",
                    task.name()
                ));
            }
        }

        Ok(Self {
            name: name.to_string(),
            key: derive_key(name),
            task,
            params,
            func: None,
            constraints: BTreeMap::new(),
        })
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_func<F>(mut self, func: F) -> Self
    where
        F: Fn(&Point<'_>) -> f64 + Send + Sync + 'static,
    {
        self.func = Some(Arc::new(func));
        self
    }

    /// Restrict `param` to values for which `pred` holds.
    pub fn with_constraint<F>(mut self, param: &str, pred: F) -> AdoResult<Self>
    where
        F: Fn(f64) -> bool + Send + Sync + 'static,
    {
        if !self.params.iter().any(|p| p == param) {
            return Err(config_error!(
                "constraint on unknown parameter '{param}' of model '{}'",
                self.name
            ));
        }
        self.constraints.insert(param.to_string(), Arc::new(pred));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Labels of the model parameters, in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn constraints(&self) -> &BTreeMap<String, Constraint> {
        &self.constraints
    }

    /// Probability of response `1` at `point`. Without a probability function
    /// every point yields 0.5.
    pub fn compute(&self, point: &Point<'_>) -> f64 {
        match &self.func {
            Some(func) => func(point),
            None => 0.5,
        }
    }

    /// Whether a parameter row (ordered as [`Model::params`]) satisfies every
    /// constraint.
    pub fn is_feasible(&self, row: &[f64]) -> bool {
        self.constraints.iter().all(|(param, pred)| {
            self.params
                .iter()
                .position(|p| p == param)
                .map_or(true, |i| pred(row[i]))
        })
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.params == other.params && self.task == other.task
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("task", &self.task.key())
            .field("params", &self.params)
            .field("has_func", &self.func.is_some())
            .field("constraints", &self.constraints.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Model('{}', params={:?})", self.name, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdoError;

    fn task() -> Arc<Task> {
        Arc::new(Task::new("Task A", ["d1", "d2"], [0.0, 1.0]).unwrap())
    }

    #[test]
    fn default_probability_is_one_half() {
        let model = Model::new("Model X", task(), ["m1", "m2"]).unwrap();
        let labels = vec!["d1".to_string(), "m1".to_string()];
        assert_eq!(model.compute(&Point::new(&labels, &[3.0, 4.0])), 0.5);
        assert_eq!(model.key(), "Model_X");
        assert_eq!(model.to_string(), "Model('Model X', params=[\"m1\", \"m2\"])");
    }

    #[test]
    fn probability_function_sees_labels() {
        let model = Model::new("logistic", task(), ["alpha"])
            .unwrap()
            .with_func(|pt| 1.0 / (1.0 + (-(pt.value("d1") - pt.value("alpha"))).exp()));
        let labels = vec!["d1".to_string(), "d2".to_string(), "alpha".to_string()];
        let p = model.compute(&Point::new(&labels, &[2.0, 0.0, 2.0]));
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn constraints_filter_rows() {
        let model = Model::new("m", task(), ["a", "b"])
            .unwrap()
            .with_constraint("b", |v| v > 0.0)
            .unwrap();
        assert!(model.is_feasible(&[-1.0, 0.5]));
        assert!(!model.is_feasible(&[1.0, -0.5]));
        assert!(!model.is_feasible(&[1.0, 0.0]));
    }

    #[test]
    fn rejects_bad_declarations() {
        let empty: [&str; 0] = [];
        assert!(matches!(Model::new("m", task(), empty), Err(AdoError::Config(_))));
        assert!(matches!(Model::new("m", task(), ["a", "a"]), Err(AdoError::Config(_))));
        assert!(matches!(Model::new("m", task(), ["d1"]), Err(AdoError::Config(_))));
        let model = Model::new("m", task(), ["a"]).unwrap();
        assert!(matches!(
            model.with_constraint("zzz", |_| true),
            Err(AdoError::Config(_))
        ));
    }

    #[test]
    fn equality_follows_key_and_task() {
        let shared = task();
        let a = Model::new("m", shared.clone(), ["a"]).unwrap();
        let b = Model::new("m", shared, ["a"]).unwrap().with_func(|_| 0.2);
        let other_task = Arc::new(Task::new("Task B", ["d1"], [0.0, 1.0]).unwrap());
        let c = Model::new("m", other_task, ["a"]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
