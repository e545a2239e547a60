//! Task descriptors: the design variables a caller controls and the responses
//! an experiment can produce.

use serde::{Deserialize, Serialize};

use crate::errors::AdoResult;
use crate::config_error;

/// Derive a key from a display name: whitespace runs become `_`, then every
/// character outside `[A-Za-z0-9_-]` is dropped.
pub fn derive_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                key.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            key.push(c);
        }
    }
    key
}

/// An experimental task.
///
/// Two tasks are equal when their keys, design variables and response sets are
/// equal; the display name is not part of identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    name: String,
    key: String,
    designs: Vec<String>,
    responses: Vec<f64>,
}

impl Task {
    pub fn new<S, I, R>(name: &str, designs: I, responses: R) -> AdoResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
        R: IntoIterator<Item = f64>,
    {
        let designs: Vec<String> = designs.into_iter().map(Into::into).collect();
        let responses: Vec<f64> = responses.into_iter().collect();

        if designs.is_empty() {
            return Err(config_error!("task '{name}' declares no design variables"));
        }
        for (i, d) in designs.iter().enumerate() {
            if designs[..i].contains(d) {
                return Err(config_error!("task '{name}' repeats design variable '{d}'"));
            }
        }
        if responses.is_empty() {
            return Err(config_error!("task '{name}' declares no responses"));
        }
        for (i, r) in responses.iter().enumerate() {
            if !r.is_finite() {
                return Err(config_error!("task '{name}' has non-finite response {r}"));
            }
            if responses[..i].contains(r) {
                return Err(config_error!("task '{name}' repeats response {r}"));
            }
        }

        Ok(Self {
            name: name.to_string(),
            key: derive_key(name),
            designs,
            responses,
        })
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Labels of the design variables, in declaration order.
    pub fn designs(&self) -> &[String] {
        &self.designs
    }

    /// Possible values of the response variable.
    pub fn responses(&self) -> &[f64] {
        &self.responses
    }

    /// Whether the response set is exactly {0, 1}.
    pub fn is_binary(&self) -> bool {
        self.responses.len() == 2 && self.responses.contains(&0.0) && self.responses.contains(&1.0)
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.designs == other.designs && self.responses == other.responses
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Task('{}', designs={:?}, responses={:?})",
            self.name, self.designs, self.responses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdoError;

    #[test]
    fn key_is_derived_from_name() {
        assert_eq!(derive_key("Task A"), "Task_A");
        assert_eq!(derive_key("Delay  discounting (2AFC)!"), "Delay_discounting_2AFC");
        assert_eq!(derive_key("psi-func_v2"), "psi-func_v2");
    }

    #[test]
    fn task_accessors() {
        let task = Task::new("Task A", ["d1", "d2"], [0.0, 1.0]).unwrap();
        assert_eq!(task.name(), "Task A");
        assert_eq!(task.key(), "Task_A");
        assert_eq!(task.designs(), ["d1".to_string(), "d2".to_string()]);
        assert_eq!(task.responses(), [0.0, 1.0]);
        assert!(task.is_binary());
        assert_eq!(
            task.to_string(),
            "Task('Task A', designs=[\"d1\", \"d2\"], responses=[0.0, 1.0])"
        );
    }

    #[test]
    fn explicit_key_overrides_derived() {
        let task = Task::new("Task A", ["d1"], [0.0, 1.0]).unwrap().with_key("a");
        assert_eq!(task.key(), "a");
    }

    #[test]
    fn equality_ignores_display_name() {
        let a = Task::new("Task A", ["d1"], [0.0, 1.0]).unwrap().with_key("k");
        let b = Task::new("Another name", ["d1"], [0.0, 1.0]).unwrap().with_key("k");
        let c = Task::new("Task A", ["d2"], [0.0, 1.0]).unwrap().with_key("k");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_bad_declarations() {
        let empty: [&str; 0] = [];
        assert!(matches!(Task::new("t", empty, [0.0, 1.0]), Err(AdoError::Config(_))));
        assert!(matches!(Task::new("t", ["x", "x"], [0.0, 1.0]), Err(AdoError::Config(_))));
        assert!(matches!(Task::new("t", ["x"], []), Err(AdoError::Config(_))));
        assert!(matches!(Task::new("t", ["x"], [1.0, 1.0]), Err(AdoError::Config(_))));
        assert!(matches!(Task::new("t", ["x"], [f64::NAN]), Err(AdoError::Config(_))));
    }

    #[test]
    fn non_binary_response_set() {
        let task = Task::new("t", ["x"], [0.0, 1.0, 2.0]).unwrap();
        assert!(!task.is_binary());
    }
}
