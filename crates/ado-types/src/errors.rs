use thiserror::Error;

/// Main error type for the ADO system
#[derive(Error, Debug)]
pub enum AdoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model is bound to task '{model_task}', not to task '{task}'")]
    MismatchedModel { task: String, model_task: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Model contract violation: probability {value} at design row {design_row}, parameter row {param_row}"
    )]
    ModelContractViolation {
        design_row: usize,
        param_row: usize,
        value: f64,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ADO operations
pub type AdoResult<T> = Result<T, AdoError>;

/// Macro for creating invalid-argument errors
#[macro_export]
macro_rules! invalid_argument {
    ($($arg:tt)*) => {
        $crate::AdoError::InvalidArgument(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::AdoError::Config(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::AdoError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AdoError::ModelContractViolation {
            design_row: 3,
            param_row: 7,
            value: 1.5,
        };

        assert!(error.to_string().contains("contract violation"));
        assert!(error.to_string().contains("1.5"));
        assert!(error.to_string().contains("design row 3"));
    }

    #[test]
    fn test_error_conversion() {
        let json_error = serde_json::from_str::<u32>("not a number").unwrap_err();
        let ado_error: AdoError = json_error.into();

        match ado_error {
            AdoError::Serialization(_) => (),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_macros() {
        let err = invalid_argument!("Unknown kind: {}", "best");
        assert!(matches!(err, AdoError::InvalidArgument(ref m) if m == "Unknown kind: best"));
        let err = config_error!("Empty axis: {}", "x");
        assert!(matches!(err, AdoError::Config(_)));
        let err = internal_error!("unreachable state");
        assert!(matches!(err, AdoError::Internal(_)));
    }
}
