//! Error types for objective evaluation and solver configuration.
//!
//! [`EvaluationError`] is what an objective returns when it cannot be
//! evaluated at a point. Inside a line search such an error only rejects the
//! trial step; at the starting point it ends the solve with a user failure.
//! [`SolverError`] covers configuration mistakes and broken preconditions.

use thiserror::Error;

/// Errors reported by an objective function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The point lies outside the domain of the objective.
    ///
    /// Typical causes are logarithms of negative numbers or parameters the
    /// model cannot represent.
    #[error("Point is outside the objective domain: {reason}")]
    InvalidPoint {
        /// Description of why the point is invalid
        reason: String,
    },

    /// Dimension mismatch between a vector and the objective.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Numerical breakdown while computing the cost or gradient.
    #[error("Numerical error during evaluation: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },

    /// Failure raised by user code with its own message.
    #[error("Objective evaluation failed: {reason}")]
    Failed {
        /// Message supplied by the objective
        reason: String,
    },
}

impl EvaluationError {
    /// Create an InvalidPoint error with a custom reason.
    pub fn invalid_point<S: Into<String>>(reason: S) -> Self {
        Self::InvalidPoint {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Create a generic evaluation failure.
    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Errors raised by the solver machinery itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Invalid solver or line search configuration.
    ///
    /// Raised before any evaluation; values are never clamped silently.
    #[error("Invalid solver configuration: {parameter} = {value}: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// The search direction does not decrease the objective.
    #[error("Invalid search direction: directional derivative {directional_derivative:e} is not negative")]
    InvalidSearchDirection {
        /// Value of direction · gradient at the start of the search
        directional_derivative: f64,
    },

    /// Line search could not produce an acceptable step.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of trial steps attempted
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
    },

    /// Propagated objective error.
    #[error("Objective evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl SolverError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: std::fmt::Display,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a LineSearchFailed error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
        }
    }
}

/// Result type alias for objective evaluations.
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Result type alias for solver operations.
pub type SolverResult<T> = std::result::Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_evaluation_error_display() {
        let err = EvaluationError::invalid_point("log of a negative number");
        assert!(matches!(err, EvaluationError::InvalidPoint { .. }));
        assert_eq!(
            err.to_string(),
            "Point is outside the objective domain: log of a negative number"
        );

        let err = EvaluationError::dimension_mismatch(3, 4);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");
    }

    #[test]
    fn test_invalid_configuration_context() {
        let err = SolverError::invalid_configuration("must be positive", "memory_size", 0);
        assert_eq!(
            err.to_string(),
            "Invalid solver configuration: memory_size = 0: must be positive"
        );

        if let SolverError::InvalidConfiguration {
            reason,
            parameter,
            value,
        } = err
        {
            assert_eq!(reason, "must be positive");
            assert_eq!(parameter, "memory_size");
            assert_eq!(value, "0");
        } else {
            panic!("Expected InvalidConfiguration variant");
        }
    }

    #[test]
    fn test_evaluation_error_propagation() {
        let err: SolverError = EvaluationError::numerical_error("overflow").into();
        assert!(matches!(err, SolverError::Evaluation(_)));
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_solver_error_display() {
        let errors = vec![
            SolverError::line_search_failed("step size too small", 20, 1e-10),
            SolverError::InvalidSearchDirection {
                directional_derivative: 1.5,
            },
            SolverError::invalid_configuration("c1 must be below c2", "curvature_c2", 1e-5),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
