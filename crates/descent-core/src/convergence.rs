//! Termination tests for the minimizer loop.
//!
//! The minimizer asks the [`ConvergenceChecker`] at the top of every
//! iteration whether the current point is good enough, then consults the
//! iteration budget of the [`StoppingCriterion`]. Three tests are available:
//!
//! - **gradient**: ‖g‖∞ ≤ `gradient_tolerance`
//! - **function**: |f_prev − f| / max(|f_prev|, ε) ≤ `function_tolerance`
//! - **parameter**: ‖x_prev − x‖ / (‖x‖ + ε) ≤ `parameter_tolerance`
//!
//! The last two need a previous point, so the first iteration only checks
//! the gradient.

use crate::core::{
    evaluation::EvaluationPoint,
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::fmt;

/// Tolerances and budget deciding when a solve ends.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Maximum number of accepted steps
    pub max_iterations: usize,
    /// Absolute threshold on the gradient max-norm
    pub gradient_tolerance: T,
    /// Threshold on the relative cost change
    pub function_tolerance: T,
    /// Threshold on the relative parameter change
    pub parameter_tolerance: T,
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            gradient_tolerance: T::DEFAULT_GRADIENT_TOLERANCE,
            function_tolerance: T::DEFAULT_FUNCTION_TOLERANCE,
            parameter_tolerance: T::DEFAULT_PARAMETER_TOLERANCE,
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates a stopping criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tolerance: T) -> Self {
        self.gradient_tolerance = tolerance;
        self
    }

    /// Sets the function value change tolerance.
    pub fn with_function_tolerance(mut self, tolerance: T) -> Self {
        self.function_tolerance = tolerance;
        self
    }

    /// Sets the parameter change tolerance.
    pub fn with_parameter_tolerance(mut self, tolerance: T) -> Self {
        self.parameter_tolerance = tolerance;
        self
    }

    /// True once `iteration_count` accepted steps use up the budget.
    pub fn budget_exhausted(&self, iteration_count: usize) -> bool {
        iteration_count >= self.max_iterations
    }
}

/// Which test ended the solve, with the measured value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvergenceReason<T: Scalar> {
    /// Gradient max-norm fell below the tolerance
    GradientTolerance {
        /// ‖g‖∞ at the current point
        gradient_max_norm: T,
        /// Configured tolerance
        tolerance: T,
    },
    /// Relative cost change fell below the tolerance
    FunctionTolerance {
        /// |f_prev − f| / max(|f_prev|, ε)
        relative_change: T,
        /// Configured tolerance
        tolerance: T,
    },
    /// Relative parameter change fell below the tolerance
    ParameterTolerance {
        /// ‖x_prev − x‖ / (‖x‖ + ε)
        relative_change: T,
        /// Configured tolerance
        tolerance: T,
    },
}

impl<T: Scalar> fmt::Display for ConvergenceReason<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GradientTolerance {
                gradient_max_norm,
                tolerance,
            } => write!(
                f,
                "Gradient tolerance reached. Gradient max norm: {:e} <= {:e}",
                Scalar::to_f64(*gradient_max_norm),
                Scalar::to_f64(*tolerance)
            ),
            Self::FunctionTolerance {
                relative_change,
                tolerance,
            } => write!(
                f,
                "Function tolerance reached. |cost_change|/cost: {:e} <= {:e}",
                Scalar::to_f64(*relative_change),
                Scalar::to_f64(*tolerance)
            ),
            Self::ParameterTolerance {
                relative_change,
                tolerance,
            } => write!(
                f,
                "Parameter tolerance reached. Relative step_norm: {:e} <= {:e}",
                Scalar::to_f64(*relative_change),
                Scalar::to_f64(*tolerance)
            ),
        }
    }
}

/// Evaluates the convergence tests of a [`StoppingCriterion`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceChecker;

impl ConvergenceChecker {
    /// Returns the first satisfied test, checked in the order gradient,
    /// function, parameter.
    ///
    /// A point without gradient skips the gradient test.
    pub fn check<T: Scalar>(
        criterion: &StoppingCriterion<T>,
        current: &EvaluationPoint<T>,
        previous: Option<&EvaluationPoint<T>>,
    ) -> Option<ConvergenceReason<T>> {
        if let Some(gradient_max_norm) = current.gradient_max_norm() {
            if gradient_max_norm <= criterion.gradient_tolerance {
                return Some(ConvergenceReason::GradientTolerance {
                    gradient_max_norm,
                    tolerance: criterion.gradient_tolerance,
                });
            }
        }

        let previous = previous?;

        let relative_change = Self::relative_cost_change(previous.cost, current.cost);
        if relative_change <= criterion.function_tolerance {
            return Some(ConvergenceReason::FunctionTolerance {
                relative_change,
                tolerance: criterion.function_tolerance,
            });
        }

        let relative_change = Self::relative_step_norm(&previous.parameters, &current.parameters);
        if relative_change <= criterion.parameter_tolerance {
            return Some(ConvergenceReason::ParameterTolerance {
                relative_change,
                tolerance: criterion.parameter_tolerance,
            });
        }

        None
    }

    /// |f_prev − f| / max(|f_prev|, ε)
    pub fn relative_cost_change<T: Scalar>(previous: T, current: T) -> T {
        Float::abs(previous - current) / Float::max(Float::abs(previous), T::EPSILON)
    }

    /// ‖x_prev − x‖ / (‖x‖ + ε)
    pub fn relative_step_norm<T: Scalar>(previous: &DVector<T>, current: &DVector<T>) -> T {
        (previous - current).norm() / (current.norm() + T::EPSILON)
    }
}
