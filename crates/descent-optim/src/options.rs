//! Solver configuration.

use descent_core::{
    convergence::StoppingCriterion,
    direction::{LineSearchDirectionType, NonlinearConjugateGradientType},
    error::{SolverError, SolverResult},
    line_search::{LineSearchInterpolation, LineSearchParams, LineSearchType},
    types::Scalar,
};
use num_traits::Float;

/// Options controlling a minimization run.
///
/// All fields are public; the `with_*` methods are shorthand for building a
/// configuration in one expression. Nothing is clamped: [`validate`]
/// reports the first invalid field and the solver refuses to start.
///
/// [`validate`]: SolverOptions::validate
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions<T: Scalar> {
    /// Maximum number of accepted steps
    pub max_iterations: usize,
    /// Absolute threshold on the gradient max-norm
    pub gradient_tolerance: T,
    /// Threshold on |Δf| / max(|f|, ε)
    pub function_tolerance: T,
    /// Threshold on ‖Δx‖ / (‖x‖ + ε)
    pub parameter_tolerance: T,

    /// Line search algorithm
    pub line_search_type: LineSearchType,
    /// Search direction strategy
    pub direction_type: LineSearchDirectionType,
    /// β formula for nonlinear conjugate gradient
    pub nonlinear_conjugate_gradient_type: NonlinearConjugateGradientType,
    /// Conjugate gradient restart period; `None` restarts every N iterations
    pub conjugate_gradient_restart_period: Option<usize>,
    /// Number of correction pairs kept by L-BFGS
    pub memory_size: usize,

    /// First trial step of the first line search
    pub initial_step_size: T,
    /// Armijo constant c₁
    pub sufficient_decrease_c1: T,
    /// Wolfe curvature constant c₂
    pub curvature_c2: T,
    /// Trial step budget per line search
    pub max_line_search_iterations: usize,
    /// Trial step model
    pub line_search_interpolation: LineSearchInterpolation,
    /// Bisection factor for backtracking
    pub backtracking_contraction: T,
    /// Lower bound on α_new / α when shrinking
    pub max_step_contraction: T,
    /// Upper bound on α_new / α when shrinking
    pub min_step_contraction: T,
    /// Upper bound on α_new / α while bracketing
    pub max_step_expansion: T,
    /// Smallest step before a line search gives up
    pub min_step_size: T,
    /// Largest trial step
    pub max_step_size: T,
    /// Relative bracket width treated as collapsed
    pub bracket_tolerance: T,

    /// Retry a failed line search once along steepest descent
    pub retry_with_steepest_descent: bool,
}

impl<T: Scalar> Default for SolverOptions<T> {
    fn default() -> Self {
        let criterion = StoppingCriterion::<T>::default();
        let params = LineSearchParams::<T>::default();
        Self {
            max_iterations: criterion.max_iterations,
            gradient_tolerance: criterion.gradient_tolerance,
            function_tolerance: criterion.function_tolerance,
            parameter_tolerance: criterion.parameter_tolerance,
            line_search_type: LineSearchType::default(),
            direction_type: LineSearchDirectionType::default(),
            nonlinear_conjugate_gradient_type: NonlinearConjugateGradientType::default(),
            conjugate_gradient_restart_period: None,
            memory_size: 20,
            initial_step_size: T::one(),
            sufficient_decrease_c1: params.c1,
            curvature_c2: params.c2,
            max_line_search_iterations: params.max_iterations,
            line_search_interpolation: params.interpolation,
            backtracking_contraction: params.rho,
            max_step_contraction: params.max_step_contraction,
            min_step_contraction: params.min_step_contraction,
            max_step_expansion: params.max_step_expansion,
            min_step_size: params.min_step_size,
            max_step_size: params.max_step_size,
            bracket_tolerance: params.bracket_tolerance,
            retry_with_steepest_descent: true,
        }
    }
}

impl<T: Scalar> SolverOptions<T> {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for steepest descent with backtracking.
    pub fn steepest_descent() -> Self {
        Self::new()
            .with_direction_type(LineSearchDirectionType::SteepestDescent)
            .with_line_search_type(LineSearchType::Backtracking)
    }

    /// Options for nonlinear conjugate gradient with a strong Wolfe search.
    ///
    /// Uses c₂ = 0.1, which conjugate gradient needs to keep producing
    /// descent directions.
    pub fn conjugate_gradient(kind: NonlinearConjugateGradientType) -> Self {
        Self::new()
            .with_direction_type(LineSearchDirectionType::NonlinearConjugateGradient)
            .with_nonlinear_conjugate_gradient_type(kind)
            .with_curvature_c2(<T as Scalar>::from_f64(0.1))
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

    /// Sets the function tolerance.
    pub fn with_function_tolerance(mut self, tolerance: T) -> Self {
        self.function_tolerance = tolerance;
        self
    }

    /// Sets the parameter tolerance.
    pub fn with_parameter_tolerance(mut self, tolerance: T) -> Self {
        self.parameter_tolerance = tolerance;
        self
    }

    /// Sets the line search algorithm.
    pub fn with_line_search_type(mut self, line_search_type: LineSearchType) -> Self {
        self.line_search_type = line_search_type;
        self
    }

    /// Sets the search direction strategy.
    pub fn with_direction_type(mut self, direction_type: LineSearchDirectionType) -> Self {
        self.direction_type = direction_type;
        self
    }

    /// Sets the conjugate gradient β formula.
    pub fn with_nonlinear_conjugate_gradient_type(
        mut self,
        kind: NonlinearConjugateGradientType,
    ) -> Self {
        self.nonlinear_conjugate_gradient_type = kind;
        self
    }

    /// Sets the conjugate gradient restart period.
    pub fn with_conjugate_gradient_restart_period(mut self, period: usize) -> Self {
        self.conjugate_gradient_restart_period = Some(period);
        self
    }

    /// Sets the L-BFGS memory size.
    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    /// Sets the first trial step.
    pub fn with_initial_step_size(mut self, step: T) -> Self {
        self.initial_step_size = step;
        self
    }

    /// Sets the Armijo constant.
    pub fn with_sufficient_decrease_c1(mut self, c1: T) -> Self {
        self.sufficient_decrease_c1 = c1;
        self
    }

    /// Sets the curvature constant.
    pub fn with_curvature_c2(mut self, c2: T) -> Self {
        self.curvature_c2 = c2;
        self
    }

    /// Sets the trial step budget per line search.
    pub fn with_max_line_search_iterations(mut self, iterations: usize) -> Self {
        self.max_line_search_iterations = iterations;
        self
    }

    /// Sets the trial step model.
    pub fn with_line_search_interpolation(mut self, interpolation: LineSearchInterpolation) -> Self {
        self.line_search_interpolation = interpolation;
        self
    }

    /// Sets the bracket collapse tolerance.
    pub fn with_bracket_tolerance(mut self, tolerance: T) -> Self {
        self.bracket_tolerance = tolerance;
        self
    }

    /// Enables or disables the steepest descent retry.
    pub fn with_retry_with_steepest_descent(mut self, retry: bool) -> Self {
        self.retry_with_steepest_descent = retry;
        self
    }

    /// Line search parameters derived from these options.
    pub fn line_search_params(&self) -> LineSearchParams<T> {
        LineSearchParams {
            c1: self.sufficient_decrease_c1,
            c2: self.curvature_c2,
            max_iterations: self.max_line_search_iterations,
            min_step_size: self.min_step_size,
            max_step_size: self.max_step_size,
            rho: self.backtracking_contraction,
            max_step_contraction: self.max_step_contraction,
            min_step_contraction: self.min_step_contraction,
            max_step_expansion: self.max_step_expansion,
            bracket_tolerance: self.bracket_tolerance,
            interpolation: self.line_search_interpolation,
        }
    }

    /// Stopping criterion derived from these options.
    pub fn stopping_criterion(&self) -> StoppingCriterion<T> {
        StoppingCriterion {
            max_iterations: self.max_iterations,
            gradient_tolerance: self.gradient_tolerance,
            function_tolerance: self.function_tolerance,
            parameter_tolerance: self.parameter_tolerance,
        }
    }

    /// Conjugate gradient restart period for a problem of `num_parameters`.
    pub fn restart_period(&self, num_parameters: usize) -> usize {
        self.conjugate_gradient_restart_period
            .unwrap_or(num_parameters)
    }

    /// Checks every field, returning the first violation.
    pub fn validate(&self) -> SolverResult<()> {
        for (name, value) in [
            ("gradient_tolerance", self.gradient_tolerance),
            ("function_tolerance", self.function_tolerance),
            ("parameter_tolerance", self.parameter_tolerance),
        ] {
            if !(value >= T::zero() && Float::is_finite(value)) {
                return Err(SolverError::invalid_configuration(
                    "tolerance must be finite and non-negative",
                    name,
                    value,
                ));
            }
        }

        if self.direction_type == LineSearchDirectionType::Lbfgs && self.memory_size == 0 {
            return Err(SolverError::invalid_configuration(
                "L-BFGS needs room for at least one correction pair",
                "memory_size",
                self.memory_size,
            ));
        }
        if self.conjugate_gradient_restart_period == Some(0) {
            return Err(SolverError::invalid_configuration(
                "restart period must be positive",
                "conjugate_gradient_restart_period",
                0,
            ));
        }
        if !(self.initial_step_size > T::zero() && Float::is_finite(self.initial_step_size)) {
            return Err(SolverError::invalid_configuration(
                "initial step must be positive and finite",
                "initial_step_size",
                self.initial_step_size,
            ));
        }

        self.line_search_params().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = SolverOptions::<f64>::default();
        assert_eq!(options.max_iterations, 50);
        assert_eq!(options.gradient_tolerance, 1e-10);
        assert_eq!(options.function_tolerance, 1e-6);
        assert_eq!(options.parameter_tolerance, 1e-8);
        assert_eq!(options.line_search_type, LineSearchType::Wolfe);
        assert_eq!(options.direction_type, LineSearchDirectionType::Lbfgs);
        assert_eq!(options.memory_size, 20);
        assert_eq!(options.initial_step_size, 1.0);
        assert_eq!(options.sufficient_decrease_c1, 1e-4);
        assert_eq!(options.curvature_c2, 0.9);
        assert_eq!(options.max_line_search_iterations, 20);
        assert!(options.retry_with_steepest_descent);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_line_search_params_follow_options() {
        let options = SolverOptions::<f64>::new()
            .with_sufficient_decrease_c1(1e-3)
            .with_curvature_c2(0.5)
            .with_max_line_search_iterations(7)
            .with_line_search_interpolation(LineSearchInterpolation::Quadratic);
        let params = options.line_search_params();
        assert_eq!(params.c1, 1e-3);
        assert_eq!(params.c2, 0.5);
        assert_eq!(params.max_iterations, 7);
        assert_eq!(params.interpolation, LineSearchInterpolation::Quadratic);
    }

    #[test]
    fn test_restart_period_defaults_to_dimension() {
        let options = SolverOptions::<f64>::new();
        assert_eq!(options.restart_period(7), 7);
        assert_eq!(options.with_conjugate_gradient_restart_period(3).restart_period(7), 3);
    }

    fn invalid_parameter(options: SolverOptions<f64>) -> String {
        match options.validate() {
            Err(SolverError::InvalidConfiguration { parameter, .. }) => parameter,
            other => panic!("expected invalid configuration, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_names_the_field() {
        assert_eq!(
            invalid_parameter(SolverOptions::new().with_gradient_tolerance(-1.0)),
            "gradient_tolerance"
        );
        assert_eq!(
            invalid_parameter(SolverOptions::new().with_function_tolerance(f64::NAN)),
            "function_tolerance"
        );
        assert_eq!(
            invalid_parameter(SolverOptions::new().with_memory_size(0)),
            "memory_size"
        );
        assert_eq!(
            invalid_parameter(SolverOptions::new().with_initial_step_size(0.0)),
            "initial_step_size"
        );
        assert_eq!(
            invalid_parameter(
                SolverOptions::new()
                    .with_sufficient_decrease_c1(0.5)
                    .with_curvature_c2(0.4)
            ),
            "curvature_c2"
        );
        assert_eq!(
            invalid_parameter(SolverOptions::new().with_max_line_search_iterations(0)),
            "max_line_search_iterations"
        );
        assert_eq!(
            invalid_parameter(SolverOptions::new().with_conjugate_gradient_restart_period(0)),
            "conjugate_gradient_restart_period"
        );
    }

    #[test]
    fn test_memory_size_only_matters_for_lbfgs() {
        let options = SolverOptions::<f64>::steepest_descent().with_memory_size(0);
        assert!(options.validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let options = SolverOptions::<f64>::conjugate_gradient(
            NonlinearConjugateGradientType::HestenesStiefel,
        );
        let json = serde_json::to_string(&options).unwrap();
        let back: SolverOptions<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(options, back);
    }
}
