//! Line search algorithms for step size selection.
//!
//! A line search restricts the objective to the ray x + α·d and looks for a
//! step α > 0 that decreases the objective enough to make progress. Three
//! strategies share the [`LineSearch`] contract:
//!
//! - [`BacktrackingLineSearch`]: shrink α until the Armijo sufficient decrease
//!   condition holds,
//!   φ(α) ≤ φ(0) + c₁·α·φ'(0)
//! - [`StrongWolfeLineSearch`]: bracketing followed by zoom until the strong
//!   Wolfe conditions hold, which add the curvature condition
//!   |φ'(α)| ≤ c₂·|φ'(0)|
//! - [`MoreThuenteLineSearch`]: the More–Thuente safeguarded interval update
//!   for the same conditions.
//!
//! Here φ(α) = f(x + α·d) and φ'(α) = ∇f(x + α·d)·d.
//!
//! # Failure policy
//!
//! A search returns `Err` only when its preconditions are broken: invalid
//! parameters or a direction that is not a descent direction. Running out of
//! trial steps, a collapsed bracket or a run of unevaluable trials produce an
//! `Ok` result with `success == false` and a message, so that the caller can
//! decide how to recover. Non-finite trial values are treated as rejected
//! trials, never as acceptable steps.

pub mod backtracking;
pub mod function;
pub mod interpolation;
pub mod more_thuente;
pub mod wolfe;

pub use backtracking::BacktrackingLineSearch;
pub use function::{FunctionSample, LineSearchFunction};
pub use more_thuente::MoreThuenteLineSearch;
pub use wolfe::StrongWolfeLineSearch;

use crate::{
    core::{
        error::{SolverError, SolverResult},
        evaluation::EvaluationPoint,
        objective::ObjectiveFunction,
        types::{vector, DVector, Scalar},
    },
};
use num_traits::Float;
use std::fmt::{self, Debug, Display};

/// Which line search the minimizer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineSearchType {
    /// Armijo backtracking
    Backtracking,
    /// Strong Wolfe bracketing and zoom
    #[default]
    Wolfe,
    /// More–Thuente interval update
    MoreThuente,
}

impl Display for LineSearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Backtracking => "BACKTRACKING",
            Self::Wolfe => "WOLFE",
            Self::MoreThuente => "MORE_THUENTE",
        })
    }
}

/// How a new trial step is chosen when the current one is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineSearchInterpolation {
    /// Multiply the step by a fixed contraction factor
    Bisection,
    /// Minimize a quadratic model of φ
    Quadratic,
    /// Minimize a cubic model of φ, falling back to the quadratic
    #[default]
    Cubic,
}

/// Line search parameters.
///
/// Defaults: c₁ = 10⁻⁴, c₂ = 0.9, 20 trial steps, contraction factor 0.5,
/// interpolated steps kept within [10⁻³·α, 0.6·α] when shrinking and within
/// [2·α, 10·α] when expanding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// Armijo constant c₁ ∈ (0, 1)
    pub c1: T,

    /// Curvature constant c₂ ∈ (c₁, 1)
    pub c2: T,

    /// Maximum number of trial steps per search
    pub max_iterations: usize,

    /// Steps below this size end the search
    pub min_step_size: T,

    /// Trial steps are clipped to this size
    pub max_step_size: T,

    /// Contraction factor ρ used by bisection, α ← ρ·α
    pub rho: T,

    /// Lower bound on α_new / α when shrinking
    pub max_step_contraction: T,

    /// Upper bound on α_new / α when shrinking
    pub min_step_contraction: T,

    /// Upper bound on α_new / α while bracketing
    pub max_step_expansion: T,

    /// Relative bracket width at which a bracket counts as collapsed
    pub bracket_tolerance: T,

    /// Trial step model
    pub interpolation: LineSearchInterpolation,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            c1: <T as Scalar>::from_f64(1e-4),
            c2: <T as Scalar>::from_f64(0.9),
            max_iterations: 20,
            min_step_size: T::MIN_STEP_SIZE,
            max_step_size: T::MAX_STEP_SIZE,
            rho: <T as Scalar>::from_f64(0.5),
            max_step_contraction: <T as Scalar>::from_f64(1e-3),
            min_step_contraction: <T as Scalar>::from_f64(0.6),
            max_step_expansion: <T as Scalar>::from_f64(10.0),
            bracket_tolerance: <T as Scalar>::from_f64(1e-10),
            interpolation: LineSearchInterpolation::Cubic,
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Parameters for strong Wolfe searches (c₂ = 0.9, suited to L-BFGS).
    pub fn strong_wolfe() -> Self {
        Self::default()
    }

    /// Parameters for nonlinear conjugate gradient (c₂ = 0.1).
    pub fn conjugate_gradient() -> Self {
        Self {
            c2: <T as Scalar>::from_f64(0.1),
            ..Self::default()
        }
    }

    /// Plain halving backtracking.
    pub fn backtracking() -> Self {
        Self {
            interpolation: LineSearchInterpolation::Bisection,
            ..Self::default()
        }
    }

    /// Validates the parameters.
    ///
    /// Invalid values are reported, never clamped.
    pub fn validate(&self) -> SolverResult<()> {
        let zero = T::zero();
        let one = T::one();

        if !(self.c1 > zero && self.c1 < one) {
            return Err(SolverError::invalid_configuration(
                "Armijo constant c1 must be in (0, 1)",
                "sufficient_decrease_c1",
                self.c1,
            ));
        }
        if !(self.c2 > self.c1 && self.c2 < one) {
            return Err(SolverError::invalid_configuration(
                "Wolfe constant c2 must satisfy c1 < c2 < 1",
                "curvature_c2",
                self.c2,
            ));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::invalid_configuration(
                "must allow at least one trial step",
                "max_line_search_iterations",
                self.max_iterations,
            ));
        }
        if !(self.min_step_size > zero && Float::is_finite(self.min_step_size)) {
            return Err(SolverError::invalid_configuration(
                "minimum step size must be positive",
                "min_step_size",
                self.min_step_size,
            ));
        }
        if !(self.max_step_size > self.min_step_size && Float::is_finite(self.max_step_size)) {
            return Err(SolverError::invalid_configuration(
                "maximum step size must be finite and greater than the minimum step size",
                "max_step_size",
                self.max_step_size,
            ));
        }
        if !(self.rho > zero && self.rho < one) {
            return Err(SolverError::invalid_configuration(
                "backtracking contraction must be in (0, 1)",
                "backtracking_contraction",
                self.rho,
            ));
        }
        if !(self.max_step_contraction > zero && self.max_step_contraction < one) {
            return Err(SolverError::invalid_configuration(
                "must be in (0, 1)",
                "max_step_contraction",
                self.max_step_contraction,
            ));
        }
        if !(self.min_step_contraction > self.max_step_contraction
            && self.min_step_contraction < one)
        {
            return Err(SolverError::invalid_configuration(
                "must satisfy max_step_contraction < min_step_contraction < 1",
                "min_step_contraction",
                self.min_step_contraction,
            ));
        }
        if !(self.max_step_expansion > one && Float::is_finite(self.max_step_expansion)) {
            return Err(SolverError::invalid_configuration(
                "must be finite and greater than 1",
                "max_step_expansion",
                self.max_step_expansion,
            ));
        }
        if !(self.bracket_tolerance >= zero && Float::is_finite(self.bracket_tolerance)) {
            return Err(SolverError::invalid_configuration(
                "must be finite and non-negative",
                "bracket_tolerance",
                self.bracket_tolerance,
            ));
        }

        Ok(())
    }
}

/// Outcome of one line search.
#[derive(Debug, Clone)]
pub struct LineSearchResult<T: Scalar> {
    /// Whether an acceptable step was found
    pub success: bool,

    /// Accepted step on success, last trial step otherwise
    pub step_size: T,

    /// Objective at the accepted step, with gradient
    pub evaluation: Option<EvaluationPoint<T>>,

    /// Number of objective calls
    pub function_evaluations: usize,

    /// Number of objective calls that produced a gradient
    pub gradient_evaluations: usize,

    /// Number of trial steps
    pub iterations: usize,

    /// Why the search failed, or which fallback it took
    pub message: String,
}

impl<T: Scalar> LineSearchResult<T> {
    pub(crate) fn accepted<F: ObjectiveFunction<T> + ?Sized>(
        function: &LineSearchFunction<'_, T, F>,
        step_size: T,
        evaluation: EvaluationPoint<T>,
        iterations: usize,
    ) -> Self {
        Self {
            success: true,
            step_size,
            evaluation: Some(evaluation),
            function_evaluations: function.function_evaluations(),
            gradient_evaluations: function.gradient_evaluations(),
            iterations,
            message: String::new(),
        }
    }

    pub(crate) fn failed<F: ObjectiveFunction<T> + ?Sized>(
        function: &LineSearchFunction<'_, T, F>,
        step_size: T,
        iterations: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            step_size,
            evaluation: None,
            function_evaluations: function.function_evaluations(),
            gradient_evaluations: function.gradient_evaluations(),
            iterations,
            message: message.into(),
        }
    }

    /// Failure before any evaluation.
    pub(crate) fn rejected(step_size: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            step_size,
            evaluation: None,
            function_evaluations: 0,
            gradient_evaluations: 0,
            iterations: 0,
            message: message.into(),
        }
    }

    /// Converts a failed search into a [`SolverError::LineSearchFailed`].
    pub fn into_error(self) -> SolverError {
        SolverError::line_search_failed(self.message, self.iterations, self.step_size.to_f64())
    }
}

/// Trait for line search algorithms.
pub trait LineSearch<T: Scalar>: Debug {
    /// Searches along `direction` from `start`, which must carry a gradient.
    fn search<F>(
        &mut self,
        objective: &F,
        start: &EvaluationPoint<T>,
        direction: &DVector<T>,
        initial_step: T,
        params: &LineSearchParams<T>,
    ) -> SolverResult<LineSearchResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let directional_derivative = start.require_gradient()?.dot(direction);
        self.search_with_deriv(
            objective,
            start,
            direction,
            directional_derivative,
            initial_step,
            params,
        )
    }

    /// Like [`search`](Self::search) with φ'(0) already computed.
    fn search_with_deriv<F>(
        &mut self,
        objective: &F,
        start: &EvaluationPoint<T>,
        direction: &DVector<T>,
        directional_derivative: T,
        initial_step: T,
        params: &LineSearchParams<T>,
    ) -> SolverResult<LineSearchResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized;

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

/// Checks shared by every search before its first evaluation.
///
/// Returns `Ok(Some(result))` with a failed result for non-finite input,
/// which the caller reports instead of searching.
pub(crate) fn preflight<T: Scalar>(
    start: &EvaluationPoint<T>,
    direction: &DVector<T>,
    directional_derivative: T,
    initial_step: T,
    params: &LineSearchParams<T>,
) -> SolverResult<Option<LineSearchResult<T>>> {
    params.validate()?;

    if direction.len() != start.parameters.len() {
        return Err(SolverError::invalid_configuration(
            format!("direction length must equal {}", start.parameters.len()),
            "direction",
            direction.len(),
        ));
    }
    if !vector::is_finite(direction) || !Float::is_finite(directional_derivative) {
        return Ok(Some(LineSearchResult::rejected(
            initial_step,
            "search direction contains non-finite values",
        )));
    }
    if !(initial_step > T::zero() && Float::is_finite(initial_step)) {
        return Ok(Some(LineSearchResult::rejected(
            initial_step,
            format!("initial step {initial_step} is not a positive finite number"),
        )));
    }
    if directional_derivative >= T::zero() {
        return Err(SolverError::InvalidSearchDirection {
            directional_derivative: directional_derivative.to_f64(),
        });
    }

    Ok(None)
}

/// Line search selected at runtime from a [`LineSearchType`].
#[derive(Debug, Clone)]
pub enum LineSearchMethod {
    /// Armijo backtracking
    Backtracking(BacktrackingLineSearch),
    /// Strong Wolfe bracketing and zoom
    Wolfe(StrongWolfeLineSearch),
    /// More–Thuente
    MoreThuente(MoreThuenteLineSearch),
}

impl LineSearchMethod {
    /// Builds the line search for `kind`.
    pub fn new(kind: LineSearchType) -> Self {
        match kind {
            LineSearchType::Backtracking => Self::Backtracking(BacktrackingLineSearch::new()),
            LineSearchType::Wolfe => Self::Wolfe(StrongWolfeLineSearch::new()),
            LineSearchType::MoreThuente => Self::MoreThuente(MoreThuenteLineSearch::new()),
        }
    }

    /// The type this search was built from.
    pub fn kind(&self) -> LineSearchType {
        match self {
            Self::Backtracking(_) => LineSearchType::Backtracking,
            Self::Wolfe(_) => LineSearchType::Wolfe,
            Self::MoreThuente(_) => LineSearchType::MoreThuente,
        }
    }
}

impl<T: Scalar> LineSearch<T> for LineSearchMethod {
    fn search_with_deriv<F>(
        &mut self,
        objective: &F,
        start: &EvaluationPoint<T>,
        direction: &DVector<T>,
        directional_derivative: T,
        initial_step: T,
        params: &LineSearchParams<T>,
    ) -> SolverResult<LineSearchResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        match self {
            Self::Backtracking(ls) => ls.search_with_deriv(
                objective,
                start,
                direction,
                directional_derivative,
                initial_step,
                params,
            ),
            Self::Wolfe(ls) => ls.search_with_deriv(
                objective,
                start,
                direction,
                directional_derivative,
                initial_step,
                params,
            ),
            Self::MoreThuente(ls) => ls.search_with_deriv(
                objective,
                start,
                direction,
                directional_derivative,
                initial_step,
                params,
            ),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Backtracking(ls) => LineSearch::<T>::name(ls),
            Self::Wolfe(ls) => LineSearch::<T>::name(ls),
            Self::MoreThuente(ls) => LineSearch::<T>::name(ls),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::objective::QuadraticObjective;

    #[test]
    fn test_default_params_are_valid() {
        assert!(LineSearchParams::<f64>::default().validate().is_ok());
        assert!(LineSearchParams::<f64>::conjugate_gradient().validate().is_ok());
        assert!(LineSearchParams::<f64>::backtracking().validate().is_ok());
        assert!(LineSearchParams::<f32>::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_params_are_reported() {
        let cases = [
            LineSearchParams {
                c1: 0.0,
                ..LineSearchParams::<f64>::default()
            },
            LineSearchParams {
                c2: 1e-5,
                ..LineSearchParams::default()
            },
            LineSearchParams {
                max_iterations: 0,
                ..LineSearchParams::default()
            },
            LineSearchParams {
                rho: 1.0,
                ..LineSearchParams::default()
            },
            LineSearchParams {
                min_step_contraction: 1e-4,
                ..LineSearchParams::default()
            },
            LineSearchParams {
                max_step_expansion: 0.5,
                ..LineSearchParams::default()
            },
            LineSearchParams {
                bracket_tolerance: f64::NAN,
                ..LineSearchParams::default()
            },
        ];

        for params in cases {
            let err = params.validate().unwrap_err();
            assert!(matches!(err, SolverError::InvalidConfiguration { .. }));
        }
    }

    #[test]
    fn test_every_method_rejects_ascent_direction() {
        let objective = QuadraticObjective::<f64>::simple(2);
        let start =
            EvaluationPoint::evaluate(&objective, DVector::from_vec(vec![1.0, 1.0]), true).unwrap();
        let ascent = DVector::from_vec(vec![1.0, 0.0]);

        for kind in [
            LineSearchType::Backtracking,
            LineSearchType::Wolfe,
            LineSearchType::MoreThuente,
        ] {
            let mut ls = LineSearchMethod::new(kind);
            assert_eq!(ls.kind(), kind);
            let err = ls
                .search(&objective, &start, &ascent, 1.0, &LineSearchParams::default())
                .unwrap_err();
            assert!(matches!(err, SolverError::InvalidSearchDirection { .. }));
        }
    }

    #[test]
    fn test_non_finite_direction_is_a_failed_search() {
        let objective = QuadraticObjective::<f64>::simple(2);
        let start =
            EvaluationPoint::evaluate(&objective, DVector::from_vec(vec![1.0, 1.0]), true).unwrap();
        let direction = DVector::from_vec(vec![f64::NAN, -1.0]);

        for kind in [
            LineSearchType::Backtracking,
            LineSearchType::Wolfe,
            LineSearchType::MoreThuente,
        ] {
            let result = LineSearchMethod::new(kind)
                .search(&objective, &start, &direction, 1.0, &LineSearchParams::default())
                .unwrap();
            assert!(!result.success);
            assert_eq!(result.function_evaluations, 0);
        }
    }

    #[test]
    fn test_search_requires_gradient_at_start() {
        let objective = QuadraticObjective::<f64>::simple(1);
        let start =
            EvaluationPoint::evaluate(&objective, DVector::from_vec(vec![1.0]), false).unwrap();
        let err = LineSearchMethod::new(LineSearchType::Wolfe)
            .search(
                &objective,
                &start,
                &DVector::from_vec(vec![-1.0]),
                1.0,
                &LineSearchParams::default(),
            )
            .unwrap_err();
        assert!(matches!(err, SolverError::Evaluation(_)));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(LineSearchType::Wolfe.to_string(), "WOLFE");
        assert_eq!(LineSearchType::MoreThuente.to_string(), "MORE_THUENTE");
        assert_eq!(LineSearchType::default(), LineSearchType::Wolfe);
        assert_eq!(
            LineSearchInterpolation::default(),
            LineSearchInterpolation::Cubic
        );
    }
}
