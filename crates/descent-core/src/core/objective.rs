//! Objective function interface for the minimizer.
//!
//! An objective maps a parameter vector of fixed length to a scalar cost and,
//! on request, writes its gradient into a caller-provided buffer. Passing no
//! buffer lets cheap cost-only evaluations skip gradient work, which the
//! backtracking line search relies on.
//!
//! Returning an [`EvaluationError`] marks the point as unevaluable. The solver
//! treats this as a recoverable rejection of a trial step, except at the
//! starting point where it ends the solve.

use crate::{
    error::{EvaluationError, Result},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::cell::Cell;
use std::fmt::{self, Debug};

/// Trait for differentiable objective functions.
pub trait ObjectiveFunction<T: Scalar>: Debug {
    /// Dimension of the parameter vector.
    fn num_parameters(&self) -> usize;

    /// Evaluates the cost and, if `gradient` is given, the gradient.
    ///
    /// The gradient buffer has length [`num_parameters`](Self::num_parameters)
    /// and every entry must be written when it is provided. Implementations
    /// must be pure: two calls at the same point return the same values.
    fn evaluate(&self, parameters: &DVector<T>, gradient: Option<&mut DVector<T>>) -> Result<T>;

    /// Evaluates the cost only.
    fn cost(&self, parameters: &DVector<T>) -> Result<T> {
        self.evaluate(parameters, None)
    }

    /// Evaluates the cost and a freshly allocated gradient.
    fn cost_and_gradient(&self, parameters: &DVector<T>) -> Result<(T, DVector<T>)> {
        let mut gradient = DVector::zeros(parameters.len());
        let cost = self.evaluate(parameters, Some(&mut gradient))?;
        Ok((cost, gradient))
    }
}

impl<T, F> ObjectiveFunction<T> for &F
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    fn num_parameters(&self) -> usize {
        (**self).num_parameters()
    }

    fn evaluate(&self, parameters: &DVector<T>, gradient: Option<&mut DVector<T>>) -> Result<T> {
        (**self).evaluate(parameters, gradient)
    }
}

/// Adapter turning a closure into an [`ObjectiveFunction`].
///
/// ```
/// use descent_core::prelude::*;
///
/// let square = FnObjective::new(1, |x: &DVector<f64>, gradient| {
///     if let Some(g) = gradient {
///         g[0] = 2.0 * x[0];
///     }
///     Ok(x[0] * x[0])
/// });
/// assert_eq!(square.cost(&DVector::from_element(1, 3.0)).unwrap(), 9.0);
/// ```
pub struct FnObjective<F> {
    num_parameters: usize,
    function: F,
}

impl<F> FnObjective<F> {
    /// Wraps `function` as an objective over `num_parameters` parameters.
    pub fn new<T>(num_parameters: usize, function: F) -> Self
    where
        T: Scalar,
        F: Fn(&DVector<T>, Option<&mut DVector<T>>) -> Result<T>,
    {
        Self {
            num_parameters,
            function,
        }
    }
}

impl<F> Debug for FnObjective<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObjective")
            .field("num_parameters", &self.num_parameters)
            .finish_non_exhaustive()
    }
}

impl<T, F> ObjectiveFunction<T> for FnObjective<F>
where
    T: Scalar,
    F: Fn(&DVector<T>, Option<&mut DVector<T>>) -> Result<T>,
{
    fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    fn evaluate(&self, parameters: &DVector<T>, gradient: Option<&mut DVector<T>>) -> Result<T> {
        (self.function)(parameters, gradient)
    }
}

/// Quadratic objective f(x) = ½ xᵀAx + bᵀx + c.
///
/// With a symmetric positive definite `a` the unique minimizer is −A⁻¹b.
#[derive(Debug, Clone)]
pub struct QuadraticObjective<T: Scalar> {
    /// The quadratic form matrix (should be symmetric)
    pub a: DMatrix<T>,
    /// The linear term
    pub b: DVector<T>,
    /// The constant term
    pub c: T,
}

impl<T: Scalar> QuadraticObjective<T> {
    /// Creates a new quadratic objective.
    pub fn new(a: DMatrix<T>, b: DVector<T>, c: T) -> Self {
        Self { a, b, c }
    }

    /// Creates f(x) = ½‖x‖².
    pub fn simple(dim: usize) -> Self {
        Self {
            a: DMatrix::identity(dim, dim),
            b: DVector::zeros(dim),
            c: T::zero(),
        }
    }

    /// Creates a diagonal quadratic ½ Σ dᵢ xᵢ², useful for conditioning tests.
    pub fn diagonal(diagonal: &[T]) -> Self {
        let dim = diagonal.len();
        Self {
            a: DMatrix::from_diagonal(&DVector::from_column_slice(diagonal)),
            b: DVector::zeros(dim),
            c: T::zero(),
        }
    }
}

impl<T: Scalar> ObjectiveFunction<T> for QuadraticObjective<T> {
    fn num_parameters(&self) -> usize {
        self.b.len()
    }

    fn evaluate(&self, parameters: &DVector<T>, gradient: Option<&mut DVector<T>>) -> Result<T> {
        if parameters.len() != self.b.len() {
            return Err(EvaluationError::dimension_mismatch(
                self.b.len(),
                parameters.len(),
            ));
        }

        let ax = &self.a * parameters;
        let cost =
            parameters.dot(&ax) * <T as Scalar>::from_f64(0.5) + self.b.dot(parameters) + self.c;
        if let Some(g) = gradient {
            g.copy_from(&ax);
            *g += &self.b;
        }
        Ok(cost)
    }
}

/// Wrapper counting cost and gradient evaluations.
///
/// Every call counts as one cost evaluation; calls that request a gradient
/// also count as one gradient evaluation.
#[derive(Debug)]
pub struct CountingObjective<F> {
    /// The underlying objective
    pub inner: F,
    cost_count: Cell<usize>,
    gradient_count: Cell<usize>,
}

impl<F> CountingObjective<F> {
    /// Creates a new counting wrapper around an objective.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cost_count: Cell::new(0),
            gradient_count: Cell::new(0),
        }
    }

    /// Resets both counters to zero.
    pub fn reset_counts(&self) {
        self.cost_count.set(0);
        self.gradient_count.set(0);
    }

    /// Returns `(cost evaluations, gradient evaluations)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.cost_count.get(), self.gradient_count.get())
    }
}

impl<T, F> ObjectiveFunction<T> for CountingObjective<F>
where
    T: Scalar,
    F: ObjectiveFunction<T>,
{
    fn num_parameters(&self) -> usize {
        self.inner.num_parameters()
    }

    fn evaluate(&self, parameters: &DVector<T>, gradient: Option<&mut DVector<T>>) -> Result<T> {
        self.cost_count.set(self.cost_count.get() + 1);
        if gradient.is_some() {
            self.gradient_count.set(self.gradient_count.get() + 1);
        }
        self.inner.evaluate(parameters, gradient)
    }
}

/// Outcome of a [`GradientChecker`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientCheck<T: Scalar> {
    /// Gradient returned by the objective
    pub analytic: DVector<T>,
    /// Central-difference approximation
    pub numeric: DVector<T>,
    /// Largest relative component error
    pub max_relative_error: T,
    /// Index of the component with the largest error
    pub worst_component: usize,
    /// Whether every component matched within tolerance
    pub passed: bool,
}

/// Compares an objective's gradient against central finite differences.
#[derive(Debug, Clone, Copy)]
pub struct GradientChecker<T: Scalar> {
    /// Relative tolerance per component
    pub relative_tolerance: T,
}

impl<T: Scalar> Default for GradientChecker<T> {
    fn default() -> Self {
        Self {
            relative_tolerance: <T as Scalar>::from_f64(1e-6),
        }
    }
}

impl<T: Scalar> GradientChecker<T> {
    /// Creates a checker with the given relative tolerance.
    pub fn new(relative_tolerance: T) -> Self {
        Self { relative_tolerance }
    }

    /// Checks the gradient of `objective` at `point`.
    pub fn check<F>(&self, objective: &F, point: &DVector<T>) -> Result<GradientCheck<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let n = objective.num_parameters();
        if point.len() != n {
            return Err(EvaluationError::dimension_mismatch(n, point.len()));
        }

        let (_, analytic) = objective.cost_and_gradient(point)?;
        let mut numeric = DVector::zeros(n);
        let mut shifted = point.clone();
        let root_eps = Float::sqrt(T::EPSILON);
        let two = <T as Scalar>::from_f64(2.0);

        for i in 0..n {
            let h = root_eps * Float::max(T::one(), Float::abs(point[i]));
            shifted[i] = point[i] + h;
            let f_plus = objective.cost(&shifted)?;
            shifted[i] = point[i] - h;
            let f_minus = objective.cost(&shifted)?;
            shifted[i] = point[i];
            numeric[i] = (f_plus - f_minus) / (two * h);
        }

        let mut max_relative_error = T::zero();
        let mut worst_component = 0;
        let mut passed = true;
        for i in 0..n {
            let scale = Float::max(
                T::one(),
                Float::max(Float::abs(analytic[i]), Float::abs(numeric[i])),
            );
            let error = Float::abs(analytic[i] - numeric[i]) / scale;
            if error > max_relative_error {
                max_relative_error = error;
                worst_component = i;
            }
            if !approx::relative_eq!(
                analytic[i],
                numeric[i],
                epsilon = self.relative_tolerance,
                max_relative = self.relative_tolerance
            ) {
                passed = false;
            }
        }

        Ok(GradientCheck {
            analytic,
            numeric,
            max_relative_error,
            worst_component,
            passed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Debug)]
    struct Rosenbrock;

    impl ObjectiveFunction<f64> for Rosenbrock {
        fn num_parameters(&self) -> usize {
            2
        }

        fn evaluate(&self, x: &DVector<f64>, gradient: Option<&mut DVector<f64>>) -> Result<f64> {
            let (a, b) = (1.0 - x[0], x[1] - x[0] * x[0]);
            if let Some(g) = gradient {
                g[0] = -2.0 * a - 400.0 * x[0] * b;
                g[1] = 200.0 * b;
            }
            Ok(a * a + 100.0 * b * b)
        }
    }

    #[test]
    fn test_quadratic_simple() {
        let objective = QuadraticObjective::<f64>::simple(3);
        let point = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        let (cost, gradient) = objective.cost_and_gradient(&point).unwrap();
        assert_relative_eq!(cost, 7.0);
        assert_relative_eq!(gradient, point);
    }

    #[test]
    fn test_quadratic_general() {
        // f(x) = x1^2 + x2^2 + x1*x2 + 2*x1 + 3*x2 + 5
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_vec(vec![2.0, 3.0]);
        let objective = QuadraticObjective::new(a, b, 5.0);
        let point = DVector::from_vec(vec![1.0, -1.0]);

        let (cost, gradient) = objective.cost_and_gradient(&point).unwrap();
        assert_relative_eq!(cost, 5.0);
        assert_relative_eq!(gradient[0], 3.0);
        assert_relative_eq!(gradient[1], 2.0);
    }

    #[test]
    fn test_quadratic_rejects_wrong_dimension() {
        let objective = QuadraticObjective::<f64>::simple(3);
        let err = objective.cost(&DVector::zeros(2)).unwrap_err();
        assert!(matches!(err, EvaluationError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_cost_only_leaves_gradient_untouched() {
        let objective = QuadraticObjective::<f64>::diagonal(&[1.0, 4.0]);
        let point = DVector::from_vec(vec![1.0, 1.0]);
        let mut gradient = DVector::from_element(2, -7.0);

        objective.evaluate(&point, None).unwrap();
        assert_eq!(gradient, DVector::from_element(2, -7.0));

        objective.evaluate(&point, Some(&mut gradient)).unwrap();
        assert_relative_eq!(gradient, DVector::from_vec(vec![1.0, 4.0]));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let objective = Rosenbrock;
        let point = DVector::from_vec(vec![-1.2, 1.0]);

        let first = objective.cost_and_gradient(&point).unwrap();
        let second = objective.cost_and_gradient(&point).unwrap();
        assert_eq!(first, second);
        assert_eq!(objective.cost(&point).unwrap(), first.0);
    }

    #[test]
    fn test_counting_objective() {
        let counting = CountingObjective::new(QuadraticObjective::<f64>::simple(2));
        let point = DVector::from_vec(vec![1.0, 1.0]);

        counting.cost(&point).unwrap();
        counting.cost_and_gradient(&point).unwrap();
        assert_eq!(counting.counts(), (2, 1));

        counting.reset_counts();
        assert_eq!(counting.counts(), (0, 0));
    }

    #[test]
    fn test_fn_objective_and_reference_impl() {
        let objective = FnObjective::new(1, |x: &DVector<f64>, g| {
            if x[0] < 0.0 {
                return Err(EvaluationError::invalid_point("negative input"));
            }
            if let Some(g) = g {
                g[0] = 0.5 / x[0].sqrt();
            }
            Ok(x[0].sqrt())
        });

        let by_ref = &objective;
        assert_eq!(by_ref.num_parameters(), 1);
        assert_relative_eq!(by_ref.cost(&DVector::from_element(1, 4.0)).unwrap(), 2.0);
        assert!(by_ref.cost(&DVector::from_element(1, -1.0)).is_err());
        assert!(format!("{objective:?}").contains("FnObjective"));
    }

    #[test]
    fn test_gradient_checker_accepts_correct_gradient() {
        let check = GradientChecker::default()
            .check(&Rosenbrock, &DVector::from_vec(vec![-1.2, 1.0]))
            .unwrap();
        assert!(check.passed, "max error {}", check.max_relative_error);
    }

    #[test]
    fn test_gradient_checker_flags_wrong_gradient() {
        let wrong = FnObjective::new(2, |x: &DVector<f64>, g| {
            if let Some(g) = g {
                g[0] = 2.0 * x[0];
                g[1] = x[1]; // should be 2 * x[1]
            }
            Ok(x.norm_squared())
        });

        let check = GradientChecker::default()
            .check(&wrong, &DVector::from_vec(vec![1.0, 3.0]))
            .unwrap();
        assert!(!check.passed);
        assert_eq!(check.worst_component, 1);
    }
}
