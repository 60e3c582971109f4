//! Strong Wolfe line search (bracketing and zoom).
//!
//! Follows Algorithms 3.5 and 3.6 of Nocedal & Wright, Numerical
//! Optimization. The bracketing phase grows the step until an interval
//! containing an acceptable step is known; the zoom phase shrinks that
//! interval by safeguarded interpolation.

use super::{
    function::{FunctionSample, LineSearchFunction},
    interpolation::{cubic_minimizer, quadratic_minimizer, safeguard},
    preflight, LineSearch, LineSearchInterpolation, LineSearchParams, LineSearchResult,
};
use crate::core::{
    error::SolverResult,
    evaluation::EvaluationPoint,
    objective::ObjectiveFunction,
    types::{DVector, Scalar},
};
use num_traits::Float;
use tracing::debug;

/// Line search enforcing the strong Wolfe conditions.
///
/// If the trial budget runs out or the bracket collapses, the best trial that
/// satisfies sufficient decrease is returned instead, with a message noting
/// that the curvature condition does not hold.
#[derive(Debug, Clone, Default)]
pub struct StrongWolfeLineSearch;

/// Acceptance thresholds for one search.
struct Conditions<T: Scalar> {
    origin: FunctionSample<T>,
    decrease_slope: T,
    curvature_bound: T,
}

impl<T: Scalar> Conditions<T> {
    fn sufficient_decrease(&self, sample: &FunctionSample<T>) -> bool {
        sample.value_is_valid
            && sample.value <= self.origin.value + sample.step * self.decrease_slope
    }

    fn curvature(&self, sample: &FunctionSample<T>) -> bool {
        sample.derivative_is_valid && Float::abs(sample.derivative) <= self.curvature_bound
    }
}

impl StrongWolfeLineSearch {
    /// Creates a new strong Wolfe line search.
    pub fn new() -> Self {
        Self
    }

    fn expand<T: Scalar>(
        previous: &FunctionSample<T>,
        current: &FunctionSample<T>,
        params: &LineSearchParams<T>,
    ) -> T {
        let step = current.step;
        let lower = <T as Scalar>::from_f64(2.0) * step;
        let upper = params.max_step_expansion * step;
        let candidate = match params.interpolation {
            LineSearchInterpolation::Bisection => None,
            _ => cubic_minimizer(
                previous.step,
                previous.value,
                previous.derivative,
                step,
                current.value,
                current.derivative,
            ),
        };
        Float::min(
            safeguard(candidate, lower, Float::max(lower, upper), lower),
            params.max_step_size,
        )
    }

    fn interpolate<T: Scalar>(
        lo: &FunctionSample<T>,
        hi: &FunctionSample<T>,
        params: &LineSearchParams<T>,
    ) -> T {
        let quadratic = || {
            if hi.value_is_valid {
                quadratic_minimizer(lo.step, lo.value, lo.derivative, hi.step, hi.value)
            } else {
                None
            }
        };
        let candidate = match params.interpolation {
            LineSearchInterpolation::Bisection => None,
            LineSearchInterpolation::Quadratic => quadratic(),
            LineSearchInterpolation::Cubic => {
                if hi.is_valid() {
                    cubic_minimizer(
                        lo.step,
                        lo.value,
                        lo.derivative,
                        hi.step,
                        hi.value,
                        hi.derivative,
                    )
                    .or_else(quadratic)
                } else {
                    quadratic()
                }
            }
        };

        let (left, right) = if lo.step < hi.step {
            (lo.step, hi.step)
        } else {
            (hi.step, lo.step)
        };
        // Keep trials away from the bracket ends so the interval shrinks.
        let margin = <T as Scalar>::from_f64(0.1) * (right - left);
        let midpoint = left + <T as Scalar>::from_f64(0.5) * (right - left);
        safeguard(candidate, left + margin, right - margin, midpoint)
    }

    /// Accepts `lo` when it improved on the origin, fails otherwise.
    fn fall_back<T, F>(
        phi: &mut LineSearchFunction<'_, T, F>,
        lo: &FunctionSample<T>,
        iterations: usize,
        reason: &str,
    ) -> LineSearchResult<T>
    where
        T: Scalar,
        F: ObjectiveFunction<T> + ?Sized,
    {
        if lo.step > T::zero() {
            if let Some(point) = phi.accept(lo) {
                debug!(
                    step = lo.step.to_f64(),
                    reason, "strong Wolfe search fell back to a sufficient decrease step"
                );
                let mut result = LineSearchResult::accepted(phi, lo.step, point, iterations);
                result.message = format!("{reason}; curvature condition not satisfied");
                return result;
            }
        }
        debug!(iterations, reason, "strong Wolfe search failed");
        LineSearchResult::failed(phi, lo.step, iterations, reason)
    }
}

impl<T: Scalar> LineSearch<T> for StrongWolfeLineSearch {
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
        if let Some(rejected) = preflight(
            start,
            direction,
            directional_derivative,
            initial_step,
            params,
        )? {
            return Ok(rejected);
        }

        let conditions = Conditions {
            origin: FunctionSample::origin(start.cost, directional_derivative),
            decrease_slope: params.c1 * directional_derivative,
            curvature_bound: -params.c2 * directional_derivative,
        };
        let mut phi = LineSearchFunction::new(objective, &start.parameters, direction);

        // Bracketing phase.
        let mut previous = conditions.origin;
        let mut step = Float::min(initial_step, params.max_step_size);
        let mut iterations = 0;
        let (mut lo, mut hi) = loop {
            if iterations >= params.max_iterations {
                return Ok(Self::fall_back(
                    &mut phi,
                    &previous,
                    iterations,
                    "bracketing phase exhausted the trial budget",
                ));
            }

            let current = phi.evaluate(step, true);
            iterations += 1;

            if !current.is_valid()
                || !conditions.sufficient_decrease(&current)
                || (iterations > 1 && current.value >= previous.value)
            {
                break (previous, current);
            }
            if conditions.curvature(&current) {
                if let Some(point) = phi.accept(&current) {
                    return Ok(LineSearchResult::accepted(&phi, step, point, iterations));
                }
            }
            if current.derivative >= T::zero() {
                break (current, previous);
            }
            if step >= params.max_step_size {
                return Ok(Self::fall_back(
                    &mut phi,
                    &current,
                    iterations,
                    "step reached the maximum step size",
                ));
            }

            step = Self::expand(&previous, &current, params);
            previous = current;
        };

        // Zoom phase: lo satisfies sufficient decrease and has the lowest
        // value seen; the interval between lo and hi contains a Wolfe step.
        loop {
            let width = Float::abs(hi.step - lo.step);
            let scale = Float::max(lo.step, hi.step);
            if width <= params.bracket_tolerance * scale || width < params.min_step_size {
                return Ok(Self::fall_back(
                    &mut phi,
                    &lo,
                    iterations,
                    "bracket collapsed",
                ));
            }
            if iterations >= params.max_iterations {
                return Ok(Self::fall_back(
                    &mut phi,
                    &lo,
                    iterations,
                    "zoom phase exhausted the trial budget",
                ));
            }

            let trial = phi.evaluate(Self::interpolate(&lo, &hi, params), true);
            iterations += 1;

            if !trial.is_valid() || !conditions.sufficient_decrease(&trial) || trial.value >= lo.value
            {
                hi = trial;
                continue;
            }
            if conditions.curvature(&trial) {
                if let Some(point) = phi.accept(&trial) {
                    return Ok(LineSearchResult::accepted(&phi, trial.step, point, iterations));
                }
            }
            if trial.derivative * (hi.step - lo.step) >= T::zero() {
                hi = lo;
            }
            lo = trial;
        }
    }

    fn name(&self) -> &'static str {
        "StrongWolfe"
    }
}
