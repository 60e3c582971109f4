//! Armijo backtracking.

use super::{
    function::{FunctionSample, LineSearchFunction},
    interpolation::{cubic_minimizer_from_values, quadratic_minimizer, safeguard},
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

/// Shrinks the step until the sufficient decrease condition holds.
///
/// Trial steps are evaluated without gradients; the gradient is computed once
/// at the accepted step. There is no curvature check, so this is the cheapest
/// search but gives quasi-Newton updates no guarantee that sᵀy > 0.
#[derive(Debug, Clone, Default)]
pub struct BacktrackingLineSearch;

impl BacktrackingLineSearch {
    /// Creates a new backtracking line search.
    pub fn new() -> Self {
        Self
    }

    fn next_step<T: Scalar>(
        origin: &FunctionSample<T>,
        current: &FunctionSample<T>,
        previous: Option<&FunctionSample<T>>,
        params: &LineSearchParams<T>,
    ) -> T {
        let step = current.step;
        let bisection = step * params.rho;
        if !current.value_is_valid {
            return bisection;
        }

        let quadratic = || {
            quadratic_minimizer(
                origin.step,
                origin.value,
                origin.derivative,
                step,
                current.value,
            )
        };
        let candidate = match params.interpolation {
            LineSearchInterpolation::Bisection => return bisection,
            LineSearchInterpolation::Quadratic => quadratic(),
            LineSearchInterpolation::Cubic => previous
                .and_then(|p| {
                    cubic_minimizer_from_values(
                        origin.value,
                        origin.derivative,
                        p.step,
                        p.value,
                        step,
                        current.value,
                    )
                })
                .or_else(quadratic),
        };

        safeguard(
            candidate,
            params.max_step_contraction * step,
            params.min_step_contraction * step,
            bisection,
        )
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingLineSearch {
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

        let origin = FunctionSample::origin(start.cost, directional_derivative);
        let mut phi = LineSearchFunction::new(objective, &start.parameters, direction);
        let decrease_slope = params.c1 * directional_derivative;

        let mut previous: Option<FunctionSample<T>> = None;
        let mut current = phi.evaluate(Float::min(initial_step, params.max_step_size), false);
        let mut iterations = 1;

        loop {
            if current.value_is_valid
                && current.value <= origin.value + current.step * decrease_slope
            {
                match phi.accept(&current) {
                    Some(point) => {
                        return Ok(LineSearchResult::accepted(
                            &phi,
                            current.step,
                            point,
                            iterations,
                        ))
                    }
                    // Gradient unavailable at this step: shrink past it.
                    None => current.value_is_valid = false,
                }
            }

            if iterations >= params.max_iterations {
                debug!(
                    iterations,
                    step = current.step.to_f64(),
                    "backtracking exhausted its trial budget"
                );
                return Ok(LineSearchResult::failed(
                    &phi,
                    current.step,
                    iterations,
                    format!(
                        "no step satisfying sufficient decrease within {} trials",
                        params.max_iterations
                    ),
                ));
            }

            let next = Self::next_step(&origin, &current, previous.as_ref(), params);
            if !(next >= params.min_step_size) {
                return Ok(LineSearchResult::failed(
                    &phi,
                    current.step,
                    iterations,
                    format!(
                        "step size {:e} fell below the minimum {:e}",
                        next.to_f64(),
                        params.min_step_size.to_f64()
                    ),
                ));
            }

            if current.value_is_valid {
                previous = Some(current);
            }
            current = phi.evaluate(next, false);
            iterations += 1;
        }
    }

    fn name(&self) -> &'static str {
        "Backtracking"
    }
}
