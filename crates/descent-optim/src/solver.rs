//! Solver entry points.

use crate::{
    callback::IterationCallback, minimizer::LineSearchMinimizer, options::SolverOptions,
    summary::Summary,
};
use descent_core::{
    objective::ObjectiveFunction,
    types::{DVector, Scalar},
};
use std::fmt;

/// Minimizes an objective with a fixed set of options and callbacks.
///
/// ```
/// use descent_core::prelude::*;
/// use descent_optim::{Solver, SolverOptions, TerminationType};
///
/// let objective = QuadraticObjective::<f64>::diagonal(&[2.0]);
/// let mut x = DVector::from_element(1, 2.0);
/// let summary = Solver::new(SolverOptions::default()).solve(&objective, &mut x);
/// assert_eq!(summary.termination_type, TerminationType::Convergence);
/// assert_eq!(x[0], 0.0);
/// ```
pub struct Solver<'a, T: Scalar> {
    options: SolverOptions<T>,
    callbacks: Vec<Box<dyn IterationCallback<T> + 'a>>,
}

impl<'a, T: Scalar> Solver<'a, T> {
    /// Creates a solver with the given options.
    pub fn new(options: SolverOptions<T>) -> Self {
        Self {
            options,
            callbacks: Vec::new(),
        }
    }

    /// Adds a callback run after every accepted step.
    pub fn with_callback(mut self, callback: impl IterationCallback<T> + 'a) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// The options this solver runs with.
    pub fn options(&self) -> &SolverOptions<T> {
        &self.options
    }

    /// Minimizes `objective` starting from `parameters`.
    ///
    /// Never fails: invalid options, a dimension mismatch or an objective
    /// failing at the start are reported through the returned [`Summary`].
    pub fn solve<F>(&mut self, objective: &F, parameters: &mut DVector<T>) -> Summary<T>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        LineSearchMinimizer::new(self.options.clone()).minimize(
            objective,
            parameters,
            &mut self.callbacks,
        )
    }
}

impl<T: Scalar> fmt::Debug for Solver<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("options", &self.options)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Minimizes `objective` from `parameters` with `options`.
///
/// Shorthand for `Solver::new(options.clone()).solve(objective, parameters)`.
pub fn solve<T, F>(
    options: &SolverOptions<T>,
    objective: &F,
    parameters: &mut DVector<T>,
) -> Summary<T>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    Solver::new(options.clone()).solve(objective, parameters)
}
