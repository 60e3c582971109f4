//! Iteration callbacks.
//!
//! Callbacks run after every accepted step and can stop the solve, either
//! accepting the current point or aborting.

use crate::summary::{IterationSummary, Summary};
use descent_core::types::{DVector, Scalar};
use tracing::info;

/// What the minimizer should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackReturnType {
    /// Keep iterating
    #[default]
    Continue,
    /// Stop and report USER_FAILURE
    Abort,
    /// Stop and report USER_SUCCESS
    TerminateSuccessfully,
}

/// Trait for iteration callbacks.
///
/// Any `FnMut(&IterationSummary<T>, &DVector<T>) -> CallbackReturnType`
/// closure is a callback.
pub trait IterationCallback<T: Scalar> {
    /// Called after each accepted step with the trace row and the new
    /// parameters.
    fn on_iteration_end(
        &mut self,
        iteration: &IterationSummary<T>,
        parameters: &DVector<T>,
    ) -> CallbackReturnType;

    /// Called once when the solve has finished.
    fn on_optimization_end(&mut self, summary: &Summary<T>) {
        let _ = summary;
    }
}

impl<T, F> IterationCallback<T> for F
where
    T: Scalar,
    F: FnMut(&IterationSummary<T>, &DVector<T>) -> CallbackReturnType,
{
    fn on_iteration_end(
        &mut self,
        iteration: &IterationSummary<T>,
        parameters: &DVector<T>,
    ) -> CallbackReturnType {
        self(iteration, parameters)
    }
}

/// Logs progress through `tracing` every `log_every` iterations.
#[derive(Debug, Clone)]
pub struct LoggingCallback {
    log_every: usize,
}

impl LoggingCallback {
    /// Create a callback logging every `log_every` iterations.
    pub fn new(log_every: usize) -> Self {
        Self {
            log_every: log_every.max(1),
        }
    }
}

impl Default for LoggingCallback {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T: Scalar> IterationCallback<T> for LoggingCallback {
    fn on_iteration_end(
        &mut self,
        iteration: &IterationSummary<T>,
        _parameters: &DVector<T>,
    ) -> CallbackReturnType {
        if iteration.iteration % self.log_every == 0 {
            info!(
                iteration = iteration.iteration,
                cost = iteration.cost.to_f64(),
                cost_change = iteration.cost_change.to_f64(),
                gradient_max_norm = iteration.gradient_max_norm.to_f64(),
                step_size = iteration.step_size.to_f64(),
                line_search_iterations = iteration.line_search_iterations,
                "iteration"
            );
        }
        CallbackReturnType::Continue
    }

    fn on_optimization_end(&mut self, summary: &Summary<T>) {
        info!(
            termination = %summary.termination_type,
            iterations = summary.iteration_count,
            final_cost = summary.final_cost.to_f64(),
            "{}",
            summary.message
        );
    }
}
