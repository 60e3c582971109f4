//! The line search minimizer loop.
//!
//! Each iteration checks convergence and the iteration budget, computes a
//! search direction, runs a line search along it and accepts the new point:
//!
//! ```text
//! INITIALIZED ──evaluate x₀──▶ ITERATING ──converged──▶ CONVERGED
//!      │                        │    ▲
//!      │                        └────┘ accepted step
//!      └──────── failure ──────▶ FAILED ◀── budget, line search, callback
//! ```
//!
//! Directions that are not descent directions are replaced by steepest
//! descent for that iteration only. A failed line search is retried once
//! along steepest descent, with the strategy history cleared, before the
//! solve gives up.

use crate::{
    callback::{CallbackReturnType, IterationCallback},
    options::SolverOptions,
    summary::{IterationSummary, Summary, TerminationType},
};
use descent_core::{
    convergence::{ConvergenceChecker, StoppingCriterion},
    direction::{
        is_descent_direction, steepest_descent, DirectionContext, InitialStepPolicy,
        LineSearchDirectionType, SearchDirection, SearchDirectionMethod,
    },
    evaluation::EvaluationPoint,
    line_search::{LineSearch, LineSearchMethod, LineSearchParams, LineSearchResult},
    objective::{CountingObjective, ObjectiveFunction},
    types::{DVector, Scalar},
};
use num_traits::Float;
use tracing::{debug, info, warn};

/// Lifecycle of one minimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizerState {
    /// Created, nothing evaluated yet
    Initialized,
    /// Taking steps
    Iterating,
    /// A convergence test or a callback ended the solve successfully
    Converged,
    /// The solve ended without meeting a convergence test
    Failed,
}

/// Accepted step sizes and slopes, for choosing the next initial step.
#[derive(Debug, Clone, Copy)]
struct PreviousStep<T: Scalar> {
    step_size: T,
    directional_derivative: T,
}

/// Line search minimizer for smooth unconstrained problems.
#[derive(Debug, Clone)]
pub struct LineSearchMinimizer<T: Scalar> {
    options: SolverOptions<T>,
    criterion: StoppingCriterion<T>,
    params: LineSearchParams<T>,
    line_search: LineSearchMethod,
    state: MinimizerState,
}

/// Outcome of the line search phase of one iteration.
struct StepOutcome<T: Scalar> {
    result: LineSearchResult<T>,
    directional_derivative: T,
    function_evaluations: usize,
    gradient_evaluations: usize,
    iterations: usize,
}

impl<T: Scalar> LineSearchMinimizer<T> {
    /// Creates a minimizer for the given options.
    pub fn new(options: SolverOptions<T>) -> Self {
        Self {
            criterion: options.stopping_criterion(),
            params: options.line_search_params(),
            line_search: LineSearchMethod::new(options.line_search_type),
            options,
            state: MinimizerState::Initialized,
        }
    }

    /// The options this minimizer runs with.
    pub fn options(&self) -> &SolverOptions<T> {
        &self.options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MinimizerState {
        self.state
    }

    /// Minimizes `objective` starting from `parameters`.
    ///
    /// On CONVERGENCE, NO_CONVERGENCE and USER_SUCCESS the final point is
    /// written back into `parameters`; on FAILURE and USER_FAILURE it is left
    /// untouched.
    pub fn minimize<F>(
        &mut self,
        objective: &F,
        parameters: &mut DVector<T>,
        callbacks: &mut [Box<dyn IterationCallback<T> + '_>],
    ) -> Summary<T>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        self.state = MinimizerState::Initialized;
        let mut summary = Summary::new(self.options.direction_type, self.options.line_search_type);
        let n = objective.num_parameters();
        summary.num_parameters = n;

        if let Err(err) = self.options.validate() {
            warn!(error = %err, "rejecting solver options");
            return self.fail(summary, TerminationType::Failure, err.to_string(), callbacks);
        }
        if parameters.len() != n {
            let message = format!(
                "Parameter vector has length {} but the objective expects {}.",
                parameters.len(),
                n
            );
            return self.fail(summary, TerminationType::Failure, message, callbacks);
        }

        let counting = CountingObjective::new(objective);
        let mut current = match EvaluationPoint::evaluate(&counting, parameters.clone(), true) {
            Ok(point) => point,
            Err(err) => {
                Self::record_counts(&mut summary, &counting);
                let message = format!("Initial cost and gradient evaluation failed: {err}");
                return self.fail(summary, TerminationType::UserFailure, message, callbacks);
            }
        };
        Self::record_counts(&mut summary, &counting);
        summary.initial_cost = current.cost;
        summary.final_cost = current.cost;
        if !current.is_finite() {
            let message = "Initial cost or gradient is not finite.".to_string();
            return self.fail(summary, TerminationType::Failure, message, callbacks);
        }

        let (gradient_max_norm, gradient_norm) = Self::gradient_norms(&current);
        summary
            .iterations
            .push(IterationSummary::initial(current.cost, gradient_max_norm, gradient_norm));

        let mut strategy = SearchDirectionMethod::new(
            self.options.direction_type,
            self.options.nonlinear_conjugate_gradient_type,
            self.options.restart_period(n),
            self.options.memory_size,
        );
        let mut direction = DVector::zeros(n);
        let mut previous_direction: Option<DVector<T>> = None;
        let mut previous: Option<EvaluationPoint<T>> = None;
        let mut previous_step: Option<PreviousStep<T>> = None;
        let mut position_delta = DVector::zeros(n);
        let mut gradient_delta = DVector::zeros(n);
        let mut iteration_count = 0;

        self.state = MinimizerState::Iterating;
        debug!(
            num_parameters = n,
            direction = strategy.name(),
            line_search = LineSearch::<T>::name(&self.line_search),
            cost = current.cost.to_f64(),
            "starting line search minimization"
        );

        let (termination_type, message) = loop {
            if let Some(reason) =
                ConvergenceChecker::check(&self.criterion, &current, previous.as_ref())
            {
                break (TerminationType::Convergence, reason.to_string());
            }
            if self.criterion.budget_exhausted(iteration_count) {
                break (
                    TerminationType::NoConvergence,
                    format!(
                        "Maximum number of iterations reached. Number of iterations: {iteration_count}."
                    ),
                );
            }

            let mut outcome = {
                let gradient = match current.gradient.as_ref() {
                    Some(gradient) => gradient,
                    None => {
                        break (
                            TerminationType::Failure,
                            "Gradient missing at the current point.".to_string(),
                        )
                    }
                };
                let context = DirectionContext {
                    gradient,
                    previous_gradient: previous.as_ref().and_then(|p| p.gradient.as_ref()),
                    previous_direction: previous_direction.as_ref(),
                };

                let mut policy = strategy.initial_step_policy();
                let mut is_steepest_descent =
                    strategy.kind() == LineSearchDirectionType::SteepestDescent;
                if !strategy.compute(&context, &mut direction)
                    || !is_descent_direction(&direction, gradient)
                {
                    warn!(
                        iteration = iteration_count + 1,
                        direction = strategy.name(),
                        "search direction is not a descent direction, using steepest descent"
                    );
                    strategy.on_steepest_descent_substitution();
                    steepest_descent(gradient, &mut direction);
                    policy = InitialStepPolicy::PreviousStep;
                    is_steepest_descent = true;
                }

                let mut outcome =
                    self.search(&counting, &current, &direction, policy, previous_step);
                if !outcome.result.success
                    && self.options.retry_with_steepest_descent
                    && !is_steepest_descent
                {
                    warn!(
                        iteration = iteration_count + 1,
                        reason = %outcome.result.message,
                        "line search failed, retrying along steepest descent"
                    );
                    strategy.reset();
                    steepest_descent(gradient, &mut direction);
                    let retry = self.search(
                        &counting,
                        &current,
                        &direction,
                        InitialStepPolicy::PreviousStep,
                        previous_step,
                    );
                    outcome = StepOutcome {
                        function_evaluations: outcome.function_evaluations
                            + retry.function_evaluations,
                        gradient_evaluations: outcome.gradient_evaluations
                            + retry.gradient_evaluations,
                        iterations: outcome.iterations + retry.iterations,
                        ..retry
                    };
                }
                outcome
            };

            let next = match outcome.result.evaluation.take() {
                Some(point) if outcome.result.success => point,
                _ => {
                    let (gradient_max_norm, gradient_norm) = Self::gradient_norms(&current);
                    summary.iterations.push(IterationSummary {
                        iteration: iteration_count + 1,
                        step_size: outcome.result.step_size,
                        directional_derivative: outcome.directional_derivative,
                        line_search_function_evaluations: outcome.function_evaluations,
                        line_search_gradient_evaluations: outcome.gradient_evaluations,
                        line_search_iterations: outcome.iterations,
                        ..IterationSummary::initial(current.cost, gradient_max_norm, gradient_norm)
                    });
                    let error = outcome.result.into_error();
                    break (TerminationType::NoConvergence, error.to_string());
                }
            };

            position_delta.copy_from(&next.parameters);
            position_delta -= &current.parameters;
            if let (Some(new_gradient), Some(old_gradient)) =
                (next.gradient.as_ref(), current.gradient.as_ref())
            {
                gradient_delta.copy_from(new_gradient);
                gradient_delta -= old_gradient;
                strategy.update(&position_delta, &gradient_delta);
            }

            match previous_direction.as_mut() {
                Some(buffer) => buffer.copy_from(&direction),
                None => previous_direction = Some(direction.clone()),
            }
            previous_step = Some(PreviousStep {
                step_size: outcome.result.step_size,
                directional_derivative: outcome.directional_derivative,
            });

            let cost_change = current.cost - next.cost;
            previous = Some(std::mem::replace(&mut current, next));
            iteration_count += 1;

            let (gradient_max_norm, gradient_norm) = Self::gradient_norms(&current);
            let row = IterationSummary {
                iteration: iteration_count,
                cost: current.cost,
                cost_change,
                gradient_max_norm,
                gradient_norm,
                step_norm: position_delta.norm(),
                step_size: outcome.result.step_size,
                directional_derivative: outcome.directional_derivative,
                line_search_function_evaluations: outcome.function_evaluations,
                line_search_gradient_evaluations: outcome.gradient_evaluations,
                line_search_iterations: outcome.iterations,
                step_is_successful: true,
            };
            debug!(
                iteration = row.iteration,
                cost = row.cost.to_f64(),
                cost_change = row.cost_change.to_f64(),
                gradient_max_norm = row.gradient_max_norm.to_f64(),
                step_size = row.step_size.to_f64(),
                line_search_iterations = row.line_search_iterations,
                "accepted step"
            );

            let mut requested = CallbackReturnType::Continue;
            for callback in callbacks.iter_mut() {
                match callback.on_iteration_end(&row, &current.parameters) {
                    CallbackReturnType::Continue => {}
                    other => {
                        requested = other;
                        break;
                    }
                }
            }
            summary.iterations.push(row);

            match requested {
                CallbackReturnType::Continue => {}
                CallbackReturnType::Abort => {
                    break (
                        TerminationType::UserFailure,
                        "User callback returned SOLVER_ABORT.".to_string(),
                    )
                }
                CallbackReturnType::TerminateSuccessfully => {
                    break (
                        TerminationType::UserSuccess,
                        "User callback returned SOLVER_TERMINATE_SUCCESSFULLY.".to_string(),
                    )
                }
            }
        };

        summary.termination_type = termination_type;
        summary.message = message;
        summary.final_cost = current.cost;
        summary.iteration_count = iteration_count;
        Self::record_counts(&mut summary, &counting);
        if summary.is_solution_usable() {
            parameters.copy_from(&current.parameters);
        }
        self.state = match termination_type {
            TerminationType::Convergence | TerminationType::UserSuccess => {
                MinimizerState::Converged
            }
            _ => MinimizerState::Failed,
        };

        info!(
            termination = %summary.termination_type,
            iterations = summary.iteration_count,
            initial_cost = summary.initial_cost.to_f64(),
            final_cost = summary.final_cost.to_f64(),
            "{}",
            summary.message
        );
        Self::notify_end(&summary, callbacks);
        summary
    }

    /// Runs one line search along `direction` from `current`.
    fn search<F>(
        &mut self,
        objective: &F,
        current: &EvaluationPoint<T>,
        direction: &DVector<T>,
        policy: InitialStepPolicy,
        previous_step: Option<PreviousStep<T>>,
    ) -> StepOutcome<T>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let directional_derivative = current
            .directional_derivative(direction)
            .unwrap_or_else(<T as Float>::nan);
        let initial_step = self.initial_step(policy, previous_step, directional_derivative);

        let result = self
            .line_search
            .search_with_deriv(
                objective,
                current,
                direction,
                directional_derivative,
                initial_step,
                &self.params,
            )
            .unwrap_or_else(|err| LineSearchResult {
                success: false,
                step_size: initial_step,
                evaluation: None,
                function_evaluations: 0,
                gradient_evaluations: 0,
                iterations: 0,
                message: err.to_string(),
            });

        debug!(
            line_search = LineSearch::<T>::name(&self.line_search),
            success = result.success,
            initial_step = initial_step.to_f64(),
            step_size = result.step_size.to_f64(),
            iterations = result.iterations,
            message = %result.message,
            "line search finished"
        );

        StepOutcome {
            directional_derivative,
            function_evaluations: result.function_evaluations,
            gradient_evaluations: result.gradient_evaluations,
            iterations: result.iterations,
            result,
        }
    }

    /// First trial step for the coming line search.
    ///
    /// The first iteration uses the configured initial step. Afterwards
    /// `Unit` policies try α = 1 and `PreviousStep` policies use
    /// α_{k−1}·φ'_{k−1}(0) / φ'_k(0), falling back to α_{k−1}.
    fn initial_step(
        &self,
        policy: InitialStepPolicy,
        previous_step: Option<PreviousStep<T>>,
        directional_derivative: T,
    ) -> T {
        let Some(previous) = previous_step else {
            return self.options.initial_step_size;
        };
        match policy {
            InitialStepPolicy::Unit => T::one(),
            InitialStepPolicy::PreviousStep => {
                let scaled =
                    previous.step_size * previous.directional_derivative / directional_derivative;
                if Float::is_finite(scaled) && scaled > T::zero() {
                    Float::min(scaled, self.params.max_step_size)
                } else {
                    previous.step_size
                }
            }
        }
    }

    fn gradient_norms(point: &EvaluationPoint<T>) -> (T, T) {
        (gradient_max_norm_of(point), gradient_norm_of(point))
    }

    fn record_counts<F>(summary: &mut Summary<T>, counting: &CountingObjective<F>) {
        let (cost, gradient) = counting.counts();
        summary.num_cost_evaluations = cost;
        summary.num_gradient_evaluations = gradient;
    }

    fn fail(
        &mut self,
        mut summary: Summary<T>,
        termination_type: TerminationType,
        message: String,
        callbacks: &mut [Box<dyn IterationCallback<T> + '_>],
    ) -> Summary<T> {
        warn!(termination = %termination_type, "{message}");
        summary.termination_type = termination_type;
        summary.message = message;
        self.state = MinimizerState::Failed;
        Self::notify_end(&summary, callbacks);
        summary
    }

    fn notify_end(summary: &Summary<T>, callbacks: &mut [Box<dyn IterationCallback<T> + '_>]) {
        for callback in callbacks.iter_mut() {
            callback.on_optimization_end(summary);
        }
    }
}

fn gradient_max_norm_of<T: Scalar>(point: &EvaluationPoint<T>) -> T {
    point.gradient_max_norm().unwrap_or_else(<T as Float>::nan)
}

fn gradient_norm_of<T: Scalar>(point: &EvaluationPoint<T>) -> T {
    point.gradient_norm().unwrap_or_else(<T as Float>::nan)
}
