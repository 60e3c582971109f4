//! Result reporting: termination type, per-iteration trace and the final
//! summary.

use descent_core::{
    direction::LineSearchDirectionType, line_search::LineSearchType, types::Scalar,
};
use num_traits::Float;
use std::fmt::{self, Write};

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationType {
    /// A convergence test was satisfied
    Convergence,
    /// Iteration budget exhausted or no acceptable step could be found
    NoConvergence,
    /// Invalid input or a numerical failure
    Failure,
    /// A callback asked to stop and accept the current point
    UserSuccess,
    /// The objective failed at the start, or a callback aborted
    UserFailure,
}

impl TerminationType {
    /// True for the outcomes whose final point may be used.
    pub fn is_solution_usable(self) -> bool {
        matches!(
            self,
            Self::Convergence | Self::NoConvergence | Self::UserSuccess
        )
    }
}

impl fmt::Display for TerminationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Convergence => "CONVERGENCE",
            Self::NoConvergence => "NO_CONVERGENCE",
            Self::Failure => "FAILURE",
            Self::UserSuccess => "USER_SUCCESS",
            Self::UserFailure => "USER_FAILURE",
        })
    }
}

/// One row of the iteration trace.
///
/// Iteration 0 describes the starting point and has no step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationSummary<T: Scalar> {
    /// Iteration number
    pub iteration: usize,
    /// Cost after the step
    pub cost: T,
    /// Cost before the step minus cost after it
    pub cost_change: T,
    /// ‖g‖∞ after the step
    pub gradient_max_norm: T,
    /// ‖g‖₂ after the step
    pub gradient_norm: T,
    /// ‖Δx‖₂
    pub step_norm: T,
    /// Accepted line search step α
    pub step_size: T,
    /// d·g at the start of the line search
    pub directional_derivative: T,
    /// Objective calls made by the line search
    pub line_search_function_evaluations: usize,
    /// Objective calls with gradient made by the line search
    pub line_search_gradient_evaluations: usize,
    /// Trial steps taken by the line search
    pub line_search_iterations: usize,
    /// Whether the step was accepted
    pub step_is_successful: bool,
}

impl<T: Scalar> IterationSummary<T> {
    /// Trace row for the starting point.
    pub fn initial(cost: T, gradient_max_norm: T, gradient_norm: T) -> Self {
        Self {
            iteration: 0,
            cost,
            cost_change: T::zero(),
            gradient_max_norm,
            gradient_norm,
            step_norm: T::zero(),
            step_size: T::zero(),
            directional_derivative: T::zero(),
            line_search_function_evaluations: 0,
            line_search_gradient_evaluations: 0,
            line_search_iterations: 0,
            step_is_successful: false,
        }
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary<T: Scalar> {
    /// How the solve ended
    pub termination_type: TerminationType,
    /// Human-readable reason for termination
    pub message: String,
    /// Cost at the starting point, NaN if it was never evaluated
    pub initial_cost: T,
    /// Cost at the returned point, NaN if nothing was evaluated
    pub final_cost: T,
    /// Number of accepted steps
    pub iteration_count: usize,
    /// Problem dimension
    pub num_parameters: usize,
    /// Objective calls
    pub num_cost_evaluations: usize,
    /// Objective calls that produced a gradient
    pub num_gradient_evaluations: usize,
    /// Direction strategy used
    pub line_search_direction_type: LineSearchDirectionType,
    /// Line search used
    pub line_search_type: LineSearchType,
    /// Per-iteration trace, starting with iteration 0
    pub iterations: Vec<IterationSummary<T>>,
}

impl<T: Scalar> Summary<T> {
    /// An empty summary: failure, NaN costs, no iterations.
    pub fn new(
        line_search_direction_type: LineSearchDirectionType,
        line_search_type: LineSearchType,
    ) -> Self {
        Self {
            termination_type: TerminationType::Failure,
            message: "Solver not run.".to_string(),
            initial_cost: <T as Float>::nan(),
            final_cost: <T as Float>::nan(),
            iteration_count: 0,
            num_parameters: 0,
            num_cost_evaluations: 0,
            num_gradient_evaluations: 0,
            line_search_direction_type,
            line_search_type,
            iterations: Vec::new(),
        }
    }

    /// Whether the final point may be used.
    pub fn is_solution_usable(&self) -> bool {
        self.termination_type.is_solution_usable()
    }

    /// One-line report.
    pub fn brief_report(&self) -> String {
        format!(
            "Solver Summary: Parameters {}, Initial cost: {:e}, Final cost: {:e}, Iterations: {}, Termination: {}",
            self.num_parameters,
            self.initial_cost.to_f64(),
            self.final_cost.to_f64(),
            self.iteration_count,
            self.termination_type,
        )
    }

    /// Multi-line report with configuration, costs, evaluations and the
    /// iteration trace.
    pub fn full_report(&self) -> String {
        let mut report = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_full_report(&mut report);
        report
    }

    fn write_full_report(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "Solver Summary")?;
        writeln!(out)?;
        writeln!(out, "{:<28}{}", "Parameters", self.num_parameters)?;
        writeln!(out, "{:<28}{}", "Line search direction", self.line_search_direction_type)?;
        writeln!(out, "{:<28}{}", "Line search type", self.line_search_type)?;
        writeln!(out)?;
        writeln!(out, "Cost:")?;
        writeln!(out, "{:<28}{:e}", "Initial", self.initial_cost.to_f64())?;
        writeln!(out, "{:<28}{:e}", "Final", self.final_cost.to_f64())?;
        writeln!(
            out,
            "{:<28}{:e}",
            "Change",
            (self.initial_cost - self.final_cost).to_f64()
        )?;
        writeln!(out)?;
        writeln!(out, "{:<28}{}", "Minimizer iterations", self.iteration_count)?;
        writeln!(out, "{:<28}{}", "Cost evaluations", self.num_cost_evaluations)?;
        writeln!(out, "{:<28}{}", "Gradient evaluations", self.num_gradient_evaluations)?;

        if !self.iterations.is_empty() {
            writeln!(out)?;
            writeln!(
                out,
                "{:>4} {:>14} {:>11} {:>11} {:>11} {:>11} {:>5}",
                "iter", "cost", "cost_change", "|gradient|", "|step|", "step_size", "ls_it"
            )?;
            for row in &self.iterations {
                writeln!(
                    out,
                    "{:>4} {:>14.6e} {:>11.2e} {:>11.2e} {:>11.2e} {:>11.2e} {:>5}",
                    row.iteration,
                    row.cost.to_f64(),
                    row.cost_change.to_f64(),
                    row.gradient_max_norm.to_f64(),
                    row.step_norm.to_f64(),
                    row.step_size.to_f64(),
                    row.line_search_iterations,
                )?;
            }
        }

        writeln!(out)?;
        writeln!(out, "Termination: {} ({})", self.termination_type, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_termination_type_display() {
        assert_eq!(TerminationType::Convergence.to_string(), "CONVERGENCE");
        assert_eq!(TerminationType::NoConvergence.to_string(), "NO_CONVERGENCE");
        assert_eq!(TerminationType::Failure.to_string(), "FAILURE");
        assert_eq!(TerminationType::UserSuccess.to_string(), "USER_SUCCESS");
        assert_eq!(TerminationType::UserFailure.to_string(), "USER_FAILURE");
    }

    #[test]
    fn test_usable_solutions() {
        assert!(TerminationType::Convergence.is_solution_usable());
        assert!(TerminationType::NoConvergence.is_solution_usable());
        assert!(TerminationType::UserSuccess.is_solution_usable());
        assert!(!TerminationType::Failure.is_solution_usable());
        assert!(!TerminationType::UserFailure.is_solution_usable());
    }

    #[test]
    fn test_new_summary_is_empty() {
        let summary =
            Summary::<f64>::new(LineSearchDirectionType::Lbfgs, LineSearchType::Wolfe);
        assert_eq!(summary.termination_type, TerminationType::Failure);
        assert!(summary.initial_cost.is_nan());
        assert!(summary.final_cost.is_nan());
        assert!(summary.iterations.is_empty());
    }

    #[test]
    fn test_reports() {
        let mut summary =
            Summary::<f64>::new(LineSearchDirectionType::Lbfgs, LineSearchType::Wolfe);
        summary.termination_type = TerminationType::Convergence;
        summary.message = "Gradient tolerance reached.".to_string();
        summary.num_parameters = 2;
        summary.initial_cost = 4.0;
        summary.final_cost = 0.0;
        summary.iteration_count = 1;
        summary.iterations.push(IterationSummary::initial(4.0, 4.0, 4.0));

        let brief = summary.brief_report();
        assert!(brief.contains("Iterations: 1"));
        assert!(brief.ends_with("Termination: CONVERGENCE"));

        let full = summary.full_report();
        assert!(full.contains("LBFGS"));
        assert!(full.contains("WOLFE"));
        assert!(full.contains("Termination: CONVERGENCE (Gradient tolerance reached.)"));
    }
}
