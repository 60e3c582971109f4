//! Core traits and algorithms for gradient-based minimization.
//!
//! This crate provides the building blocks of an unconstrained line search
//! minimizer: the objective contract, evaluation snapshots, line searches,
//! search direction strategies and the convergence tests. The minimizer loop
//! that ties them together lives in `descent-optim`.
//!
//! # Modules
//!
//! - [`core`]: scalar and vector types, errors, objectives and evaluation points
//! - [`line_search`]: backtracking, strong Wolfe and More–Thuente searches
//! - [`direction`]: steepest descent, nonlinear conjugate gradient and L-BFGS
//! - [`convergence`]: gradient, function and parameter tolerance tests

pub mod convergence;
pub mod core;
pub mod direction;
pub mod line_search;

pub use crate::core::{error, evaluation, objective, types};

// Re-export commonly used items at the crate root
pub use crate::core::error::{EvaluationError, Result, SolverError, SolverResult};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use descent_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::convergence::{ConvergenceChecker, ConvergenceReason, StoppingCriterion};
    pub use crate::core::error::{EvaluationError, Result, SolverError, SolverResult};
    pub use crate::core::evaluation::EvaluationPoint;
    pub use crate::core::objective::{
        CountingObjective, FnObjective, GradientCheck, GradientChecker, ObjectiveFunction,
        QuadraticObjective,
    };
    pub use crate::core::types::{DMatrix, DVector, Scalar};
    pub use crate::direction::{
        DirectionContext, InitialStepPolicy, LineSearchDirectionType,
        NonlinearConjugateGradientType, SearchDirection, SearchDirectionMethod,
    };
    pub use crate::line_search::{
        BacktrackingLineSearch, LineSearch, LineSearchInterpolation, LineSearchMethod,
        LineSearchParams, LineSearchResult, LineSearchType, MoreThuenteLineSearch,
        StrongWolfeLineSearch,
    };
}
