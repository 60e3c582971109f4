//! Line search minimization of smooth unconstrained objectives.
//!
//! This crate drives the building blocks of `descent-core`: it validates the
//! configuration, runs the minimizer loop and reports the outcome in a
//! [`Summary`].
//!
//! # Direction strategies
//!
//! - **Steepest descent**: d = −g
//! - **Nonlinear conjugate gradient**: Fletcher–Reeves, Polak–Ribière or
//!   Hestenes–Stiefel β with restarts
//! - **L-BFGS**: two-loop recursion over the last M correction pairs
//!
//! # Examples
//!
//! ```rust
//! use descent_core::prelude::*;
//! use descent_optim::{solve, SolverOptions, TerminationType};
//!
//! // f(x) = (x0 - 1)^2 + 10 (x1 + 2)^2
//! let objective = FnObjective::new(2, |x: &DVector<f64>, gradient| {
//!     if let Some(g) = gradient {
//!         g[0] = 2.0 * (x[0] - 1.0);
//!         g[1] = 20.0 * (x[1] + 2.0);
//!     }
//!     Ok((x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2))
//! });
//!
//! let mut x = DVector::from_vec(vec![0.0, 0.0]);
//! let summary = solve(&SolverOptions::default(), &objective, &mut x);
//! assert_eq!(summary.termination_type, TerminationType::Convergence);
//! assert!((x[0] - 1.0).abs() < 1e-6 && (x[1] + 2.0).abs() < 1e-6);
//! ```

pub mod callback;
pub mod minimizer;
pub mod options;
pub mod solver;
pub mod summary;

pub use callback::{CallbackReturnType, IterationCallback, LoggingCallback};
pub use minimizer::{LineSearchMinimizer, MinimizerState};
pub use options::SolverOptions;
pub use solver::{solve, Solver};
pub use summary::{IterationSummary, Summary, TerminationType};

// Re-export commonly used items from core
pub use descent_core::{
    direction::{LineSearchDirectionType, NonlinearConjugateGradientType},
    line_search::{LineSearchInterpolation, LineSearchType},
};
