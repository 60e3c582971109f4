//! Gradient-based minimization of smooth unconstrained objectives.
//!
//! `descent` bundles the building blocks of [`descent_core`] with the
//! minimizer of [`descent_optim`]. Supply an objective that returns its cost
//! and, on request, its gradient; pick a search direction (steepest descent,
//! nonlinear conjugate gradient or L-BFGS) and a line search (backtracking,
//! strong Wolfe or More–Thuente); read the outcome from the [`Summary`].
//!
//! ```rust
//! use descent::prelude::*;
//!
//! #[derive(Debug)]
//! struct Booth;
//!
//! impl ObjectiveFunction<f64> for Booth {
//!     fn num_parameters(&self) -> usize {
//!         2
//!     }
//!
//!     fn evaluate(&self, x: &DVector<f64>, gradient: Option<&mut DVector<f64>>) -> Result<f64> {
//!         let r1 = x[0] + 2.0 * x[1] - 7.0;
//!         let r2 = 2.0 * x[0] + x[1] - 5.0;
//!         if let Some(g) = gradient {
//!             g[0] = 2.0 * r1 + 4.0 * r2;
//!             g[1] = 4.0 * r1 + 2.0 * r2;
//!         }
//!         Ok(r1 * r1 + r2 * r2)
//!     }
//! }
//!
//! let mut x = DVector::zeros(2);
//! let summary = solve(&SolverOptions::default(), &Booth, &mut x);
//! assert!(summary.is_solution_usable());
//! assert!((x[0] - 1.0).abs() < 1e-5 && (x[1] - 3.0).abs() < 1e-5);
//! ```

pub use descent_core;
pub use descent_optim;
pub use nalgebra;

pub use descent_core::{EvaluationError, SolverError};
pub use descent_optim::{solve, Solver, SolverOptions, Summary, TerminationType};

/// Everything needed to define an objective and run a solve.
pub mod prelude {
    pub use descent_core::prelude::*;
    pub use descent_optim::{
        solve, CallbackReturnType, IterationCallback, IterationSummary, LineSearchMinimizer,
        LoggingCallback, Solver, SolverOptions, Summary, TerminationType,
    };
}
