//! Search direction strategies.
//!
//! A strategy turns the current gradient, plus whatever history it keeps,
//! into a direction for the next line search. The minimizer checks every
//! direction with [`is_descent_direction`] and substitutes steepest descent
//! for that iteration when the check fails, without touching the strategy's
//! history.

pub mod conjugate_gradient;
pub mod lbfgs;
pub mod steepest;

pub use conjugate_gradient::NonlinearConjugateGradient;
pub use lbfgs::Lbfgs;
pub use steepest::SteepestDescent;

use crate::core::types::{vector, DVector, Scalar};
use std::fmt::{self, Debug, Display};

/// Which direction strategy the minimizer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineSearchDirectionType {
    /// Negative gradient
    SteepestDescent,
    /// Nonlinear conjugate gradient
    NonlinearConjugateGradient,
    /// Limited-memory BFGS
    #[default]
    Lbfgs,
}

impl Display for LineSearchDirectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SteepestDescent => "STEEPEST_DESCENT",
            Self::NonlinearConjugateGradient => "NONLINEAR_CONJUGATE_GRADIENT",
            Self::Lbfgs => "LBFGS",
        })
    }
}

/// Formula for the conjugate gradient β.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NonlinearConjugateGradientType {
    /// β = gₖᵀgₖ / gₖ₋₁ᵀgₖ₋₁
    FletcherReeves,
    /// β = max(0, gₖᵀ(gₖ − gₖ₋₁) / gₖ₋₁ᵀgₖ₋₁)
    #[default]
    PolakRibiere,
    /// β = max(0, gₖᵀ(gₖ − gₖ₋₁) / dₖ₋₁ᵀ(gₖ − gₖ₋₁))
    HestenesStiefel,
}

impl Display for NonlinearConjugateGradientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FletcherReeves => "FLETCHER_REEVES",
            Self::PolakRibiere => "POLAK_RIBIERE",
            Self::HestenesStiefel => "HESTENES_STIEFEL",
        })
    }
}

/// First trial step a strategy wants after the first iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialStepPolicy {
    /// Always try α = 1 (well scaled quasi-Newton directions)
    Unit,
    /// Reuse the previous accepted step, rescaled by the change in φ'(0)
    PreviousStep,
}

/// Inputs available when computing a direction.
#[derive(Debug, Clone, Copy)]
pub struct DirectionContext<'a, T: Scalar> {
    /// Gradient at the current point
    pub gradient: &'a DVector<T>,
    /// Gradient at the previous accepted point
    pub previous_gradient: Option<&'a DVector<T>>,
    /// Direction used for the previous step
    pub previous_direction: Option<&'a DVector<T>>,
}

impl<'a, T: Scalar> DirectionContext<'a, T> {
    /// Context for the first iteration, with no history.
    pub fn initial(gradient: &'a DVector<T>) -> Self {
        Self {
            gradient,
            previous_gradient: None,
            previous_direction: None,
        }
    }
}

/// Trait for search direction strategies.
pub trait SearchDirection<T: Scalar>: Debug {
    /// Writes the next direction into `direction`.
    ///
    /// Returns `false` when the strategy could not produce a usable
    /// direction; the minimizer then falls back to steepest descent.
    fn compute(&mut self, context: &DirectionContext<'_, T>, direction: &mut DVector<T>) -> bool;

    /// Records an accepted step s = xₖ₊₁ − xₖ with y = gₖ₊₁ − gₖ.
    ///
    /// Returns whether the pair was stored.
    fn update(&mut self, _position_delta: &DVector<T>, _gradient_delta: &DVector<T>) -> bool {
        false
    }

    /// Clears history, as after a line search failure.
    fn reset(&mut self) {}

    /// Called when the minimizer replaced this iteration's direction with
    /// steepest descent. History stays; step counters treat it as a restart.
    fn on_steepest_descent_substitution(&mut self) {}

    /// Initial step the line search should try.
    fn initial_step_policy(&self) -> InitialStepPolicy;

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

/// True when `direction` is finite and `direction · gradient < 0`.
pub fn is_descent_direction<T: Scalar>(direction: &DVector<T>, gradient: &DVector<T>) -> bool {
    direction.len() == gradient.len()
        && vector::is_finite(direction)
        && direction.dot(gradient) < T::zero()
}

/// Writes −gradient into `direction`.
pub fn steepest_descent<T: Scalar>(gradient: &DVector<T>, direction: &mut DVector<T>) {
    direction.copy_from(gradient);
    direction.neg_mut();
}

/// Direction strategy selected at runtime.
#[derive(Debug, Clone)]
pub enum SearchDirectionMethod<T: Scalar> {
    /// Negative gradient
    SteepestDescent(SteepestDescent),
    /// Nonlinear conjugate gradient
    ConjugateGradient(NonlinearConjugateGradient),
    /// Limited-memory BFGS
    Lbfgs(Lbfgs<T>),
}

impl<T: Scalar> SearchDirectionMethod<T> {
    /// Builds the strategy for `kind`.
    ///
    /// `restart_period` only applies to conjugate gradient and
    /// `memory_size` only to L-BFGS.
    pub fn new(
        kind: LineSearchDirectionType,
        conjugate_gradient_type: NonlinearConjugateGradientType,
        restart_period: usize,
        memory_size: usize,
    ) -> Self {
        match kind {
            LineSearchDirectionType::SteepestDescent => Self::SteepestDescent(SteepestDescent),
            LineSearchDirectionType::NonlinearConjugateGradient => Self::ConjugateGradient(
                NonlinearConjugateGradient::new(conjugate_gradient_type, restart_period),
            ),
            LineSearchDirectionType::Lbfgs => Self::Lbfgs(Lbfgs::new(memory_size)),
        }
    }

    /// The type this strategy was built from.
    pub fn kind(&self) -> LineSearchDirectionType {
        match self {
            Self::SteepestDescent(_) => LineSearchDirectionType::SteepestDescent,
            Self::ConjugateGradient(_) => LineSearchDirectionType::NonlinearConjugateGradient,
            Self::Lbfgs(_) => LineSearchDirectionType::Lbfgs,
        }
    }

    fn inner(&self) -> &dyn SearchDirection<T> {
        match self {
            Self::SteepestDescent(d) => d,
            Self::ConjugateGradient(d) => d,
            Self::Lbfgs(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SearchDirection<T> {
        match self {
            Self::SteepestDescent(d) => d,
            Self::ConjugateGradient(d) => d,
            Self::Lbfgs(d) => d,
        }
    }
}

impl<T: Scalar> SearchDirection<T> for SearchDirectionMethod<T> {
    fn compute(&mut self, context: &DirectionContext<'_, T>, direction: &mut DVector<T>) -> bool {
        self.inner_mut().compute(context, direction)
    }

    fn update(&mut self, position_delta: &DVector<T>, gradient_delta: &DVector<T>) -> bool {
        self.inner_mut().update(position_delta, gradient_delta)
    }

    fn on_steepest_descent_substitution(&mut self) {
        self.inner_mut().on_steepest_descent_substitution();
    }

    fn reset(&mut self) {
        self.inner_mut().reset();
    }

    fn initial_step_policy(&self) -> InitialStepPolicy {
        self.inner().initial_step_policy()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descent_check() {
        let g = DVector::from_vec(vec![1.0, -2.0]);
        assert!(is_descent_direction(&DVector::from_vec(vec![-1.0, 0.0]), &g));
        assert!(!is_descent_direction(&DVector::from_vec(vec![1.0, 0.0]), &g));
        assert!(!is_descent_direction(&DVector::from_vec(vec![2.0, 1.0]), &g));
        assert!(!is_descent_direction(&DVector::from_vec(vec![f64::NAN, 1.0]), &g));
        assert!(!is_descent_direction(&DVector::from_vec(vec![-1.0]), &g));
    }

    #[test]
    fn test_method_dispatch() {
        for kind in [
            LineSearchDirectionType::SteepestDescent,
            LineSearchDirectionType::NonlinearConjugateGradient,
            LineSearchDirectionType::Lbfgs,
        ] {
            let mut method = SearchDirectionMethod::<f64>::new(
                kind,
                NonlinearConjugateGradientType::default(),
                10,
                5,
            );
            assert_eq!(method.kind(), kind);

            let g = DVector::from_vec(vec![3.0, -1.0]);
            let mut d = DVector::zeros(2);
            assert!(method.compute(&DirectionContext::initial(&g), &mut d));
            assert_eq!(d, DVector::from_vec(vec![-3.0, 1.0]));
        }
    }

    #[test]
    fn test_initial_step_policies() {
        let policy = |kind| {
            SearchDirectionMethod::<f64>::new(kind, NonlinearConjugateGradientType::default(), 10, 5)
                .initial_step_policy()
        };
        assert_eq!(policy(LineSearchDirectionType::Lbfgs), InitialStepPolicy::Unit);
        assert_eq!(
            policy(LineSearchDirectionType::SteepestDescent),
            InitialStepPolicy::PreviousStep
        );
        assert_eq!(
            policy(LineSearchDirectionType::NonlinearConjugateGradient),
            InitialStepPolicy::PreviousStep
        );
    }
}
