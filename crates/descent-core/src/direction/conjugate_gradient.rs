//! Nonlinear conjugate gradient directions.

use super::{
    steepest_descent, DirectionContext, InitialStepPolicy, NonlinearConjugateGradientType,
    SearchDirection,
};
use crate::core::types::{vector, DVector, Scalar};
use num_traits::Float;
use tracing::trace;

/// Nonlinear conjugate gradient, dₖ = −gₖ + βₖ dₖ₋₁.
///
/// Restarts with steepest descent on the first iteration, every
/// `restart_period` iterations, and whenever β is negative or not finite.
/// Clamping β at zero makes Polak-Ribière and Hestenes-Stiefel the "+"
/// variants.
#[derive(Debug, Clone)]
pub struct NonlinearConjugateGradient {
    kind: NonlinearConjugateGradientType,
    restart_period: usize,
    iterations_since_restart: usize,
}

impl NonlinearConjugateGradient {
    /// Creates a conjugate gradient strategy.
    ///
    /// A `restart_period` of zero disables periodic restarts.
    pub fn new(kind: NonlinearConjugateGradientType, restart_period: usize) -> Self {
        Self {
            kind,
            restart_period,
            iterations_since_restart: 0,
        }
    }

    /// The β formula in use.
    pub fn kind(&self) -> NonlinearConjugateGradientType {
        self.kind
    }

    /// Conjugate steps taken since the last steepest descent step.
    pub fn iterations_since_restart(&self) -> usize {
        self.iterations_since_restart
    }

    fn beta<T: Scalar>(
        &self,
        gradient: &DVector<T>,
        previous_gradient: &DVector<T>,
        previous_direction: &DVector<T>,
    ) -> T {
        let previous_norm_squared = previous_gradient.norm_squared();
        match self.kind {
            NonlinearConjugateGradientType::FletcherReeves => {
                gradient.norm_squared() / previous_norm_squared
            }
            NonlinearConjugateGradientType::PolakRibiere => {
                (gradient.norm_squared() - gradient.dot(previous_gradient)) / previous_norm_squared
            }
            NonlinearConjugateGradientType::HestenesStiefel => {
                let change = gradient - previous_gradient;
                gradient.dot(&change) / previous_direction.dot(&change)
            }
        }
    }

    fn restart<T: Scalar>(&mut self, gradient: &DVector<T>, direction: &mut DVector<T>) {
        self.iterations_since_restart = 0;
        steepest_descent(gradient, direction);
    }
}

impl<T: Scalar> SearchDirection<T> for NonlinearConjugateGradient {
    fn compute(&mut self, context: &DirectionContext<'_, T>, direction: &mut DVector<T>) -> bool {
        let (previous_gradient, previous_direction) =
            match (context.previous_gradient, context.previous_direction) {
                (Some(g), Some(d)) => (g, d),
                _ => {
                    self.restart(context.gradient, direction);
                    return true;
                }
            };

        if self.restart_period > 0 && self.iterations_since_restart + 1 >= self.restart_period {
            trace!(period = self.restart_period, "periodic conjugate gradient restart");
            self.restart(context.gradient, direction);
            return true;
        }

        let beta = self.beta(context.gradient, previous_gradient, previous_direction);
        if !Float::is_finite(beta) || beta <= T::zero() {
            trace!(beta = beta.to_f64(), "conjugate gradient restart on β");
            self.restart(context.gradient, direction);
            return true;
        }

        steepest_descent(context.gradient, direction);
        direction.axpy(beta, previous_direction, T::one());
        self.iterations_since_restart += 1;
        vector::is_finite(direction)
    }

    fn reset(&mut self) {
        self.iterations_since_restart = 0;
    }

    fn on_steepest_descent_substitution(&mut self) {
        self.iterations_since_restart = 0;
    }

    fn initial_step_policy(&self) -> InitialStepPolicy {
        InitialStepPolicy::PreviousStep
    }

    fn name(&self) -> &'static str {
        match self.kind {
            NonlinearConjugateGradientType::FletcherReeves => "FletcherReeves",
            NonlinearConjugateGradientType::PolakRibiere => "PolakRibiere",
            NonlinearConjugateGradientType::HestenesStiefel => "HestenesStiefel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vec2(a: f64, b: f64) -> DVector<f64> {
        DVector::from_vec(vec![a, b])
    }

    fn compute(
        cg: &mut NonlinearConjugateGradient,
        g: &DVector<f64>,
        previous_g: &DVector<f64>,
        previous_d: &DVector<f64>,
    ) -> DVector<f64> {
        let context = DirectionContext {
            gradient: g,
            previous_gradient: Some(previous_g),
            previous_direction: Some(previous_d),
        };
        let mut d = DVector::zeros(g.len());
        assert!(cg.compute(&context, &mut d));
        d
    }

    #[test]
    fn test_first_iteration_is_steepest_descent() {
        let mut cg = NonlinearConjugateGradient::new(NonlinearConjugateGradientType::default(), 0);
        let g = vec2(1.0, -3.0);
        let mut d = DVector::zeros(2);
        assert!(cg.compute(&DirectionContext::initial(&g), &mut d));
        assert_eq!(d, vec2(-1.0, 3.0));
    }

    #[test]
    fn test_beta_formulas() {
        let g = vec2(1.0, 1.0);
        let previous_g = vec2(2.0, 0.0);
        let previous_d = vec2(-2.0, 0.0);

        // FR: |g|^2 / |g_prev|^2 = 2 / 4
        let mut fr = NonlinearConjugateGradient::new(NonlinearConjugateGradientType::FletcherReeves, 0);
        let d = compute(&mut fr, &g, &previous_g, &previous_d);
        assert_relative_eq!(d, vec2(-1.0 - 1.0, -1.0), epsilon = 1e-12);

        // PR: g.(g - g_prev) / |g_prev|^2 = (-1 + 1) / 4 = 0 -> restart
        let mut pr = NonlinearConjugateGradient::new(NonlinearConjugateGradientType::PolakRibiere, 0);
        let d = compute(&mut pr, &g, &previous_g, &previous_d);
        assert_eq!(d, -&g);
        assert_eq!(pr.iterations_since_restart(), 0);

        // HS: g.(g - g_prev) / d_prev.(g - g_prev) with g = (1, 2)
        let g = vec2(1.0, 2.0);
        let mut hs =
            NonlinearConjugateGradient::new(NonlinearConjugateGradientType::HestenesStiefel, 0);
        let d = compute(&mut hs, &g, &previous_g, &previous_d);
        // change = (-1, 2): numerator 3, denominator 2
        assert_relative_eq!(d, vec2(-1.0 - 3.0, -2.0), epsilon = 1e-12);
        assert_eq!(hs.iterations_since_restart(), 1);
    }

    #[test]
    fn test_negative_beta_restarts() {
        let mut pr = NonlinearConjugateGradient::new(NonlinearConjugateGradientType::PolakRibiere, 0);
        // g.(g - g_prev) = 1 * (1 - 3) < 0
        let g = vec2(1.0, 0.0);
        let d = compute(&mut pr, &g, &vec2(3.0, 0.0), &vec2(-3.0, 0.0));
        assert_eq!(d, vec2(-1.0, 0.0));
    }

    #[test]
    fn test_periodic_restart() {
        let mut fr = NonlinearConjugateGradient::new(NonlinearConjugateGradientType::FletcherReeves, 3);
        let g = vec2(1.0, 1.0);
        let previous_g = vec2(1.0, 0.0);
        let previous_d = vec2(0.0, -1.0);

        let first = compute(&mut fr, &g, &previous_g, &previous_d);
        assert_ne!(first, -&g);
        let second = compute(&mut fr, &g, &previous_g, &previous_d);
        assert_ne!(second, -&g);
        assert_eq!(fr.iterations_since_restart(), 2);

        let third = compute(&mut fr, &g, &previous_g, &previous_d);
        assert_eq!(third, -&g);
        assert_eq!(fr.iterations_since_restart(), 0);
    }

    #[test]
    fn test_substituted_step_restarts_the_schedule() {
        let mut fr = NonlinearConjugateGradient::new(NonlinearConjugateGradientType::FletcherReeves, 3);
        let g = vec2(1.0, 1.0);
        let previous_g = vec2(1.0, 0.0);
        let previous_d = vec2(0.0, -1.0);

        compute(&mut fr, &g, &previous_g, &previous_d);
        assert_eq!(fr.iterations_since_restart(), 1);
        // The minimizer discarded that direction and stepped along -g.
        SearchDirection::<f64>::on_steepest_descent_substitution(&mut fr);
        assert_eq!(fr.iterations_since_restart(), 0);

        // A full period of conjugate steps follows before the next restart.
        assert_ne!(compute(&mut fr, &g, &previous_g, &previous_d), -&g);
        assert_ne!(compute(&mut fr, &g, &previous_g, &previous_d), -&g);
        assert_eq!(compute(&mut fr, &g, &previous_g, &previous_d), -&g);
    }
}
