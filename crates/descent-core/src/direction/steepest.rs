//! Steepest descent.

use super::{steepest_descent, DirectionContext, InitialStepPolicy, SearchDirection};
use crate::core::types::{DVector, Scalar};

/// Uses the negative gradient as the search direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteepestDescent;

impl<T: Scalar> SearchDirection<T> for SteepestDescent {
    fn compute(&mut self, context: &DirectionContext<'_, T>, direction: &mut DVector<T>) -> bool {
        steepest_descent(context.gradient, direction);
        true
    }

    fn initial_step_policy(&self) -> InitialStepPolicy {
        InitialStepPolicy::PreviousStep
    }

    fn name(&self) -> &'static str {
        "SteepestDescent"
    }
}
