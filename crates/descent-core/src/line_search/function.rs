//! The objective restricted to a search ray, φ(α) = f(x + α·d).

use crate::core::{
    evaluation::EvaluationPoint,
    objective::ObjectiveFunction,
    types::{vector, DVector, Scalar},
};
use num_traits::Float;
use tracing::trace;

/// One evaluation of φ.
///
/// A sample whose objective call failed, or produced non-finite values, is
/// marked invalid and never accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionSample<T: Scalar> {
    /// Step α
    pub step: T,
    /// φ(α)
    pub value: T,
    /// φ'(α), meaningful only when `derivative_is_valid`
    pub derivative: T,
    /// The objective succeeded with a finite cost
    pub value_is_valid: bool,
    /// A finite gradient was computed
    pub derivative_is_valid: bool,
}

impl<T: Scalar> FunctionSample<T> {
    /// The sample at α = 0 built from the starting point.
    pub fn origin(value: T, derivative: T) -> Self {
        Self {
            step: T::zero(),
            value,
            derivative,
            value_is_valid: true,
            derivative_is_valid: true,
        }
    }

    /// Whether value and derivative are both usable.
    pub fn is_valid(&self) -> bool {
        self.value_is_valid && self.derivative_is_valid
    }
}

/// Evaluates the objective along x + α·d with reused scratch buffers.
#[derive(Debug)]
pub struct LineSearchFunction<'a, T: Scalar, F: ?Sized> {
    objective: &'a F,
    position: &'a DVector<T>,
    direction: &'a DVector<T>,
    trial: DVector<T>,
    gradient: DVector<T>,
    // Step whose point and gradient currently sit in `trial` and `gradient`.
    buffered_step: Option<T>,
    function_evaluations: usize,
    gradient_evaluations: usize,
}

impl<'a, T, F> LineSearchFunction<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    /// Restricts `objective` to the ray from `position` along `direction`.
    pub fn new(objective: &'a F, position: &'a DVector<T>, direction: &'a DVector<T>) -> Self {
        let n = position.len();
        Self {
            objective,
            position,
            direction,
            trial: DVector::zeros(n),
            gradient: DVector::zeros(n),
            buffered_step: None,
            function_evaluations: 0,
            gradient_evaluations: 0,
        }
    }

    /// Evaluates φ(step) and, if requested, φ'(step).
    pub fn evaluate(&mut self, step: T, with_gradient: bool) -> FunctionSample<T> {
        self.trial.copy_from(self.position);
        self.trial.axpy(step, self.direction, T::one());
        self.buffered_step = None;
        self.function_evaluations += 1;

        let mut sample = FunctionSample {
            step,
            value: <T as Float>::nan(),
            derivative: <T as Float>::nan(),
            value_is_valid: false,
            derivative_is_valid: false,
        };

        let outcome = if with_gradient {
            self.gradient_evaluations += 1;
            self.objective.evaluate(&self.trial, Some(&mut self.gradient))
        } else {
            self.objective.evaluate(&self.trial, None)
        };

        match outcome {
            Ok(value) => {
                sample.value = value;
                sample.value_is_valid = Float::is_finite(value);
                if with_gradient && vector::is_finite(&self.gradient) {
                    sample.derivative = self.gradient.dot(self.direction);
                    sample.derivative_is_valid = Float::is_finite(sample.derivative);
                }
                if sample.is_valid() {
                    self.buffered_step = Some(step);
                }
            }
            Err(err) => {
                trace!(step = step.to_f64(), error = %err, "trial step rejected by objective");
            }
        }

        sample
    }

    /// Turns an acceptable sample into an evaluation point with gradient.
    ///
    /// Reuses the buffers when `sample` was the last gradient evaluation;
    /// otherwise evaluates once more at `sample.step`. Returns `None` if that
    /// evaluation fails.
    pub fn accept(&mut self, sample: &FunctionSample<T>) -> Option<EvaluationPoint<T>> {
        if self.buffered_step != Some(sample.step) {
            let fresh = self.evaluate(sample.step, true);
            if !fresh.is_valid() {
                return None;
            }
            return Some(self.buffered_point(fresh.value));
        }
        Some(self.buffered_point(sample.value))
    }

    fn buffered_point(&self, cost: T) -> EvaluationPoint<T> {
        EvaluationPoint::new(self.trial.clone(), cost, Some(self.gradient.clone()))
    }

    /// Number of objective calls so far.
    pub fn function_evaluations(&self) -> usize {
        self.function_evaluations
    }

    /// Number of objective calls that requested a gradient.
    pub fn gradient_evaluations(&self) -> usize {
        self.gradient_evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::objective::{CountingObjective, QuadraticObjective};
    use approx::assert_relative_eq;

    #[test]
    fn test_samples_along_ray() {
        let objective = QuadraticObjective::<f64>::diagonal(&[2.0]);
        let x = DVector::from_vec(vec![2.0]);
        let d = DVector::from_vec(vec![-4.0]);
        let mut phi = LineSearchFunction::new(&objective, &x, &d);

        let sample = phi.evaluate(0.25, true);
        // x + 0.25 d = 1, f = 1, f' = 2, phi' = -8
        assert!(sample.is_valid());
        assert_relative_eq!(sample.value, 1.0);
        assert_relative_eq!(sample.derivative, -8.0);

        let cost_only = phi.evaluate(0.5, false);
        assert!(cost_only.value_is_valid);
        assert!(!cost_only.derivative_is_valid);
        assert_eq!(phi.function_evaluations(), 2);
        assert_eq!(phi.gradient_evaluations(), 1);
    }

    #[test]
    fn test_accept_reuses_buffers() {
        let counting = CountingObjective::new(QuadraticObjective::<f64>::simple(2));
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let d = DVector::from_vec(vec![-1.0, -1.0]);
        let mut phi = LineSearchFunction::new(&counting, &x, &d);

        let sample = phi.evaluate(0.5, true);
        let point = phi.accept(&sample).unwrap();
        assert_eq!(counting.counts(), (1, 1));
        assert_relative_eq!(point.parameters, DVector::from_vec(vec![0.5, 0.5]));

        let cost_only = phi.evaluate(1.0, false);
        let point = phi.accept(&cost_only).unwrap();
        assert_eq!(counting.counts(), (3, 2));
        assert_relative_eq!(point.cost, 0.0);
        assert!(point.gradient.is_some());
    }

    #[test]
    fn test_failed_and_non_finite_samples_are_invalid() {
        let objective = crate::core::objective::FnObjective::new(1, |x: &DVector<f64>, g| {
            if x[0] < 0.0 {
                return Err(crate::core::error::EvaluationError::invalid_point("negative"));
            }
            if let Some(g) = g {
                g[0] = f64::INFINITY;
            }
            Ok(x[0])
        });
        let x = DVector::from_vec(vec![1.0]);
        let d = DVector::from_vec(vec![-1.0]);
        let mut phi = LineSearchFunction::new(&objective, &x, &d);

        assert!(!phi.evaluate(2.0, false).value_is_valid);
        let sample = phi.evaluate(0.5, true);
        assert!(sample.value_is_valid);
        assert!(!sample.derivative_is_valid);
        assert!(phi.accept(&sample).is_none());
    }
}
