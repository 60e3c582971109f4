//! Snapshots of the objective at a single parameter vector.

use crate::{
    core::objective::ObjectiveFunction,
    error::{EvaluationError, Result},
    types::{vector, DVector, Scalar},
};
use num_traits::Float;

/// Immutable record of {parameters, cost, gradient} at one point.
///
/// A point without a gradient is valid for cost comparisons only; direction
/// strategies and line searches require [`gradient`](Self::gradient).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationPoint<T: Scalar> {
    /// Parameter vector the objective was evaluated at
    pub parameters: DVector<T>,
    /// Objective value
    pub cost: T,
    /// Gradient, when it was requested
    pub gradient: Option<DVector<T>>,
}

impl<T: Scalar> EvaluationPoint<T> {
    /// Evaluates `objective` at `parameters`.
    ///
    /// Length mismatches are reported as [`EvaluationError::DimensionMismatch`]
    /// without calling the objective.
    pub fn evaluate<F>(objective: &F, parameters: DVector<T>, with_gradient: bool) -> Result<Self>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let n = objective.num_parameters();
        if parameters.len() != n {
            return Err(EvaluationError::dimension_mismatch(n, parameters.len()));
        }

        if with_gradient {
            let mut gradient = DVector::zeros(n);
            let cost = objective.evaluate(&parameters, Some(&mut gradient))?;
            Ok(Self {
                parameters,
                cost,
                gradient: Some(gradient),
            })
        } else {
            let cost = objective.evaluate(&parameters, None)?;
            Ok(Self {
                parameters,
                cost,
                gradient: None,
            })
        }
    }

    /// Builds a point from already computed values.
    pub fn new(parameters: DVector<T>, cost: T, gradient: Option<DVector<T>>) -> Self {
        Self {
            parameters,
            cost,
            gradient,
        }
    }

    /// Gradient, or an error when the point was evaluated cost-only.
    pub fn require_gradient(&self) -> Result<&DVector<T>> {
        self.gradient
            .as_ref()
            .ok_or_else(|| EvaluationError::failed("gradient was not evaluated at this point"))
    }

    /// Largest absolute gradient entry.
    pub fn gradient_max_norm(&self) -> Option<T> {
        self.gradient.as_ref().map(vector::max_norm)
    }

    /// Euclidean norm of the gradient.
    pub fn gradient_norm(&self) -> Option<T> {
        self.gradient.as_ref().map(|g| g.norm())
    }

    /// Directional derivative `direction · gradient`.
    pub fn directional_derivative(&self, direction: &DVector<T>) -> Option<T> {
        self.gradient.as_ref().map(|g| g.dot(direction))
    }

    /// True when the cost and any gradient entries are all finite.
    pub fn is_finite(&self) -> bool {
        Float::is_finite(self.cost) && self.gradient.as_ref().map_or(true, vector::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::objective::QuadraticObjective;
    use approx::assert_relative_eq;

    #[test]
    fn test_evaluate_with_and_without_gradient() {
        let objective = QuadraticObjective::<f64>::diagonal(&[2.0, 8.0]);
        let x = DVector::from_vec(vec![1.0, -0.5]);

        let full = EvaluationPoint::evaluate(&objective, x.clone(), true).unwrap();
        assert_relative_eq!(full.cost, 2.0);
        assert_relative_eq!(full.gradient_max_norm().unwrap(), 4.0);
        assert_relative_eq!(full.gradient_norm().unwrap(), 20.0_f64.sqrt());

        let direction = DVector::from_vec(vec![-1.0, 0.0]);
        assert_relative_eq!(full.directional_derivative(&direction).unwrap(), -2.0);

        let cost_only = EvaluationPoint::evaluate(&objective, x, false).unwrap();
        assert_eq!(cost_only.cost, full.cost);
        assert!(cost_only.gradient.is_none());
        assert!(cost_only.require_gradient().is_err());
        assert!(cost_only.directional_derivative(&direction).is_none());
    }

    #[test]
    fn test_dimension_mismatch_skips_objective() {
        let objective = QuadraticObjective::<f64>::simple(3);
        let err = EvaluationPoint::evaluate(&objective, DVector::zeros(2), true).unwrap_err();
        assert!(matches!(err, EvaluationError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_is_finite() {
        let point = EvaluationPoint::new(
            DVector::from_vec(vec![0.0]),
            1.0,
            Some(DVector::from_vec(vec![f64::INFINITY])),
        );
        assert!(!point.is_finite());

        let point = EvaluationPoint::new(DVector::from_vec(vec![0.0]), f64::NAN, None);
        assert!(!point.is_finite());
    }
}
