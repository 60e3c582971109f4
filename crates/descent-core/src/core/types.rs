//! Scalar trait, vector aliases and numerical defaults.
//!
//! Every algorithm in the workspace is generic over a [`Scalar`] so that the
//! same code runs in single and double precision. The associated constants
//! carry the precision-dependent defaults used by the solver options.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in minimization (f32 or f64).
///
/// This trait combines the nalgebra and num-traits bounds needed by the line
/// searches and direction strategies. Methods that exist on both `RealField`
/// and `Float` must be called with a qualified path (`Float::abs(x)`).
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default absolute threshold on the gradient max-norm.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Default threshold on the relative cost change between iterations.
    const DEFAULT_FUNCTION_TOLERANCE: Self;

    /// Default threshold on the relative parameter change between iterations.
    const DEFAULT_PARAMETER_TOLERANCE: Self;

    /// Largest trial step a line search will attempt.
    const MAX_STEP_SIZE: Self;

    /// Smallest trial step before a line search gives up.
    const MIN_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// Values outside the representable range saturate to infinity; a failed
    /// conversion yields NaN, which every acceptance test rejects.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).unwrap_or_else(<Self as Float>::nan)
    }

    /// Convert to f64 (for logging and reports).
    fn to_f64(self) -> f64 {
        num_traits::cast(self).unwrap_or(f64::NAN)
    }

    /// Convert from usize (for iteration counts).
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).unwrap_or_else(<Self as Float>::nan)
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-6;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-4;
    const DEFAULT_PARAMETER_TOLERANCE: Self = 1e-5;
    const MAX_STEP_SIZE: Self = 1e3;
    const MIN_STEP_SIZE: Self = 1e-6;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-10;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-6;
    const DEFAULT_PARAMETER_TOLERANCE: Self = 1e-8;
    const MAX_STEP_SIZE: Self = 1e6;
    const MIN_STEP_SIZE: Self = 1e-9;
}

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Vector helpers shared by the line searches and direction strategies.
pub mod vector {
    use super::{DVector, Scalar};
    use num_traits::Float;

    /// Largest absolute entry, or zero for an empty vector.
    pub fn max_norm<T: Scalar>(v: &DVector<T>) -> T {
        v.iter()
            .fold(T::zero(), |acc, &x| Float::max(acc, Float::abs(x)))
    }

    /// True when every entry is finite.
    pub fn is_finite<T: Scalar>(v: &DVector<T>) -> bool {
        v.iter().all(|x| Float::is_finite(*x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_defaults_are_ordered() {
        assert!(f64::MIN_STEP_SIZE < f64::MAX_STEP_SIZE);
        assert!(f32::MIN_STEP_SIZE < f32::MAX_STEP_SIZE);
        assert!(f64::EPSILON < f64::DEFAULT_GRADIENT_TOLERANCE);
        assert!(f32::EPSILON < f32::DEFAULT_GRADIENT_TOLERANCE);
        assert!(f64::DEFAULT_PARAMETER_TOLERANCE < f64::DEFAULT_FUNCTION_TOLERANCE);
    }

    #[test]
    fn test_scalar_conversions() {
        let val_f32 = <f32 as Scalar>::from_f64(3.14159);
        assert_relative_eq!(f64::from(val_f32), 3.14159, epsilon = 1e-6);
        assert_relative_eq!(val_f32.to_f64(), f64::from(val_f32));
        assert_eq!(<f64 as Scalar>::from_usize(42), 42.0);
    }

    #[test]
    fn test_vector_helpers() {
        let v = DVector::from_vec(vec![1.0, -4.0, 2.5]);
        assert_eq!(vector::max_norm(&v), 4.0);
        assert!(vector::is_finite(&v));

        let empty: DVector<f64> = DVector::zeros(0);
        assert_eq!(vector::max_norm(&empty), 0.0);

        let bad = DVector::from_vec(vec![1.0, f64::NAN]);
        assert!(!vector::is_finite(&bad));
    }
}
