//! Polynomial models of φ used to propose trial steps.
//!
//! Each helper returns `None` when the model has no finite minimizer, and the
//! caller falls back to a simpler model or to bisection.

use crate::core::types::Scalar;
use num_traits::Float;

/// Minimizer of the quadratic matching φ(u), φ'(u) and φ(v).
pub fn quadratic_minimizer<T: Scalar>(u: T, fu: T, du: T, v: T, fv: T) -> Option<T> {
    let d = v - u;
    let curvature = (fv - fu - du * d) / (d * d);
    if !(curvature > T::zero()) || !Float::is_finite(curvature) {
        return None;
    }
    finite(u - du / (<T as Scalar>::from_f64(2.0) * curvature))
}

/// Minimizer of the quadratic matching φ'(u) and φ'(v), the secant step.
pub fn secant_minimizer<T: Scalar>(u: T, du: T, v: T, dv: T) -> Option<T> {
    let denom = dv - du;
    if denom == T::zero() {
        return None;
    }
    finite(v + dv / denom * (u - v))
}

/// Minimizer of the cubic matching φ and φ' at both `u` and `v`.
///
/// Uses the scaled form from More and Thuente to avoid overflow in the
/// discriminant.
pub fn cubic_minimizer<T: Scalar>(u: T, fu: T, du: T, v: T, fv: T, dv: T) -> Option<T> {
    let d = v - u;
    let three = <T as Scalar>::from_f64(3.0);
    let theta = three * (fu - fv) / d + du + dv;
    let s = Float::max(Float::max(Float::abs(theta), Float::abs(du)), Float::abs(dv));
    if s == T::zero() {
        return None;
    }
    let a = theta / s;
    let discriminant = a * a - (du / s) * (dv / s);
    if discriminant < T::zero() {
        return None;
    }
    let mut gamma = s * Float::sqrt(discriminant);
    if v < u {
        gamma = -gamma;
    }
    let p = gamma - du + theta;
    let q = gamma - du + gamma + dv;
    if q == T::zero() {
        return None;
    }
    finite(u + p / q * d)
}

/// Minimizer of the cubic through φ(0), φ'(0), φ(a1) and φ(a2).
///
/// Backtracking only knows function values at its trial steps, so this model
/// uses the two most recent ones instead of derivatives. Degenerates to the
/// quadratic minimizer when the cubic coefficient vanishes.
pub fn cubic_minimizer_from_values<T: Scalar>(
    f0: T,
    d0: T,
    a1: T,
    f1: T,
    a2: T,
    f2: T,
) -> Option<T> {
    if a1 == a2 || a1 <= T::zero() || a2 <= T::zero() {
        return None;
    }
    let r1 = f1 - f0 - d0 * a1;
    let r2 = f2 - f0 - d0 * a2;
    let denom = a1 * a1 * a2 * a2 * (a2 - a1);
    let a = (a1 * a1 * r2 - a2 * a2 * r1) / denom;
    let b = (-a1 * a1 * a1 * r2 + a2 * a2 * a2 * r1) / denom;
    let three = <T as Scalar>::from_f64(3.0);

    if Float::abs(a) <= T::EPSILON * Float::abs(b) {
        if b <= T::zero() {
            return None;
        }
        return finite(-d0 / (<T as Scalar>::from_f64(2.0) * b));
    }

    let discriminant = b * b - three * a * d0;
    if discriminant < T::zero() {
        return None;
    }
    finite((-b + Float::sqrt(discriminant)) / (three * a))
}

/// Clamps `candidate` into `[lower, upper]`, using `fallback` when missing.
pub fn safeguard<T: Scalar>(candidate: Option<T>, lower: T, upper: T, fallback: T) -> T {
    match candidate {
        Some(step) => Float::min(Float::max(step, lower), upper),
        None => fallback,
    }
}

fn finite<T: Scalar>(value: T) -> Option<T> {
    Float::is_finite(value).then_some(value)
}
