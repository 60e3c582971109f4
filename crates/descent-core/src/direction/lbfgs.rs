//! Limited-memory BFGS directions.

use super::{DirectionContext, InitialStepPolicy, SearchDirection};
use crate::core::types::{vector, DVector, Scalar};
use num_traits::Float;
use tracing::trace;

/// L-BFGS with a fixed-capacity history of correction pairs.
///
/// The history is a ring buffer: once `memory_size` pairs are stored, each
/// new pair overwrites the oldest slot in place, so no vectors are allocated
/// after the buffer fills. Storage grows with the pairs actually seen, so a
/// `memory_size` larger than the number of iterations costs nothing. Pairs
/// with sᵀy ≤ ε‖s‖‖y‖ are dropped, which keeps the implicit inverse Hessian
/// positive definite.
#[derive(Debug, Clone)]
pub struct Lbfgs<T: Scalar> {
    memory_size: usize,
    s_history: Vec<DVector<T>>,
    y_history: Vec<DVector<T>>,
    rho_history: Vec<T>,
    /// Slot holding the oldest pair
    head: usize,
    len: usize,
    alphas: Vec<T>,
}

impl<T: Scalar> Lbfgs<T> {
    /// Creates an L-BFGS strategy storing at most `memory_size` pairs.
    pub fn new(memory_size: usize) -> Self {
        let memory_size = memory_size.max(1);
        Self {
            memory_size,
            s_history: Vec::new(),
            y_history: Vec::new(),
            rho_history: Vec::new(),
            head: 0,
            len: 0,
            alphas: Vec::new(),
        }
    }

    /// Maximum number of stored pairs.
    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    /// Number of pairs currently stored.
    pub fn history_len(&self) -> usize {
        self.len
    }

    /// Slot of the `k`-th oldest pair.
    fn slot(&self, k: usize) -> usize {
        (self.head + k) % self.memory_size
    }
}

impl<T: Scalar> SearchDirection<T> for Lbfgs<T> {
    fn compute(&mut self, context: &DirectionContext<'_, T>, direction: &mut DVector<T>) -> bool {
        direction.copy_from(context.gradient);
        self.alphas.clear();

        // Newest to oldest.
        for k in (0..self.len).rev() {
            let i = self.slot(k);
            let alpha = self.rho_history[i] * self.s_history[i].dot(direction);
            direction.axpy(-alpha, &self.y_history[i], T::one());
            self.alphas.push(alpha);
        }

        if self.len > 0 {
            let newest = self.slot(self.len - 1);
            let y = &self.y_history[newest];
            let gamma = T::one() / (self.rho_history[newest] * y.norm_squared());
            *direction *= gamma;
        }

        // Oldest to newest; alphas were pushed newest first.
        for k in 0..self.len {
            let i = self.slot(k);
            let beta = self.rho_history[i] * self.y_history[i].dot(direction);
            let alpha = self.alphas[self.len - 1 - k];
            direction.axpy(alpha - beta, &self.s_history[i], T::one());
        }

        direction.neg_mut();
        vector::is_finite(direction)
    }

    fn update(&mut self, position_delta: &DVector<T>, gradient_delta: &DVector<T>) -> bool {
        let sy = position_delta.dot(gradient_delta);
        let threshold = T::EPSILON * position_delta.norm() * gradient_delta.norm();
        if !(sy > threshold) || !Float::is_finite(sy) {
            trace!(sy = sy.to_f64(), "skipping L-BFGS pair with insufficient curvature");
            return false;
        }
        let rho = T::one() / sy;

        let slot = if self.len < self.memory_size {
            let slot = self.slot(self.len);
            self.len += 1;
            slot
        } else {
            let slot = self.head;
            self.head = (self.head + 1) % self.memory_size;
            slot
        };

        if slot < self.s_history.len() && self.s_history[slot].len() == position_delta.len() {
            self.s_history[slot].copy_from(position_delta);
            self.y_history[slot].copy_from(gradient_delta);
            self.rho_history[slot] = rho;
        } else if slot < self.s_history.len() {
            self.s_history[slot] = position_delta.clone();
            self.y_history[slot] = gradient_delta.clone();
            self.rho_history[slot] = rho;
        } else {
            self.s_history.push(position_delta.clone());
            self.y_history.push(gradient_delta.clone());
            self.rho_history.push(rho);
        }
        true
    }

    fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    fn initial_step_policy(&self) -> InitialStepPolicy {
        InitialStepPolicy::Unit
    }

    fn name(&self) -> &'static str {
        "L-BFGS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn direction(lbfgs: &mut Lbfgs<f64>, g: &DVector<f64>) -> DVector<f64> {
        let mut d = DVector::zeros(g.len());
        assert!(lbfgs.compute(&DirectionContext::initial(g), &mut d));
        d
    }

    fn pair(i: usize) -> (DVector<f64>, DVector<f64>) {
        let t = i as f64;
        let s = DVector::from_vec(vec![1.0 + t, 0.5 * t, -0.25 * t + 1.0]);
        // y = A s for A = diag(1, 2, 4) keeps s^T y > 0
        let y = DVector::from_vec(vec![s[0], 2.0 * s[1], 4.0 * s[2]]);
        (s, y)
    }

    #[test]
    fn test_empty_history_is_steepest_descent() {
        let mut lbfgs = Lbfgs::new(5);
        let g = DVector::from_vec(vec![1.0, -2.0, 3.0]);
        assert_eq!(direction(&mut lbfgs, &g), -&g);
    }

    #[test]
    fn test_single_pair_gives_newton_step_in_one_dimension() {
        // f(x) = x^2: s = 1, y = 2
        let mut lbfgs = Lbfgs::new(5);
        assert!(lbfgs.update(&DVector::from_vec(vec![1.0]), &DVector::from_vec(vec![2.0])));
        let d = direction(&mut lbfgs, &DVector::from_vec(vec![4.0]));
        assert_relative_eq!(d[0], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_secant_condition_on_newest_pair() {
        let mut lbfgs = Lbfgs::new(4);
        for i in 0..3 {
            let (s, y) = pair(i);
            assert!(lbfgs.update(&s, &y));
        }
        // H y = s for the most recent pair
        let (s, y) = pair(2);
        let d = direction(&mut lbfgs, &y);
        assert_relative_eq!(d, -s, epsilon = 1e-10);
    }

    #[test]
    fn test_history_never_exceeds_memory() {
        let mut lbfgs = Lbfgs::new(3);
        for i in 0..10 {
            let (s, y) = pair(i);
            assert!(lbfgs.update(&s, &y));
            assert!(lbfgs.history_len() <= 3);
        }
        assert_eq!(lbfgs.history_len(), 3);

        // Same result as a fresh buffer fed only the three newest pairs.
        let mut fresh = Lbfgs::new(3);
        for i in 7..10 {
            let (s, y) = pair(i);
            fresh.update(&s, &y);
        }
        let g = DVector::from_vec(vec![0.3, -1.0, 2.0]);
        assert_relative_eq!(direction(&mut lbfgs, &g), direction(&mut fresh, &g), epsilon = 1e-12);
    }

    #[test]
    fn test_huge_memory_grows_with_history() {
        let mut unbounded = Lbfgs::new(usize::MAX);
        let mut small = Lbfgs::new(8);
        for i in 0..4 {
            let (s, y) = pair(i);
            assert!(unbounded.update(&s, &y));
            small.update(&s, &y);
        }
        assert_eq!(unbounded.history_len(), 4);
        assert_eq!(unbounded.memory_size(), usize::MAX);

        let g = DVector::from_vec(vec![1.0, 0.5, -2.0]);
        assert_relative_eq!(
            direction(&mut unbounded, &g),
            direction(&mut small, &g),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rejects_pairs_without_curvature() {
        let mut lbfgs = Lbfgs::new(3);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        assert!(!lbfgs.update(&s, &DVector::from_vec(vec![-1.0, 0.0])));
        assert!(!lbfgs.update(&s, &DVector::from_vec(vec![0.0, 1.0])));
        assert!(!lbfgs.update(&s, &DVector::from_vec(vec![f64::NAN, 0.0])));
        assert_eq!(lbfgs.history_len(), 0);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut lbfgs = Lbfgs::new(3);
        let (s, y) = pair(1);
        lbfgs.update(&s, &y);
        lbfgs.reset();
        assert_eq!(lbfgs.history_len(), 0);

        let g = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        assert_eq!(direction(&mut lbfgs, &g), -&g);
    }
}
