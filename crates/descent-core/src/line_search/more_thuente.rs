//! More–Thuente line search.
//!
//! Implements the safeguarded interval update of J. J. Moré and D. J.
//! Thuente, "Line search algorithms with guaranteed sufficient decrease",
//! ACM TOMS 20 (1994), in the form of the MINPACK-2 `dcsrch`/`dcstep` pair.
//! The interval of uncertainty is kept in a [`Bracket`]; each trial updates
//! it and proposes the next step from cubic, quadratic or secant models.

use super::{
    function::{FunctionSample, LineSearchFunction},
    interpolation::{cubic_minimizer, quadratic_minimizer, secant_minimizer},
    preflight, LineSearch, LineSearchParams, LineSearchResult,
};
use crate::core::{
    error::SolverResult,
    evaluation::EvaluationPoint,
    objective::ObjectiveFunction,
    types::{DVector, Scalar},
};
use num_traits::Float;
use tracing::debug;

/// Extrapolation bounds while no minimizer is bracketed.
const EXTRAPOLATE_LOWER: f64 = 1.1;
const EXTRAPOLATE_UPPER: f64 = 4.0;

/// Required shrink factor of the bracket width over two trials.
const WIDTH_REDUCTION: f64 = 0.66;

/// More–Thuente line search for the strong Wolfe conditions.
#[derive(Debug, Clone, Default)]
pub struct MoreThuenteLineSearch;

impl MoreThuenteLineSearch {
    /// Creates a new More–Thuente line search.
    pub fn new() -> Self {
        Self
    }
}

/// Interval of uncertainty.
///
/// `x` is the end with the lowest (possibly modified) function value so far,
/// `y` is the other end.
#[derive(Debug, Clone, Copy)]
struct Bracket<T: Scalar> {
    stx: T,
    fx: T,
    gx: T,
    sty: T,
    fy: T,
    gy: T,
    bracketed: bool,
}

impl<T: Scalar> Bracket<T> {
    /// Shifts values by the linear term `slope·α`, giving the modified
    /// function ψ(α) = φ(α) − φ(0) − slope·α used during the first stage.
    fn shifted(&self, slope: T) -> Self {
        Self {
            fx: self.fx - self.stx * slope,
            gx: self.gx - slope,
            fy: self.fy - self.sty * slope,
            gy: self.gy - slope,
            ..*self
        }
    }

    /// Updates the interval with the trial (stp, fp, dp) and returns the
    /// next trial step together with whether `x` moved to the trial.
    fn step(&mut self, stp: T, fp: T, dp: T, stpmin: T, stpmax: T) -> (T, bool) {
        let half = <T as Scalar>::from_f64(0.5);
        let p66 = <T as Scalar>::from_f64(WIDTH_REDUCTION);
        let (stx, fx, dx) = (self.stx, self.fx, self.gx);
        let midpoint = stx + half * (stp - stx);
        let same_sign = dp * Float::signum(dx) > T::zero();

        let stpf = if fp > fx {
            // Case 1: higher function value, the minimum is bracketed.
            self.bracketed = true;
            let stpc = cubic_minimizer(stx, fx, dx, stp, fp, dp).unwrap_or(midpoint);
            let stpq = quadratic_minimizer(stx, fx, dx, stp, fp).unwrap_or(midpoint);
            if Float::abs(stpc - stx) < Float::abs(stpq - stx) {
                stpc
            } else {
                stpc + half * (stpq - stpc)
            }
        } else if !same_sign {
            // Case 2: lower value, derivatives of opposite sign.
            self.bracketed = true;
            let stpc = cubic_minimizer(stx, fx, dx, stp, fp, dp).unwrap_or(midpoint);
            let stpq = secant_minimizer(stx, dx, stp, dp).unwrap_or(midpoint);
            if Float::abs(stpc - stp) > Float::abs(stpq - stp) {
                stpc
            } else {
                stpq
            }
        } else if Float::abs(dp) < Float::abs(dx) {
            // Case 3: lower value, same sign, derivative magnitude decreases.
            let stpc = Self::cubic_toward_bound(stx, fx, dx, stp, fp, dp, stpmin, stpmax);
            let stpq = secant_minimizer(stx, dx, stp, dp).unwrap_or(stpc);
            if self.bracketed {
                let stpf = if Float::abs(stpc - stp) < Float::abs(stpq - stp) {
                    stpc
                } else {
                    stpq
                };
                let limit = stp + p66 * (self.sty - stp);
                if stp > stx {
                    Float::min(limit, stpf)
                } else {
                    Float::max(limit, stpf)
                }
            } else {
                let stpf = if Float::abs(stpc - stp) > Float::abs(stpq - stp) {
                    stpc
                } else {
                    stpq
                };
                Float::max(stpmin, Float::min(stpmax, stpf))
            }
        } else if self.bracketed {
            // Case 4: lower value, same sign, derivative does not decrease.
            cubic_minimizer(self.sty, self.fy, self.gy, stp, fp, dp)
                .unwrap_or_else(|| stp + half * (self.sty - stp))
        } else if stp > stx {
            stpmax
        } else {
            stpmin
        };

        // Update the interval of uncertainty.
        let moved = !(fp > fx);
        if fp > fx {
            self.sty = stp;
            self.fy = fp;
            self.gy = dp;
        } else {
            if !same_sign {
                self.sty = stx;
                self.fy = fx;
                self.gy = dx;
            }
            self.stx = stp;
            self.fx = fp;
            self.gx = dp;
        }

        (stpf, moved)
    }

    /// Cubic step for case 3, which may point at a step bound when the cubic
    /// does not turn upward beyond `stp`.
    #[allow(clippy::too_many_arguments)]
    fn cubic_toward_bound(stx: T, fx: T, dx: T, stp: T, fp: T, dp: T, stpmin: T, stpmax: T) -> T {
        let three = <T as Scalar>::from_f64(3.0);
        let theta = three * (fx - fp) / (stp - stx) + dx + dp;
        let s = Float::max(Float::max(Float::abs(theta), Float::abs(dx)), Float::abs(dp));
        let far_bound = if stp > stx { stpmax } else { stpmin };
        if s == T::zero() {
            return far_bound;
        }
        let discriminant = Float::max(T::zero(), (theta / s) * (theta / s) - (dx / s) * (dp / s));
        let mut gamma = s * Float::sqrt(discriminant);
        if stp > stx {
            gamma = -gamma;
        }
        let p = (gamma - dp) + theta;
        let q = (gamma + (dx - dp)) + gamma;
        let r = p / q;
        if r < T::zero() && gamma != T::zero() && Float::is_finite(r) {
            stp + r * (stx - stp)
        } else {
            far_bound
        }
    }
}

impl<T: Scalar> LineSearch<T> for MoreThuenteLineSearch {
    fn search_with_deriv<F>(
        &mut self,
        objective: &F,
        start: &EvaluationPoint<T>,
        direction: &DVector<T>,
        directional_derivative: T,
        initial_step: T,
        params: &LineSearchParams<T>,
    ) -> SolverResult<LineSearchResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        if let Some(rejected) = preflight(
            start,
            direction,
            directional_derivative,
            initial_step,
            params,
        )? {
            return Ok(rejected);
        }

        let half = <T as Scalar>::from_f64(0.5);
        let p66 = <T as Scalar>::from_f64(WIDTH_REDUCTION);
        let xtrapl = <T as Scalar>::from_f64(EXTRAPOLATE_LOWER);
        let xtrapu = <T as Scalar>::from_f64(EXTRAPOLATE_UPPER);

        let origin = FunctionSample::origin(start.cost, directional_derivative);
        let finit = origin.value;
        let ginit = origin.derivative;
        let gtest = params.c1 * ginit;
        let curvature_bound = -params.c2 * ginit;
        let stage_slope = Float::min(params.c1, params.c2) * ginit;
        let (min_step, max_step) = (params.min_step_size, params.max_step_size);

        let mut phi = LineSearchFunction::new(objective, &start.parameters, direction);
        let mut bracket = Bracket {
            stx: T::zero(),
            fx: finit,
            gx: ginit,
            sty: T::zero(),
            fy: finit,
            gy: ginit,
            bracketed: false,
        };
        let mut best = origin;
        let mut stage1 = true;
        let mut width = max_step - min_step;
        let mut width1 = width / half;

        let mut stp = Float::max(min_step, Float::min(initial_step, max_step));
        let mut stmin = T::zero();
        let mut stmax = stp + xtrapu * stp;
        let mut iterations = 0;

        loop {
            if iterations >= params.max_iterations {
                return Ok(fall_back(
                    &mut phi,
                    &best,
                    iterations,
                    "trial budget exhausted",
                ));
            }

            let sample = phi.evaluate(stp, true);
            iterations += 1;

            if !sample.is_valid() {
                // Retreat toward the best step and never extrapolate past
                // the unevaluable one again.
                stmax = Float::min(stmax, stp);
                stp = bracket.stx + half * (stp - bracket.stx);
                if Float::abs(stp - bracket.stx) < min_step {
                    return Ok(fall_back(
                        &mut phi,
                        &best,
                        iterations,
                        "no evaluable step near the best point",
                    ));
                }
                continue;
            }

            let (f, g) = (sample.value, sample.derivative);
            let ftest = finit + stp * gtest;

            if f <= ftest && Float::abs(g) <= curvature_bound {
                if let Some(point) = phi.accept(&sample) {
                    return Ok(LineSearchResult::accepted(&phi, stp, point, iterations));
                }
            }

            if stage1 && f <= ftest && g >= stage_slope {
                stage1 = false;
            }

            if bracket.bracketed && (stp <= stmin || stp >= stmax) {
                return Ok(fall_back(
                    &mut phi,
                    &best,
                    iterations,
                    "rounding errors prevent further progress",
                ));
            }
            if bracket.bracketed && stmax - stmin <= params.bracket_tolerance * stmax {
                return Ok(fall_back(
                    &mut phi,
                    &best,
                    iterations,
                    "interval of uncertainty below tolerance",
                ));
            }
            if stp == max_step && f <= ftest && g <= gtest {
                return Ok(fall_back(
                    &mut phi,
                    &sample,
                    iterations,
                    "step reached the maximum step size",
                ));
            }
            if stp == min_step && (f > ftest || g >= gtest) {
                return Ok(fall_back(
                    &mut phi,
                    &best,
                    iterations,
                    "step reached the minimum step size",
                ));
            }

            let (next, moved) = if stage1 && f <= bracket.fx && f > ftest {
                let mut modified = bracket.shifted(gtest);
                let outcome = modified.step(stp, f - stp * gtest, g - gtest, stmin, stmax);
                bracket = modified.shifted(-gtest);
                outcome
            } else {
                bracket.step(stp, f, g, stmin, stmax)
            };
            if moved {
                best = sample;
            }
            stp = next;

            if bracket.bracketed {
                let span = Float::abs(bracket.sty - bracket.stx);
                if span >= p66 * width1 {
                    stp = bracket.stx + half * (bracket.sty - bracket.stx);
                }
                width1 = width;
                width = span;
            }

            if bracket.bracketed {
                stmin = Float::min(bracket.stx, bracket.sty);
                stmax = Float::max(bracket.stx, bracket.sty);
            } else {
                stmin = stp + xtrapl * (stp - bracket.stx);
                stmax = stp + xtrapu * (stp - bracket.stx);
            }

            stp = Float::max(min_step, Float::min(stp, max_step));
            if bracket.bracketed
                && (stp <= stmin
                    || stp >= stmax
                    || stmax - stmin <= params.bracket_tolerance * stmax)
            {
                stp = bracket.stx;
            }
        }
    }

    fn name(&self) -> &'static str {
        "MoreThuente"
    }
}

/// Accepts `best` when it improved on the origin, fails otherwise.
fn fall_back<T, F>(
    phi: &mut LineSearchFunction<'_, T, F>,
    best: &FunctionSample<T>,
    iterations: usize,
    reason: &str,
) -> LineSearchResult<T>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    if best.step > T::zero() && best.value_is_valid {
        if let Some(point) = phi.accept(best) {
            debug!(
                step = best.step.to_f64(),
                reason, "More-Thuente search kept its best sufficient decrease step"
            );
            let mut result = LineSearchResult::accepted(phi, best.step, point, iterations);
            result.message = format!("{reason}; curvature condition not satisfied");
            return result;
        }
    }
    debug!(iterations, reason, "More-Thuente search failed");
    LineSearchResult::failed(phi, best.step, iterations, reason)
}
