//! Integration tests for the objective helpers and the direction strategies.

use approx::assert_relative_eq;
use descent_core::prelude::*;
use proptest::prelude::*;

/// f(x, y) = (1 - x)^2 + 100 (y - x^2)^2
fn rosenbrock(x: &DVector<f64>, gradient: Option<&mut DVector<f64>>) -> Result<f64> {
    let (a, b) = (x[0], x[1]);
    if let Some(g) = gradient {
        g[0] = -2.0 * (1.0 - a) - 400.0 * a * (b - a * a);
        g[1] = 200.0 * (b - a * a);
    }
    Ok((1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2))
}

#[test]
fn test_rosenbrock_gradient_matches_finite_differences() {
    let checker = GradientChecker::default();
    for point in [[-1.2, 1.0], [0.0, 0.0], [1.0, 1.0], [2.0, -1.0]] {
        let check = checker
            .check(&FnObjective::new(2, rosenbrock), &DVector::from_vec(point.to_vec()))
            .unwrap();
        assert!(check.passed, "{point:?}: {}", check.max_relative_error);
    }
}

#[test]
fn test_gradient_checker_flags_wrong_gradient() {
    let wrong = FnObjective::new(1, |x: &DVector<f64>, gradient| {
        if let Some(g) = gradient {
            g[0] = x[0];
        }
        Ok(x[0] * x[0])
    });
    let check = GradientChecker::default()
        .check(&wrong, &DVector::from_vec(vec![3.0]))
        .unwrap();
    assert!(!check.passed);
    assert_eq!(check.worst_component, 0);
}

#[test]
fn test_quadratic_objective_minimum() {
    // f(x) = 0.5 x^T A x + b^T x with A = diag(2, 4), b = (-2, -4): minimum at (1, 1)
    let a = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 4.0]));
    let b = DVector::from_vec(vec![-2.0, -4.0]);
    let objective = QuadraticObjective::new(a, b, 3.0);

    let x = DVector::from_vec(vec![1.0, 1.0]);
    let (cost, gradient) = objective.cost_and_gradient(&x).unwrap();
    assert_relative_eq!(cost, 0.0, epsilon = 1e-12);
    assert_relative_eq!(gradient.norm(), 0.0, epsilon = 1e-12);
}

#[test]
fn test_dimension_mismatch_is_reported() {
    let objective = QuadraticObjective::<f64>::simple(3);
    let err = EvaluationPoint::evaluate(&objective, DVector::zeros(2), true).unwrap_err();
    match &err {
        EvaluationError::DimensionMismatch { expected, actual } => {
            assert_eq!(expected, "3");
            assert_eq!(actual, "2");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 2");
}

fn correction_pairs() -> impl Strategy<Value = Vec<(Vec<f64>, Vec<f64>)>> {
    prop::collection::vec(
        (
            prop::collection::vec(-5.0f64..5.0, 3),
            prop::collection::vec(0.1f64..10.0, 3),
        ),
        1..12,
    )
    .prop_map(|pairs| {
        // y = diag(c) s gives s^T y > 0 whenever s != 0
        pairs
            .into_iter()
            .map(|(s, c)| {
                let y = s.iter().zip(&c).map(|(s, c)| s * c).collect();
                (s, y)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_lbfgs_direction_is_descent(
        pairs in correction_pairs(),
        gradient in prop::collection::vec(-10.0f64..10.0, 3),
        memory_size in 1usize..6,
    ) {
        let g = DVector::from_vec(gradient);
        prop_assume!(g.norm() > 1e-6);

        let mut lbfgs = SearchDirectionMethod::<f64>::new(
            LineSearchDirectionType::Lbfgs,
            NonlinearConjugateGradientType::default(),
            0,
            memory_size,
        );
        for (s, y) in &pairs {
            lbfgs.update(&DVector::from_vec(s.clone()), &DVector::from_vec(y.clone()));
        }

        let mut direction = DVector::zeros(3);
        prop_assert!(lbfgs.compute(&DirectionContext::initial(&g), &mut direction));
        prop_assert!(direction.dot(&g) < 0.0);
        if let SearchDirectionMethod::Lbfgs(inner) = &lbfgs {
            prop_assert!(inner.history_len() <= memory_size);
        }
    }
}
