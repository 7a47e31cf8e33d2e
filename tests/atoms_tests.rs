//! Tests for atoms: exponential cone atoms, DCP attributes, numeric
//! evaluation, shape checking and parameters.

use cvxlin::prelude::*;
use nalgebra::DMatrix;

const TOL: f64 = 1e-4;

// ============================================================================
// Exponential Cone Atoms
// ============================================================================

#[test]
fn test_exp_basic() {
    // minimize exp(x) s.t. x >= 0
    // Solution: x = 0, exp(0) = 1
    let x = variable(());
    let solution = Problem::minimize(exp(&x))
        .subject_to([x.ge(0.0)])
        .solve()
        .expect("Should solve");

    assert_eq!(solution.status, SolveStatus::Optimal);
    let val = solution.value.unwrap();
    assert!((val - 1.0).abs() < TOL, "Expected 1.0, got {}", val);

    let x_val = solution.value(&x);
    assert!(x_val.abs() < TOL, "Expected x=0, got {}", x_val);
}

#[test]
fn test_exp_with_constraint() {
    // maximize x s.t. exp(x) <= 5
    let x = variable(());
    let solution = Problem::maximize(&x)
        .subject_to([exp(&x).le(5.0)])
        .solve()
        .expect("Should solve");

    assert_eq!(solution.status, SolveStatus::Optimal);
    let x_val = solution.value(&x);
    let expected = 5.0_f64.ln();
    assert!(
        (x_val - expected).abs() < TOL,
        "Expected {}, got {}",
        expected,
        x_val
    );
}

#[test]
fn test_log_concave() {
    // minimize -log(x) s.t. 0.1 <= x <= 1
    // -log(x) is convex and decreasing, so minimum is at x = 1
    let x = variable(());
    let solution = Problem::minimize(-log(&x))
        .subject_to([x.ge(0.1), x.le(1.0)])
        .solve()
        .expect("Should solve");

    assert_eq!(solution.status, SolveStatus::Optimal);
    let x_val = solution.value(&x);
    assert!((x_val - 1.0).abs() < TOL, "Expected x=1, got {}", x_val);
}

#[test]
fn test_entropy_interior_maximum() {
    // -x log x peaks at x = 1/e with value 1/e
    let x = variable(());
    let solution = Problem::maximize(entropy(&x))
        .subject_to([x.le(0.5), x.ge(0.1)])
        .solve()
        .expect("Should solve");

    assert_eq!(solution.status, SolveStatus::Optimal);
    let inv_e = (-1.0_f64).exp();
    assert!((solution.value.unwrap() - inv_e).abs() < TOL);
    assert!((solution.value(&x) - inv_e).abs() < 1e-3);
}

#[test]
fn test_sqrt_vector() {
    // maximize sum(sqrt(x)) s.t. sum(x) = 4, x in R^4 => x = 1, value 4
    let x = variable(4);
    let solution = Problem::maximize(sum(sqrt(&x)))
        .subject_to([sum(&x).equals(4.0)])
        .solve()
        .expect("Should solve");
    assert!((solution.value.unwrap() - 4.0).abs() < TOL);
    for v in solution[&x].iter() {
        assert!((v - 1.0).abs() < 1e-3, "Expected x=1, got {}", v);
    }
}

#[test]
fn test_logistic_style_bound() {
    // log(exp(a) + exp(b)) <= t rewritten as exp(a - t) + exp(b - t) <= 1;
    // with a = b = 0 the smallest t is log 2.
    let t = variable(());
    let solution = Problem::minimize(&t)
        .subject_to([(exp(-&t) + exp(-&t)).le(1.0)])
        .solve()
        .expect("Should solve");
    assert!((solution.value.unwrap() - 2.0_f64.ln()).abs() < TOL);
}

// ============================================================================
// Duals
// ============================================================================

#[test]
fn test_dual_values_simple() {
    // minimize x s.t. x >= 1; the bound has multiplier 1
    let x = variable(());
    let c = x.ge(1.0);
    let solution = Problem::minimize(&x)
        .subject_to([c.clone()])
        .solve()
        .expect("Should solve");

    let dual = solution.constraint_dual(&c).expect("dual");
    assert!((dual[0] - 1.0).abs() < TOL, "Expected 1, got {}", dual[0]);
    assert_eq!(c.dual_value().as_ref(), Some(dual));
}

#[test]
fn test_dual_values_shadow_price() {
    // maximize 3x + 2y s.t. x + y <= 4, x <= 3, x, y >= 0
    // x = 3, y = 1, shadow price of the budget is 2, of x <= 3 is 1
    let x = variable(());
    let y = variable(());
    let budget = (&x + &y).le(4.0);
    let cap = x.le(3.0);
    let solution = Problem::maximize(3.0 * &x + 2.0 * &y)
        .subject_to([budget.clone(), cap.clone(), x.ge(0.0), y.ge(0.0)])
        .solve()
        .expect("Should solve");

    assert!((solution.value.unwrap() - 11.0).abs() < TOL);
    assert!((budget.dual_value().unwrap()[0] - 2.0).abs() < TOL);
    assert!((cap.dual_value().unwrap()[0] - 1.0).abs() < TOL);
}

// ============================================================================
// DCP attributes
// ============================================================================

#[test]
fn test_exp_dcp_rules() {
    let x = variable(());
    assert_eq!(exp(&x).curvature(), Curvature::Convex);
    assert_eq!(exp(&x).sign(), Sign::Nonnegative);
    // convex increasing of convex
    assert!(exp(square(&x)).is_convex());
    // convex increasing of concave is not DCP
    assert!(!exp(sqrt(&x)).is_dcp());
}

#[test]
fn test_log_dcp_rules() {
    let x = variable(());
    assert_eq!(log(&x).curvature(), Curvature::Concave);
    assert!(log(sqrt(&x)).is_concave());
    assert!(!log(exp(&x)).is_dcp());
    assert_eq!(entropy(&x).curvature(), Curvature::Concave);
    assert_eq!(entropy(&x).sign(), Sign::Unknown);
}

#[test]
fn test_norm_dcp_rules() {
    let x = variable(3);
    let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 1.0, -1.0]);
    // norm of affine is convex
    assert!(norm2(&a * &x - vec![1.0, 1.0]).is_convex());
    // norm of convex argument needs a nonnegative one
    assert!(norm1(abs(&x)).is_convex());
    assert!(!norm2(square(&x) - 1.0).is_dcp());
    assert_eq!(norm_inf(&x).sign(), Sign::Nonnegative);
}

#[test]
fn test_sign_propagation() {
    let x = variable(3);
    let s = square(&x);
    assert_eq!(s.sign(), Sign::Nonnegative);
    assert_eq!((-&s).sign(), Sign::Nonpositive);
    assert_eq!((&s + 1.0).sign(), Sign::Nonnegative);
    assert_eq!((&s - 1.0).sign(), Sign::Unknown);
    assert_eq!(max2(&x, 0.0).sign(), Sign::Nonnegative);
    assert_eq!(min2(&x, 0.0).sign(), Sign::Nonpositive);
    assert_eq!(x.sign(), Sign::Unknown);
}

#[test]
fn test_multiplication_rules() {
    let x = variable(3);
    let c = constant_vec(vec![1.0, 2.0, 3.0]);
    assert!(multiply(&c, square(&x)).is_convex());
    assert!(multiply(-&c, square(&x)).is_concave());
    // product of two variables is not DCP
    assert!(!multiply(&x, &x).is_dcp());
    assert!(!(transpose(&x) * &x).is_dcp());
}

#[test]
fn test_quad_form_curvature_by_matrix() {
    let x = variable(2);
    let psd = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
    let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
    assert_eq!(quad_form(&x, psd.clone()).curvature(), Curvature::Convex);
    assert_eq!(quad_form(&x, -psd).curvature(), Curvature::Concave);
    assert!(!quad_form(&x, indefinite).is_dcp());
}

#[test]
fn test_affine_atoms_stay_affine() {
    let x = variable((2, 3));
    let exprs = vec![
        transpose(&x),
        reshape(&x, (3, 2)),
        flatten(&x),
        sum(&x),
        hstack(vec![x.clone(), x.clone()]),
        vstack(vec![x.clone(), 2.0 * &x]),
        index_with(&x, IndexSpec::new(Slice::single(0), Slice::new(0, 3, 2))),
        diag(flatten(&x)),
        trace(reshape(&x, (3, 2)) * &x),
    ];
    for (i, e) in exprs.iter().enumerate() {
        if i == exprs.len() - 1 {
            // variable times variable
            assert!(!e.is_dcp());
        } else {
            assert!(e.is_affine(), "expression {} should be affine", i);
        }
    }
}

#[test]
fn test_diag_dcp() {
    let x = variable(3);
    let d = diag(&x);
    assert_eq!(d.shape(), Shape::matrix(3, 3));
    assert!(d.is_affine());
    let m = variable((3, 3));
    assert_eq!(diag(&m).shape(), Shape::vector(3));
}

// ============================================================================
// Numeric evaluation
// ============================================================================

#[test]
fn test_numeric_values() {
    let x = constant_vec(vec![-1.0, 0.5, 2.0]);
    let v = |e: Expr| e.value().expect("constant expression has a value");

    assert_eq!(v(abs(&x)).as_slice(), &[1.0, 0.5, 2.0]);
    assert_eq!(v(pos(&x)).as_slice(), &[0.0, 0.5, 2.0]);
    assert_eq!(v(neg_part(&x)).as_slice(), &[1.0, 0.0, 0.0]);
    assert_eq!(v(square(&x)).as_slice(), &[1.0, 0.25, 4.0]);
    assert_eq!(v(norm1(&x))[0], 3.5);
    assert_eq!(v(norm_inf(&x))[0], 2.0);
    assert!((v(norm2(&x))[0] - 5.25_f64.sqrt()).abs() < 1e-12);
    assert_eq!(v(max_entries(&x))[0], 2.0);
    assert_eq!(v(min_entries(&x))[0], -1.0);
    assert_eq!(v(sum_squares(&x))[0], 5.25);
    assert!((v(quad_over_lin(&x, 2.0))[0] - 2.625).abs() < 1e-12);

    let p = constant_vec(vec![0.5, 0.25]);
    let h = v(sum(entropy(&p)))[0];
    let expected = -(0.5 * 0.5_f64.ln() + 0.25 * 0.25_f64.ln());
    assert!((h - expected).abs() < 1e-12);
}

#[test]
fn test_numeric_conv() {
    let k = constant_vec(vec![1.0, 1.0]);
    let x = constant_vec(vec![1.0, 2.0, 3.0]);
    let c = conv(&k, &x);
    assert_eq!(c.shape(), Shape::vector(4));
    assert_eq!(c.value().unwrap().as_slice(), &[1.0, 3.0, 5.0, 3.0]);
}

#[test]
fn test_numeric_matrix_atoms() {
    let a = constant_dmatrix(DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]));
    assert!((lambda_max(&a).value().unwrap()[0] - 3.0).abs() < 1e-9);
    assert!((lambda_min(&a).value().unwrap()[0] - 1.0).abs() < 1e-9);
    assert!((log_det(&a).value().unwrap()[0] - 3.0_f64.ln()).abs() < 1e-9);
    assert_eq!(trace(&a).value().unwrap()[0], 4.0);
    assert_eq!(diag(&a).value().unwrap().as_slice(), &[2.0, 2.0]);
}

#[test]
fn test_value_needs_leaf_values() {
    let x = variable(2);
    let e = norm2(&x) + 1.0;
    assert!(e.value().is_none());
    assert!(matches!(e.try_value(), Err(CvxError::MissingValue(_))));

    x.set_value(vec![3.0, 4.0]).unwrap();
    assert!((e.value().unwrap()[0] - 6.0).abs() < 1e-12);
}

// ============================================================================
// Shape checking
// ============================================================================

#[test]
fn test_shape_errors() {
    use cvxlin::atoms::{try_add, try_hstack, try_matmul, try_quad_form, try_reshape, try_trace};

    let x = variable(3);
    let y = variable(2);
    let m = variable((2, 3));

    assert!(matches!(try_add(&x, &y), Err(CvxError::ShapeMismatch { .. })));
    assert!(try_matmul(&m, &y).is_err());
    assert!(try_matmul(&m, &x).is_ok());
    assert!(try_reshape(&x, (2, 2)).is_err());
    assert!(try_trace(&m).is_err());
    assert!(try_hstack(vec![x.clone(), y.clone()]).is_err());
    assert!(try_quad_form(&x, DMatrix::<f64>::identity(2, 2)).is_err());
    // scalars broadcast
    assert!(try_add(&x, 1.0).is_ok());
}

#[test]
fn test_index_out_of_bounds() {
    use cvxlin::atoms::try_index_with;

    let x = variable(3);
    assert!(try_index_with(&x, IndexSpec::element(3, 0)).is_err());
    assert!(try_index_with(&x, IndexSpec::range(1, 3)).is_ok());
}

#[test]
fn test_psd_constraint_needs_square() {
    let m = variable((2, 3));
    assert!(Constraint::try_psd(&m).is_err());
    assert!(Constraint::try_psd(variable((2, 2))).is_ok());
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_parameter_sign_checked() {
    let p = ParameterBuilder::new(2).nonneg().build();
    assert!(matches!(
        p.set_value(vec![1.0, -1.0]),
        Err(CvxError::ParameterSign { .. })
    ));
    assert!(p.set_value(vec![1.0, 0.0]).is_ok());
    assert!(matches!(
        p.set_value(vec![1.0, 2.0, 3.0]),
        Err(CvxError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_parameter_sign_drives_curvature() {
    let x = variable(());
    let nonneg = ParameterBuilder::new(()).nonneg().build();
    let free = parameter(());
    assert!((&nonneg * square(&x)).is_convex());
    assert!(!(&free * square(&x)).is_dcp());
    assert!((&free * &x).is_affine());
}

#[test]
fn test_parameter_resolve_soft_threshold() {
    // minimize (x - 3)^2 + lambda |x|:
    // x = 3 - lambda/2 with value 3 lambda - lambda^2 / 4 while lambda < 6,
    // x = 0 with value 9 beyond.
    let x = variable(1);
    let lambda = ParameterBuilder::new(()).nonneg().name("lambda").build();
    let prob = Problem::minimize(sum_squares(&x - 3.0) + &lambda * norm1(&x)).build();
    assert!(prob.is_dcp());
    assert_eq!(prob.parameters().len(), 1);

    for (lam, x_opt, value) in [(2.0, 2.0, 5.0), (8.0, 0.0, 9.0)] {
        lambda.set_value(lam).unwrap();
        let solution = prob.solve().expect("Should solve");
        assert!(
            (solution.value.unwrap() - value).abs() < 1e-3,
            "lambda={}: expected {}, got {}",
            lam,
            value,
            solution.value.unwrap()
        );
        assert!((x.value().unwrap()[0] - x_opt).abs() < 1e-3);
    }
}
