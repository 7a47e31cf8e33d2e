//! Canonicalization tests: the three interpreters of an affine expression
//! (direct evaluation, extracted coefficients, matrix-free operator) agree,
//! and assembled problem data matches the matrix-free operator.

use std::collections::{BTreeMap, HashMap};

use cvxlin::canon::matrix_free::ValueMap;
use cvxlin::canon::{mul, tmul, LinExpr, LinOpOperator};
use cvxlin::prelude::*;
use cvxlin::solver::ProblemData;
use nalgebra::{DMatrix, DVector};

const TOL: f64 = 1e-9;

fn assert_close(a: &[f64], b: &[f64], what: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", what);
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!(
            (x - y).abs() < TOL,
            "{}: entry {} differs ({} vs {})",
            what,
            i,
            x,
            y
        );
    }
}

/// A chain of affine atoms over a single matrix variable.
fn affine_chain(x: &Expr) -> Expr {
    let a = constant_matrix((1..=8).map(f64::from).collect(), 4, 2);
    let xt = transpose(x);
    let e1 = &a * x; // (4, 3)
    let e2 = reshape(&e1, (6, 2));
    let e3 = &e2 + &vstack(vec![xt.clone(), xt]);
    let e4 = index_with(&e3, IndexSpec::new(Slice::new(1, 6, 2), Slice::full(2)));
    &e4 * 2.0 - 1.0
}

#[test]
fn test_evaluation_agrees_with_coefficients() {
    let x = variable((2, 3));
    let x_val = DMatrix::from_column_slice(2, 3, &[1.0, -2.0, 0.5, 3.0, -1.5, 4.0]);
    x.set_value(x_val.clone()).unwrap();

    let e = affine_chain(&x);
    assert!(e.is_affine());
    assert_eq!(e.shape(), Shape::matrix(3, 2));

    let direct = e.value().expect("all leaves have values");

    let form = e.canonical_form().unwrap();
    assert!(form.constraints.is_empty());
    let lin = LinExpr::from_op(&form.expr).unwrap();
    let mut vecs: BTreeMap<ExprId, DVector<f64>> = BTreeMap::new();
    vecs.insert(x.id().unwrap(), DVector::from_column_slice(x_val.as_slice()));
    let extracted = lin.evaluate(&vecs);
    assert_close(direct.as_slice(), extracted.as_slice(), "coefficients");

    let mut values: ValueMap = HashMap::new();
    values.insert(x.id().unwrap(), x_val);
    let matrix_free = mul(&form.expr, &values).unwrap();
    assert_close(direct.as_slice(), matrix_free.as_slice(), "matrix-free");
}

#[test]
fn test_adjoint_identity_on_affine_chain() {
    let x = variable((2, 3));
    let e = affine_chain(&x);
    let form = e.canonical_form().unwrap();
    let id = x.id().unwrap();

    let x_val = DMatrix::from_column_slice(2, 3, &[0.3, 1.0, -0.7, 2.0, 0.1, -1.0]);
    let y_val = DMatrix::from_column_slice(3, 2, &[1.0, 2.0, -1.0, 0.5, 0.0, 3.0]);

    let mut values: ValueMap = HashMap::new();
    values.insert(id, x_val.clone());
    // <A x, y> must only see the linear part.
    let ax = mul(&form.expr, &values).unwrap()
        - mul(&form.expr, &HashMap::from([(id, DMatrix::zeros(2, 3))])).unwrap();
    let aty = tmul(&form.expr, &y_val).unwrap();

    let lhs: f64 = ax.iter().zip(y_val.iter()).map(|(a, b)| a * b).sum();
    let rhs: f64 = x_val.iter().zip(aty[&id].iter()).map(|(a, b)| a * b).sum();
    assert!((lhs - rhs).abs() < 1e-9, "<Ax, y> = {} but <x, A'y> = {}", lhs, rhs);
}

#[test]
fn test_canonical_form_is_cached() {
    let x = variable(3);
    let e = norm2(&x) + sum(&x);
    let first = e.canonical_form().unwrap() as *const _;
    let second = e.canonical_form().unwrap() as *const _;
    assert_eq!(first, second);

    // Clones share the node and therefore the cache.
    let clone = e.clone();
    assert_eq!(clone.canonical_form().unwrap() as *const _, first);
}

#[test]
fn test_problem_data_matches_matrix_free_operator() {
    let x = variable(3);
    let y = variable(2);
    let a = constant_matrix(vec![1.0, 0.0, 2.0, -1.0, 3.0, 1.0], 2, 3);
    let problem = Problem::minimize(sum(&x) + norm1(&y))
        .subject_to([
            (&a * &x).leq(&y),
            x.geq(constant_vec(vec![1.0, 2.0, 3.0])),
            norm2(&x).leq(10.0),
        ])
        .build();

    let (objective, buckets) = problem.canonicalize().unwrap();
    let formatted = buckets.format().unwrap();
    let data = ProblemData::build(&objective, &formatted).unwrap();

    let ops: Vec<_> = formatted.ineq.iter().map(|c| c.expr.clone()).collect();
    let operator = LinOpOperator::new(&ops, data.var_offsets.clone()).unwrap();

    // offset is the constant part, h is its negation
    let neg_h: Vec<f64> = data.h.iter().map(|v| -v).collect();
    assert_close(operator.offset(), &neg_h, "offset");

    let n = data.num_vars();
    let probe: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin()).collect();
    let gx = operator.apply(&probe).unwrap();
    let mut expected = vec![0.0; data.g.nrows()];
    for (r, c, v) in data.g.triplet_iter() {
        expected[r] += v * probe[c];
    }
    assert_close(&gx, &expected, "G x");

    let w: Vec<f64> = (0..data.g.nrows()).map(|i| (i as f64 * 0.91).cos()).collect();
    let gtw = operator.apply_adjoint(&w).unwrap();
    let mut expected = vec![0.0; n];
    for (r, c, v) in data.g.triplet_iter() {
        expected[c] += v * w[r];
    }
    assert_close(&gtw, &expected, "G' w");
}

#[test]
fn test_parameter_folds_at_extraction() {
    let x = variable(2);
    let p = parameter(());
    let problem = Problem::minimize(sum(&x))
        .subject_to([x.geq(&p)])
        .build();

    assert!(matches!(
        problem.get_problem_data(None),
        Err(CvxError::MissingValue(_))
    ));

    p.set_value(2.0).unwrap();
    let data = problem.get_problem_data(None).unwrap();
    assert_eq!(data.h, vec![-2.0, -2.0]);

    p.set_value(-1.0).unwrap();
    let data = problem.get_problem_data(None).unwrap();
    assert_eq!(data.h, vec![1.0, 1.0]);
}
