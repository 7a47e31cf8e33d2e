//! LASSO (L1-Regularized Regression) Example
//!
//! minimize    ||Ax - b||_2^2 + lambda * ||x||_1
//!
//! `lambda` is a parameter: the problem is built once and re-solved for
//! each regularization weight. Larger weights give sparser solutions.

use cvxlin::prelude::*;

fn main() {
    env_logger::init();
    println!("=== LASSO Regression ===\n");

    // Sparse regression problem: only 3 out of 8 coefficients are important
    #[rustfmt::skip]
    let a = constant_dmatrix(nalgebra::DMatrix::from_row_slice(6, 8, &[
        1.0, 0.5, 0.2, 0.8, 0.1, 0.3, 0.4, 0.6,
        0.8, 0.3, 0.1, 0.9, 0.2, 0.4, 0.3, 0.7,
        0.6, 0.4, 0.3, 0.7, 0.3, 0.2, 0.5, 0.5,
        0.9, 0.2, 0.4, 0.6, 0.1, 0.5, 0.2, 0.8,
        0.7, 0.6, 0.2, 0.5, 0.4, 0.1, 0.6, 0.4,
        0.5, 0.1, 0.5, 0.4, 0.2, 0.6, 0.1, 0.9,
    ]));

    // Generated from y = 3*x1 + 2*x4 + 1*x8
    let b = constant_vec(vec![5.2, 4.9, 3.7, 4.7, 3.5, 3.2]);

    println!("Problem: Recover sparse coefficients (6 samples, 8 features)");
    println!("True model: y = 3*x1 + 2*x4 + 1*x8\n");

    let x = variable(8);
    let lambda = ParameterBuilder::new(()).name("lambda").nonneg().build();
    let objective = sum_squares(&a * &x - &b) + &lambda * norm1(&x);
    let problem = Problem::minimize(objective).build();

    for weight in [0.0, 0.1, 0.5, 1.0] {
        lambda.set_value(weight).expect("lambda is a nonnegative scalar");
        let solution = problem.solve().expect("Failed to solve");

        println!("--- lambda = {} ({:?}) ---", weight, solution.status);
        let x_vals = &solution[&x];
        let mut nonzeros = 0;
        for i in 0..8 {
            let val = x_vals[(i, 0)];
            let marker = if val.abs() > 0.1 {
                nonzeros += 1;
                " <--"
            } else {
                ""
            };
            println!("  x{}: {:.6}{}", i + 1, val, marker);
        }
        println!(
            "  Objective: {:.6}, {} coefficients above 0.1\n",
            solution.value.unwrap(),
            nonzeros
        );
    }
}
