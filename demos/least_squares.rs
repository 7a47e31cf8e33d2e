//! Least Squares Regression Example
//!
//! Fits a line to noisy data:
//!
//! minimize    ||Aw - b||_2^2
//!
//! then repeats the fit with a nonnegativity constraint and with an
//! l-infinity (minimax) loss for comparison.

use cvxlin::prelude::*;

fn main() {
    env_logger::init();
    println!("=== Least Squares Regression ===\n");

    // Fit y = w0 + w1*x; first column is the intercept.
    let a = constant_matrix(
        vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        5,
        2,
    );
    let b = constant_vec(vec![3.1, 5.2, 6.8, 9.1, 10.9]);

    println!("Fitting y = w0 + w1*x to 5 data points\n");

    let w = variable(2);
    let residual = &a * &w - &b;

    let solution = Problem::minimize(sum_squares(&residual))
        .solve()
        .expect("Failed to solve");
    report("Least squares", &solution, &w);

    let w_nn = variable(2);
    let solution = Problem::minimize(sum_squares(&a * &w_nn - &b))
        .constraint(constraint!(w_nn >= 0.0))
        .solve()
        .expect("Failed to solve");
    report("Nonnegative least squares", &solution, &w_nn);

    let w_inf = variable(2);
    let solution = Problem::minimize(norm_inf(&a * &w_inf - &b))
        .solve()
        .expect("Failed to solve");
    report("Minimax fit", &solution, &w_inf);
}

fn report(label: &str, solution: &Solution, w: &Expr) {
    println!("{}:", label);
    println!("  Status: {:?}", solution.status);
    println!("  Optimal value: {:.6}", solution.value.unwrap());
    let w_vals = &solution[w];
    println!("  w0 (intercept) = {:.6}", w_vals[(0, 0)]);
    println!("  w1 (slope) = {:.6}\n", w_vals[(1, 0)]);
}
