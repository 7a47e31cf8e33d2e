//! Portfolio Optimization Example
//!
//! Markowitz portfolio optimization:
//!
//! minimize    x' Σ x                (minimize risk)
//! subject to  μ' x >= target        (minimum return)
//!             sum(x) = 1            (fully invested)
//!             x >= 0                (long-only)
//!
//! The target is a parameter, so the efficient frontier reuses one problem.
//! The dual of the return constraint is the marginal variance of raising
//! the target.

use cvxlin::prelude::*;

fn main() {
    env_logger::init();
    println!("=== Portfolio Optimization ===\n");

    let mu = constant_vec(vec![0.12, 0.10, 0.07, 0.05]);

    #[rustfmt::skip]
    let sigma = constant_matrix(vec![
        0.04,  0.01,  0.00, -0.01,
        0.01,  0.03,  0.00,  0.00,
        0.00,  0.00,  0.02,  0.00,
        -0.01,  0.00,  0.00,  0.01,
    ], 4, 4);

    println!("Assets: A, B, C, D");
    println!("Expected returns: [12%, 10%, 7%, 5%]\n");

    let x = variable(4);
    let target = ParameterBuilder::new(()).name("target").nonneg().build();

    let min_return = dot(&mu, &x).geq(&target);
    let problem = Problem::minimize(quad_form(&x, &sigma))
        .subject_to([
            min_return.clone(),
            constraint!((sum(&x)) == 1.0),
            constraint!(x >= 0.0),
        ])
        .build();

    target.set_value(0.09).expect("target is a nonnegative scalar");
    problem.solve().expect("Failed to solve");

    println!("Optimal Portfolio (target 9%):");
    let portfolio = x.value().expect("solved");
    for (i, asset) in ["A", "B", "C", "D"].iter().enumerate() {
        println!("  Asset {}: {:.2}%", asset, portfolio[(i, 0)] * 100.0);
    }

    let variance = problem.value().unwrap();
    println!("\nPortfolio Statistics:");
    println!("  Risk (std dev): {:.2}%", variance.sqrt() * 100.0);
    if let Some(price) = min_return.dual_value() {
        println!("  Marginal variance per unit of return: {:.4}", price[(0, 0)]);
    }

    println!("\n--- Efficient Frontier ---\n");
    for level in [0.06, 0.08, 0.10, 0.12, 0.14] {
        target.set_value(level).expect("target is a nonnegative scalar");
        let solution = problem.solve().expect("Failed to solve");
        match solution.status {
            SolveStatus::Optimal => println!(
                "  Return: {:.1}%  ->  Risk: {:.2}%",
                level * 100.0,
                solution.value.unwrap().sqrt() * 100.0
            ),
            status => println!("  Return: {:.1}%  ->  {:?}", level * 100.0, status),
        }
    }
}
