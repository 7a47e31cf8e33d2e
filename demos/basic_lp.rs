//! Basic Linear Programming Example
//!
//! A production-planning LP with shadow prices:
//!
//! maximize    c'x
//! subject to  Ax <= b, x >= 0
//!
//! The dual value of each resource constraint is the marginal profit of one
//! more unit of that resource.

use cvxlin::prelude::*;

fn main() {
    env_logger::init();
    println!("=== Basic Linear Program ===\n");

    println!("Problem: Maximize 3*x1 + 2*x2 + 5*x3");
    println!("Subject to:");
    println!("  2*x1 + x2 + 3*x3 <= 100");
    println!("  x1 + 2*x2 + x3 <= 80");
    println!("  x >= 0\n");

    let x = named_variable("x", 3);

    let c = constant_vec(vec![3.0, 2.0, 5.0]);
    // Column-major: column j holds the usage of product j.
    #[rustfmt::skip]
    let a = constant_matrix(vec![
        2.0, 1.0,
        1.0, 2.0,
        3.0, 1.0,
    ], 2, 3);
    let b = constant_vec(vec![100.0, 80.0]);

    let resources = matmul(&a, &x).leq(&b);
    let nonneg = x.geq(0.0);

    let problem = Problem::maximize(dot(&c, &x))
        .subject_to([resources.clone(), nonneg])
        .build();

    println!("Solving...");
    let solution = problem.solve().expect("Failed to solve");

    println!("\nResults:");
    println!("  Status: {:?} ({})", solution.status, solution.solver);
    println!("  Optimal profit: {:.4}", problem.value().unwrap());

    let x_val = x.value().expect("x is set after an optimal solve");
    for i in 0..3 {
        println!("  x{} = {:.4}", i + 1, x_val[(i, 0)]);
    }

    let prices = resources.dual_value().expect("duals are set after an optimal solve");
    println!("\nShadow prices:");
    println!("  resource 1: {:.4}", prices[(0, 0)]);
    println!("  resource 2: {:.4}", prices[(1, 0)]);
}
