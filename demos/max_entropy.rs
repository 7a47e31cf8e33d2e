//! Maximum Entropy Example
//!
//! maximize    sum(entropy(p))
//! subject to  sum(p) = 1, E[f] = m
//!
//! The optimum is a Gibbs distribution; the exponential cone constraints
//! come from the `entropy` atom.

use cvxlin::prelude::*;

fn main() {
    env_logger::init();
    println!("=== Maximum Entropy Distribution ===\n");

    let outcomes = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let n = outcomes.len();
    let f = constant_vec(outcomes);

    let p = variable(n);
    for mean in [3.5, 4.5] {
        let solution = Problem::maximize(sum(entropy(&p)))
            .subject_to([
                constraint!((sum(&p)) == 1.0),
                dot(&f, &p).equals(mean),
                p.geq(0.0),
            ])
            .solve()
            .expect("Failed to solve");

        println!("Die with mean {} ({:?}):", mean, solution.status);
        let probs = &solution[&p];
        for i in 0..n {
            println!("  P({}) = {:.4}", i + 1, probs[(i, 0)]);
        }
        println!("  Entropy: {:.4} nats\n", solution.value.unwrap());
    }
}
