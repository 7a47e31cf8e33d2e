//! # cvxlin
//!
//! A Rust implementation of Disciplined Convex Programming (DCP).
//!
//! cvxlin provides a domain-specific language for specifying convex optimization
//! problems in Rust, with automatic verification of convexity rules. Problems
//! are lowered to a linear-operator IR, extracted into sparse conic form and
//! solved with the Clarabel solver.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cvxlin::prelude::*;
//!
//! // Create variables
//! let x = variable(5);
//!
//! // Build and solve a least-squares problem
//! let a = constant_dmatrix(/* your matrix */);
//! let b = constant_vec(/* your vector */);
//!
//! let solution = Problem::minimize(sum_squares(&a * &x - &b))
//!     .subject_to([x.geq(0.0)])
//!     .solve()?;
//!
//! println!("Optimal value: {}", solution.value.unwrap());
//! println!("x = {}", x.value().unwrap());
//! ```
//!
//! ## DCP Rules
//!
//! cvxlin enforces Disciplined Convex Programming rules:
//!
//! - **Minimization** requires a **convex** objective
//! - **Maximization** requires a **concave** objective
//! - **Equality constraints** require **affine** expressions
//! - **Inequality constraints** `lhs <= rhs` require `lhs - rhs` **convex**
//! - **Semidefinite constraints** require an **affine** square matrix
//!
//! ## Supported Atoms
//!
//! ### Affine (both convex and concave)
//! - Arithmetic: `+`, `-`, `*` (constant factor), `/` (by scalar constant)
//! - Aggregation: `sum`, `trace`
//! - Structural: `reshape`, `flatten`, `transpose`, `vstack`, `hstack`, `index`, `slice`
//! - Linear algebra: `matmul`, `dot`, `multiply`, `diag`, `conv`
//!
//! ### Convex
//! - Norms: `norm1`, `norm2`, `norm_inf`
//! - Element-wise: `abs`, `pos`, `neg_part`, `square`, `exp`
//! - Aggregation: `maximum`, `max_entries`, `sum_squares`
//! - Quadratic: `quad_form` (with PSD matrix), `quad_over_lin`
//! - Matrix: `lambda_max`
//!
//! ### Concave
//! - Element-wise: `sqrt`, `log`, `entropy`
//! - Aggregation: `minimum`, `min_entries`
//! - Quadratic: `quad_form` (with NSD matrix)
//! - Matrix: `lambda_min`, `log_det`
//!
//! ## Architecture
//!
//! - **Expression DAG** of `Arc`-shared nodes with sign, curvature and shape
//!   fixed at construction
//! - **Canonicalization** to LinOp trees plus cone constraints, memoized per node
//! - **Coefficient extraction** into sparse blocks, or matrix-free evaluation
//! - **Backends** behind the [`solver::Backend`] trait; Clarabel by default
//!
//! Semidefinite cones need the `sdp` cargo feature (plus a BLAS/LAPACK
//! provider, e.g. `sdp-openblas`).

pub mod atoms;
pub mod canon;
pub mod constraints;
pub mod dcp;
pub mod error;
pub mod expr;
pub mod problem;
pub mod solver;
pub mod sparse;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use cvxlin::prelude::*;
/// ```
pub mod prelude {
    // Expression types
    pub use crate::expr::{
        constant, constant_dmatrix, constant_matrix, constant_sparse, constant_vec, eye,
        named_variable, ones, parameter, variable, zeros, Array, Expr, ExprId, IndexSpec,
        IntoExpr, ParameterBuilder, Shape, Slice, VariableBuilder,
    };

    // Atoms
    pub use crate::atoms::{
        abs, conv, diag, dot, entropy, exp, flatten, hstack, index, index_with, lambda_max,
        lambda_min, log, log_det, matmul, max2, max_entries, maximum, min2, min_entries,
        minimum, multiply, neg_part, norm, norm1, norm2, norm_inf, pos, quad_form,
        quad_over_lin, reshape, slice, sqrt, square, sum, sum_squares, trace, transpose,
        vstack,
    };

    // Constraints
    pub use crate::constraint;
    pub use crate::constraints::{Constraint, ConstraintExt};

    // DCP
    pub use crate::dcp::{Curvature, Sign};

    // Problem
    pub use crate::problem::{Objective, Problem, ProblemBuilder};

    // Solver
    pub use crate::solver::{Settings, Solution, SolveStatus, SolverKind};

    // Errors
    pub use crate::error::{CvxError, Result};
}

// Re-export main types at crate root
pub use error::{CvxError, Result};
pub use problem::Problem;
pub use solver::{Solution, SolveStatus};
