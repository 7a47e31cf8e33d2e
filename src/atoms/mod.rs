//! Atom functions for building expressions.
//!
//! Atoms are the building blocks of optimization problems. They include:
//!
//! - **Affine atoms**: Operations that preserve linearity (add, mul, sum, reshape, etc.)
//! - **Nonlinear atoms**: Operations with specific curvature (norms, quadratic forms, etc.)
//!
//! Every atom is a variant of the closed [`Atom`] enum; the functions below
//! are the public constructors.

pub mod affine;
pub mod atom;
mod graph;
pub mod nonlinear;

pub use atom::Atom;

// Re-export affine operations
pub use affine::{
    conv, diag, diag_mat, diag_vec, dot, flatten, hstack, index, index_with, matmul, multiply,
    negate, reshape, slice, sum, trace, transpose, try_add, try_conv, try_diag, try_div,
    try_hstack, try_index_with, try_matmul, try_mul, try_multiply, try_reshape, try_sub,
    try_trace, try_vstack, vstack,
};

// Re-export nonlinear atoms
pub use nonlinear::{
    abs, entropy, exp, lambda_max, lambda_min, log, log_det, max2, max_entries, maximum, min2,
    min_entries, minimum, neg_part, norm, norm1, norm2, norm_inf, pos, quad_form, quad_over_lin,
    sqrt, square, sum_squares, try_lambda_max, try_lambda_min, try_log_det, try_maximum,
    try_minimum, try_norm, try_quad_form, try_quad_over_lin,
};
