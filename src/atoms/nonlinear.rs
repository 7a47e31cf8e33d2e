//! Nonlinear atoms for convex optimization.
//!
//! These atoms have specific curvature properties (convex or concave)
//! and require DCP composition rules to be applied correctly.

use crate::dcp::PsdStatus;
use crate::error::{CvxError, Result};
use crate::expr::{Expr, IntoExpr};

use super::atom::Atom;

fn unary(atom: Atom, x: impl IntoExpr) -> Result<Expr> {
    atom.apply(vec![x.into_expr()])
}

fn or_panic(r: Result<Expr>) -> Expr {
    r.unwrap_or_else(|e| panic!("{}", e))
}

// ============================================================================
// Norms (all convex)
// ============================================================================

/// L1 norm: ||x||_1 = sum(|x_i|).
///
/// Properties:
/// - Curvature: Convex
/// - Sign: Non-negative
/// - Monotonicity: Increasing for x >= 0, decreasing for x <= 0
pub fn norm1(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Norm1, x))
}

/// L2 norm: ||x||_2 = sqrt(sum(x_i^2)). Matrices use all entries.
///
/// Properties:
/// - Curvature: Convex
/// - Sign: Non-negative
/// - Monotonicity: Increasing for x >= 0, decreasing for x <= 0
pub fn norm2(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Norm2, x))
}

/// Infinity norm: ||x||_inf = max(|x_i|).
pub fn norm_inf(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::NormInf, x))
}

/// General p-norm.
///
/// Currently supports p = 1, 2, or infinity.
///
/// # Panics
///
/// Panics if p is not 1, 2, or infinity. Use `try_norm()` for explicit error handling.
///
/// # Example
///
/// ```
/// use cvxlin::prelude::*;
///
/// let x = variable(5);
/// let n = norm(&x, 2.0);  // Same as norm2(&x)
/// assert!(n.is_convex());
/// ```
pub fn norm(x: impl IntoExpr, p: f64) -> Expr {
    try_norm(x, p).expect("unsupported norm p-value")
}

/// General p-norm, returning an error for unsupported p values.
///
/// # Errors
///
/// Returns an error if p is not 1, 2, or infinity.
pub fn try_norm(x: impl IntoExpr, p: f64) -> Result<Expr> {
    if p == 1.0 {
        unary(Atom::Norm1, x)
    } else if p == 2.0 {
        unary(Atom::Norm2, x)
    } else if p.is_infinite() && p > 0.0 {
        unary(Atom::NormInf, x)
    } else {
        Err(CvxError::InvalidArgument(format!(
            "norm p={} is not supported; use p=1, 2, or inf",
            p
        )))
    }
}

// ============================================================================
// Element-wise atoms
// ============================================================================

/// Absolute value: |x| (element-wise).
///
/// Properties:
/// - Curvature: Convex
/// - Sign: Non-negative
/// - Monotonicity: Increasing for x >= 0, decreasing for x <= 0
pub fn abs(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Abs, x))
}

/// Positive part: max(x, 0) (element-wise).
///
/// Properties:
/// - Curvature: Convex
/// - Sign: Non-negative
/// - Monotonicity: Increasing
pub fn pos(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Pos, x))
}

/// Negative part: max(-x, 0) (element-wise).
///
/// Properties:
/// - Curvature: Convex
/// - Sign: Non-negative
/// - Monotonicity: Decreasing
pub fn neg_part(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::NegPart, x))
}

/// Element-wise square.
pub fn square(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Square, x))
}

/// Exponential function (elementwise): exp(x)
///
/// Convex and increasing.
pub fn exp(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Exp, x))
}

/// Natural logarithm (elementwise): log(x)
///
/// Concave when x is concave (and positive).
pub fn log(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Log, x))
}

/// Entropy (elementwise): -x * log(x)
///
/// Concave when x is affine. The value at 0 is 0.
pub fn entropy(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Entropy, x))
}

/// Square root (elementwise).
///
/// Concave and increasing; the domain is x >= 0.
pub fn sqrt(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::Sqrt, x))
}

// ============================================================================
// Maximum and minimum
// ============================================================================

/// Element-wise maximum of expressions, with scalar promotion.
///
/// Properties:
/// - Curvature: Convex (when all arguments are convex)
/// - Sign: Non-negative if any argument is, non-positive if all are
/// - Monotonicity: Increasing in all arguments
pub fn maximum(exprs: Vec<Expr>) -> Expr {
    or_panic(try_maximum(exprs))
}

pub fn try_maximum(mut exprs: Vec<Expr>) -> Result<Expr> {
    if exprs.len() == 1 {
        return Ok(exprs.remove(0));
    }
    Atom::MaxElemwise.apply(exprs)
}

/// Maximum of two expressions.
pub fn max2(a: impl IntoExpr, b: impl IntoExpr) -> Expr {
    maximum(vec![a.into_expr(), b.into_expr()])
}

/// Element-wise minimum of expressions.
///
/// Concave when all arguments are concave.
pub fn minimum(exprs: Vec<Expr>) -> Expr {
    or_panic(try_minimum(exprs))
}

pub fn try_minimum(mut exprs: Vec<Expr>) -> Result<Expr> {
    if exprs.len() == 1 {
        return Ok(exprs.remove(0));
    }
    Atom::MinElemwise.apply(exprs)
}

/// Minimum of two expressions.
pub fn min2(a: impl IntoExpr, b: impl IntoExpr) -> Expr {
    minimum(vec![a.into_expr(), b.into_expr()])
}

/// Largest entry.
pub fn max_entries(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::MaxEntries, x))
}

/// Smallest entry.
pub fn min_entries(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::MinEntries, x))
}

// ============================================================================
// Quadratic atoms
// ============================================================================

/// Quadratic form: x' P x.
///
/// Properties:
/// - Curvature: Convex if P is PSD, Concave if P is NSD
/// - Sign: Non-negative if P is PSD, Non-positive if P is NSD
/// - Arguments: x must be affine, P must be a constant square matrix
///
/// # Panics
///
/// Panics where [`try_quad_form`] returns an error.
pub fn quad_form(x: impl IntoExpr, p: impl IntoExpr) -> Expr {
    or_panic(try_quad_form(x, p))
}

/// Quadratic form, returning an error for a non-constant or mis-shaped `P`.
pub fn try_quad_form(x: impl IntoExpr, p: impl IntoExpr) -> Result<Expr> {
    let p = p.into_expr();
    if !p.is_constant() || p.has_parameters() {
        return Err(CvxError::InvalidArgument(
            "quad_form needs a constant matrix without parameters".into(),
        ));
    }
    let status = PsdStatus::of_matrix(&p.try_value()?);
    Atom::QuadForm(status).apply(vec![x.into_expr(), p])
}

/// Sum of squares: ||x||_2^2 = x' x.
///
/// Properties:
/// - Curvature: Convex
/// - Sign: Non-negative
/// - Monotonicity: Increasing for x >= 0, decreasing for x <= 0
pub fn sum_squares(x: impl IntoExpr) -> Expr {
    or_panic(unary(Atom::SumSquares, x))
}

/// Quadratic over linear: ||x||_2^2 / y.
///
/// Properties:
/// - Curvature: Convex (when x is affine and y is concave)
/// - Sign: Non-negative
/// - Domain: y > 0, scalar
///
/// This is a perspective function and is jointly convex in (x, y).
pub fn quad_over_lin(x: impl IntoExpr, y: impl IntoExpr) -> Expr {
    or_panic(try_quad_over_lin(x, y))
}

pub fn try_quad_over_lin(x: impl IntoExpr, y: impl IntoExpr) -> Result<Expr> {
    Atom::QuadOverLin.apply(vec![x.into_expr(), y.into_expr()])
}

// ============================================================================
// Matrix atoms
// ============================================================================

/// Largest eigenvalue of a symmetric matrix. Convex; needs SDP support.
pub fn lambda_max(a: impl IntoExpr) -> Expr {
    or_panic(try_lambda_max(a))
}

pub fn try_lambda_max(a: impl IntoExpr) -> Result<Expr> {
    unary(Atom::LambdaMax, a)
}

/// Smallest eigenvalue of a symmetric matrix. Concave; needs SDP support.
pub fn lambda_min(a: impl IntoExpr) -> Expr {
    or_panic(try_lambda_min(a))
}

pub fn try_lambda_min(a: impl IntoExpr) -> Result<Expr> {
    unary(Atom::LambdaMin, a)
}

/// `log det A` of a symmetric positive definite matrix.
///
/// Concave. Lowered through a semidefinite block constraint and exponential
/// cones, so it needs both SDP and exponential cone support.
pub fn log_det(a: impl IntoExpr) -> Expr {
    or_panic(try_log_det(a))
}

pub fn try_log_det(a: impl IntoExpr) -> Result<Expr> {
    unary(Atom::LogDet, a)
}
