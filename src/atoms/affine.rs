//! Affine atoms and operator overloading.
//!
//! Affine atoms are both convex and concave. They include:
//! - Addition, subtraction, negation
//! - Multiplication and division by constants
//! - Sum, reshape, index, stack operations
//! - Transpose, trace, diagonals and convolution
//!
//! Operators panic on incompatible shapes; every fallible function has a
//! `try_` twin returning [`Result`].

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::{CvxError, Result};
use crate::expr::{Expr, IndexSpec, IntoExpr, Shape};

use super::atom::Atom;

fn or_panic(r: Result<Expr>) -> Expr {
    r.unwrap_or_else(|e| panic!("{}", e))
}

// ============================================================================
// Arithmetic
// ============================================================================

/// `a + b` with scalar promotion.
pub fn try_add(a: impl IntoExpr, b: impl IntoExpr) -> Result<Expr> {
    Atom::Add.apply(vec![a.into_expr(), b.into_expr()])
}

/// `a - b` with scalar promotion.
pub fn try_sub(a: impl IntoExpr, b: impl IntoExpr) -> Result<Expr> {
    try_add(a, negate(b))
}

pub fn negate(x: impl IntoExpr) -> Expr {
    or_panic(Atom::Neg.apply(vec![x.into_expr()]))
}

/// Product `a * b`.
///
/// A constant left factor gives a left multiplication, a constant right
/// factor a right multiplication; scalars scale. The product of two
/// non-constant expressions can be built but is not DCP.
pub fn try_mul(a: impl IntoExpr, b: impl IntoExpr) -> Result<Expr> {
    let (a, b) = (a.into_expr(), b.into_expr());
    if a.is_constant() || !b.is_constant() {
        Atom::MulExpr.apply(vec![a, b])
    } else if b.is_scalar() {
        Atom::MulExpr.apply(vec![b, a])
    } else {
        Atom::RMulExpr.apply(vec![a, b])
    }
}

/// `x / c` for a scalar constant `c`.
pub fn try_div(x: impl IntoExpr, c: impl IntoExpr) -> Result<Expr> {
    let c = c.into_expr();
    if let Some(v) = c.constant_value().and_then(|a| a.as_scalar()) {
        if v == 0.0 {
            return Err(CvxError::InvalidArgument("division by zero".into()));
        }
    }
    Atom::DivExpr.apply(vec![x.into_expr(), c])
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $func:ident) => {
        impl<T: IntoExpr> $trait<T> for Expr {
            type Output = Expr;

            fn $method(self, rhs: T) -> Expr {
                or_panic($func(self, rhs))
            }
        }

        impl<T: IntoExpr> $trait<T> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: T) -> Expr {
                or_panic($func(self, rhs))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                or_panic($func(self, rhs))
            }
        }

        impl $trait<&Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                or_panic($func(self, rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, try_add);
impl_binary_op!(Sub, sub, try_sub);
impl_binary_op!(Mul, mul, try_mul);
impl_binary_op!(Div, div, try_div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        negate(self)
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        negate(self)
    }
}

// ============================================================================
// Affine atom functions
// ============================================================================

/// Sum of all elements.
pub fn sum(x: impl IntoExpr) -> Expr {
    or_panic(Atom::SumEntries.apply(vec![x.into_expr()]))
}

/// Column-major reshape.
pub fn reshape(x: impl IntoExpr, shape: impl Into<Shape>) -> Expr {
    or_panic(try_reshape(x, shape))
}

pub fn try_reshape(x: impl IntoExpr, shape: impl Into<Shape>) -> Result<Expr> {
    Atom::Reshape(shape.into()).apply(vec![x.into_expr()])
}

/// Flatten an expression to a column vector (column-major).
pub fn flatten(x: impl IntoExpr) -> Expr {
    let x = x.into_expr();
    let size = x.shape().size();
    reshape(x, Shape::vector(size))
}

pub fn transpose(x: impl IntoExpr) -> Expr {
    or_panic(Atom::Transpose.apply(vec![x.into_expr()]))
}

/// Matrix trace.
pub fn trace(x: impl IntoExpr) -> Expr {
    or_panic(try_trace(x))
}

pub fn try_trace(x: impl IntoExpr) -> Result<Expr> {
    Atom::Trace.apply(vec![x.into_expr()])
}

/// Vertical stack (row-wise concatenation).
pub fn vstack(exprs: Vec<Expr>) -> Expr {
    or_panic(try_vstack(exprs))
}

pub fn try_vstack(exprs: Vec<Expr>) -> Result<Expr> {
    Atom::VStack.apply(exprs)
}

/// Horizontal stack (column-wise concatenation).
pub fn hstack(exprs: Vec<Expr>) -> Expr {
    or_panic(try_hstack(exprs))
}

pub fn try_hstack(exprs: Vec<Expr>) -> Result<Expr> {
    Atom::HStack.apply(exprs)
}

/// Matrix-vector or matrix-matrix multiplication. Same as `a * b`.
pub fn matmul(a: impl IntoExpr, b: impl IntoExpr) -> Expr {
    or_panic(try_mul(a, b))
}

pub fn try_matmul(a: impl IntoExpr, b: impl IntoExpr) -> Result<Expr> {
    try_mul(a, b)
}

/// Inner product `aᵀ b` of two column vectors.
pub fn dot(a: impl IntoExpr, b: impl IntoExpr) -> Expr {
    or_panic(try_mul(transpose(a), b))
}

/// Elementwise product. One side must be constant for the result to be DCP.
pub fn multiply(a: impl IntoExpr, b: impl IntoExpr) -> Expr {
    or_panic(try_multiply(a, b))
}

pub fn try_multiply(a: impl IntoExpr, b: impl IntoExpr) -> Result<Expr> {
    let (a, b) = (a.into_expr(), b.into_expr());
    if !a.is_constant() && b.is_constant() {
        Atom::MulElemwise.apply(vec![b, a])
    } else {
        Atom::MulElemwise.apply(vec![a, b])
    }
}

/// Entry `i` of a column vector.
pub fn index(x: impl IntoExpr, i: usize) -> Expr {
    or_panic(try_index_with(x, IndexSpec::element(i, 0)))
}

/// Rows `start..stop` of a column vector.
pub fn slice(x: impl IntoExpr, start: usize, stop: usize) -> Expr {
    or_panic(try_index_with(x, IndexSpec::range(start, stop)))
}

/// General two-dimensional strided selection.
pub fn index_with(x: impl IntoExpr, spec: IndexSpec) -> Expr {
    or_panic(try_index_with(x, spec))
}

pub fn try_index_with(x: impl IntoExpr, spec: IndexSpec) -> Result<Expr> {
    Atom::Index(spec).apply(vec![x.into_expr()])
}

/// Square matrix with `x` on its diagonal.
pub fn diag_vec(x: impl IntoExpr) -> Expr {
    or_panic(Atom::DiagVec.apply(vec![x.into_expr()]))
}

/// Diagonal of a square matrix as a column vector.
pub fn diag_mat(x: impl IntoExpr) -> Expr {
    or_panic(Atom::DiagMat.apply(vec![x.into_expr()]))
}

/// `diag_vec` for vectors, `diag_mat` for square matrices.
pub fn diag(x: impl IntoExpr) -> Expr {
    or_panic(try_diag(x))
}

pub fn try_diag(x: impl IntoExpr) -> Result<Expr> {
    let x = x.into_expr();
    if x.shape().is_vector() {
        Atom::DiagVec.apply(vec![x])
    } else {
        Atom::DiagMat.apply(vec![x])
    }
}

/// Full 1-D convolution of a constant kernel with a column vector; the
/// result has length `len(kernel) + len(x) - 1`.
pub fn conv(kernel: impl IntoExpr, x: impl IntoExpr) -> Expr {
    or_panic(try_conv(kernel, x))
}

pub fn try_conv(kernel: impl IntoExpr, x: impl IntoExpr) -> Result<Expr> {
    Atom::Conv.apply(vec![kernel.into_expr(), x.into_expr()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcp::{Curvature, Sign};
    use crate::expr::{constant, constant_matrix, constant_vec, variable};
    use nalgebra::DMatrix;

    #[test]
    fn test_add() {
        let x = variable(5);
        let y = variable(5);
        let z = &x + &y;
        assert_eq!(z.shape(), Shape::vector(5));
        assert!(try_add(&x, variable(4)).is_err());
    }

    #[test]
    fn test_sub() {
        let x = variable(5);
        let y = variable(5);
        let z = &x - &y;
        assert_eq!(z.shape(), Shape::vector(5));
        let w = 1.0 - &x;
        assert_eq!(w.shape(), Shape::vector(5));
    }

    #[test]
    fn test_neg() {
        let x = variable(5);
        let z = -&x;
        assert_eq!(z.shape(), Shape::vector(5));
        assert_eq!((-constant(2.0)).sign(), Sign::Nonpositive);
    }

    #[test]
    #[should_panic]
    fn test_operator_panics_on_shape_error() {
        let _ = variable(3) + variable(2);
    }

    #[test]
    fn test_scalar_mul() {
        let x = variable(5);
        let z = 2.0 * &x;
        assert_eq!(z.shape(), Shape::vector(5));

        let z = &x * 2.0;
        assert_eq!(z.shape(), Shape::vector(5));
        assert!(matches!(z.atom(), Some(Atom::MulExpr)));
        assert!(z.is_affine());
    }

    #[test]
    fn test_right_multiplication() {
        let x = variable((2, 3));
        let b = constant_matrix(vec![1.0; 6], 3, 2);
        let z = &x * &b;
        assert_eq!(z.shape(), Shape::matrix(2, 2));
        assert!(matches!(z.atom(), Some(Atom::RMulExpr)));
        assert!(z.is_affine());
    }

    #[test]
    fn test_div() {
        let x = variable(3);
        let z = &x / 4.0;
        assert!(z.is_affine());
        assert!(try_div(&x, 0.0).is_err());
        assert!(try_div(&x, constant_vec(vec![1.0, 2.0, 3.0])).is_err());
    }

    #[test]
    fn test_sum() {
        let x = variable((3, 4));
        let s = sum(&x);
        assert_eq!(s.shape(), Shape::scalar());
    }

    #[test]
    fn test_transpose() {
        let x = variable((3, 4));
        let t = transpose(&x);
        assert_eq!(t.shape(), Shape::matrix(4, 3));
    }

    #[test]
    fn test_matmul() {
        let a = constant_matrix(vec![1.0; 12], 3, 4);
        let x = variable(4);
        let b = matmul(&a, &x);
        assert_eq!(b.shape(), Shape::vector(3));
        assert!(try_matmul(&a, variable(3)).is_err());
    }

    #[test]
    fn test_vstack() {
        let x = variable((2, 3));
        let y = variable((3, 3));
        let z = vstack(vec![x, y]);
        assert_eq!(z.shape(), Shape::matrix(5, 3));
        assert!(try_hstack(vec![variable((2, 3)), variable((3, 3))]).is_err());
        assert!(try_vstack(vec![]).is_err());
    }

    #[test]
    fn test_index_and_slice() {
        let x = variable(5);
        assert_eq!(index(&x, 2).shape(), Shape::scalar());
        assert_eq!(slice(&x, 1, 4).shape(), Shape::vector(3));
        assert!(try_index_with(&x, IndexSpec::range(3, 7)).is_err());
    }

    #[test]
    fn test_diag_and_conv() {
        let v = variable(3);
        assert_eq!(diag(&v).shape(), Shape::matrix(3, 3));
        let m = variable((3, 3));
        assert_eq!(diag(&m).shape(), Shape::vector(3));
        let c = conv(constant_vec(vec![1.0, 2.0]), &v);
        assert_eq!(c.shape(), Shape::vector(4));
        assert!(c.is_affine());
    }

    #[test]
    fn test_affine_is_affine() {
        let x = variable(5);
        let y = variable(5);

        let z = &x + &y;
        assert!(z.is_affine());

        let z = 2.0 * &x;
        assert!(z.is_affine());

        let s = sum(&x);
        assert!(s.is_affine());

        assert_eq!(multiply(&x, constant_vec(vec![1.0; 5])).curvature(), Curvature::Affine);
        assert_eq!(multiply(&x, &y).curvature(), Curvature::Unknown);
    }

    #[test]
    fn test_constant_value_evaluates() {
        let a = constant_matrix(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        let t = transpose(&a);
        assert_eq!(
            t.value().unwrap(),
            DMatrix::from_column_slice(2, 2, &[1.0, 3.0, 2.0, 4.0])
        );
        let s = sum(&a) / 2.0;
        assert_eq!(s.scalar_value(), Some(5.0));
    }
}
