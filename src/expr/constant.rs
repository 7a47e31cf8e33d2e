//! Constant expression creation.

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use super::array::Array;
use super::expression::Expr;
use super::shape::Shape;

/// Create a constant expression from a scalar.
pub fn constant(value: f64) -> Expr {
    Expr::new_constant(Array::Scalar(value))
}

/// Create a constant column vector.
pub fn constant_vec(values: Vec<f64>) -> Expr {
    Expr::new_constant(Array::from_vec(values))
}

/// Create a constant matrix from column-major data.
pub fn constant_matrix(values: Vec<f64>, rows: usize, cols: usize) -> Expr {
    Expr::new_constant(Array::Dense(DMatrix::from_vec(rows, cols, values)))
}

/// Create a constant expression from a nalgebra DMatrix.
pub fn constant_dmatrix(matrix: DMatrix<f64>) -> Expr {
    Expr::new_constant(Array::Dense(matrix))
}

/// Create a constant expression from a sparse CSC matrix.
pub fn constant_sparse(matrix: CscMatrix<f64>) -> Expr {
    Expr::new_constant(Array::Sparse(matrix))
}

/// Create a zero constant with the given shape.
pub fn zeros(shape: impl Into<Shape>) -> Expr {
    Expr::new_constant(Array::zeros(shape))
}

/// Create a ones constant with the given shape.
pub fn ones(shape: impl Into<Shape>) -> Expr {
    Expr::new_constant(Array::ones(shape))
}

/// Create an identity matrix constant.
pub fn eye(n: usize) -> Expr {
    Expr::new_constant(Array::identity(n))
}

/// Conversion of raw values (and expressions) into expressions.
///
/// Atom constructors and constraint helpers accept anything implementing
/// this trait, so `x.leq(1.0)` and `x.leq(&y)` both work.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

impl IntoExpr for f64 {
    fn into_expr(self) -> Expr {
        constant(self)
    }
}

impl IntoExpr for i32 {
    fn into_expr(self) -> Expr {
        constant(self as f64)
    }
}

impl IntoExpr for Vec<f64> {
    fn into_expr(self) -> Expr {
        constant_vec(self)
    }
}

impl IntoExpr for &[f64] {
    fn into_expr(self) -> Expr {
        constant_vec(self.to_vec())
    }
}

impl IntoExpr for DMatrix<f64> {
    fn into_expr(self) -> Expr {
        constant_dmatrix(self)
    }
}

impl IntoExpr for &DMatrix<f64> {
    fn into_expr(self) -> Expr {
        constant_dmatrix(self.clone())
    }
}

impl IntoExpr for CscMatrix<f64> {
    fn into_expr(self) -> Expr {
        constant_sparse(self)
    }
}

impl IntoExpr for Array {
    fn into_expr(self) -> Expr {
        Expr::new_constant(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcp::Sign;

    #[test]
    fn test_constant_scalar() {
        let c = constant(5.0);
        assert_eq!(c.constant_value().and_then(|a| a.as_scalar()), Some(5.0));
        assert_eq!(c.sign(), Sign::Nonnegative);
    }

    #[test]
    fn test_constant_vec() {
        let c = constant_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(c.shape(), Shape::matrix(3, 1));
    }

    #[test]
    fn test_constant_matrix_is_column_major() {
        let c = constant_matrix(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        assert_eq!(c.value().unwrap()[(0, 1)], 3.0);
    }

    #[test]
    fn test_zeros() {
        let z = zeros((3, 4));
        assert_eq!(z.shape(), Shape::matrix(3, 4));
        assert_eq!(z.sign(), Sign::Zero);
    }

    #[test]
    fn test_ones_and_eye() {
        assert_eq!(ones(5).shape(), Shape::matrix(5, 1));
        assert_eq!(eye(3).shape(), Shape::matrix(3, 3));
        assert_eq!(eye(3).sign(), Sign::Nonnegative);
    }

    #[test]
    fn test_into_expr() {
        assert!(5.0_f64.into_expr().is_constant());
        assert_eq!(vec![1.0, 2.0].into_expr().shape(), Shape::vector(2));
        assert_eq!((-1_i32).into_expr().sign(), Sign::Nonpositive);
    }
}
