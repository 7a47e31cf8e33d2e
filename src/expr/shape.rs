//! Shape representation for expressions.
//!
//! Every expression is two-dimensional:
//! - a scalar is `(1, 1)`
//! - a vector of length n is the column `(n, 1)`
//! - a matrix is `(m, n)`
//!
//! Values are vectorized column-major throughout the crate.

use std::fmt;

use crate::error::{CvxError, Result};

/// Shape of an expression: number of rows and columns.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Default for Shape {
    fn default() -> Self {
        Shape::scalar()
    }
}

impl Shape {
    /// Create a scalar shape.
    pub const fn scalar() -> Self {
        Shape { rows: 1, cols: 1 }
    }

    /// Create a column vector shape.
    pub const fn vector(n: usize) -> Self {
        Shape { rows: n, cols: 1 }
    }

    /// Create a matrix shape.
    pub const fn matrix(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    /// Check if this is a scalar.
    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    /// Check if this is a row or column vector (scalars included).
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Check if this is a square matrix.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Get the transposed shape.
    pub fn transpose(&self) -> Self {
        Shape::matrix(self.cols, self.rows)
    }

    /// Result shape of elementwise addition.
    ///
    /// Shapes must match, except that a scalar is promoted to the other side.
    pub fn add(&self, other: &Shape) -> Result<Shape> {
        if self == other || other.is_scalar() {
            Ok(*self)
        } else if self.is_scalar() {
            Ok(*other)
        } else {
            Err(CvxError::ShapeMismatch {
                expected: self.to_string(),
                got: other.to_string(),
            })
        }
    }

    /// Result shape of adding several shapes left to right.
    pub fn sum<'a, I>(shapes: I) -> Result<Shape>
    where
        I: IntoIterator<Item = &'a Shape>,
    {
        let mut iter = shapes.into_iter();
        let first = *iter
            .next()
            .ok_or_else(|| CvxError::InvalidArgument("sum of no shapes".into()))?;
        iter.try_fold(first, |acc, s| acc.add(s))
    }

    /// Result shape of matrix multiplication `self * other`.
    ///
    /// A scalar on either side scales the other side.
    pub fn mul(&self, other: &Shape) -> Result<Shape> {
        if self.is_scalar() {
            Ok(*other)
        } else if other.is_scalar() {
            Ok(*self)
        } else if self.cols == other.rows {
            Ok(Shape::matrix(self.rows, other.cols))
        } else {
            Err(CvxError::ShapeMismatch {
                expected: format!("{} rows", self.cols),
                got: other.to_string(),
            })
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({}, {})", self.rows, self.cols)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

impl From<()> for Shape {
    fn from(_: ()) -> Self {
        Shape::scalar()
    }
}

impl From<usize> for Shape {
    fn from(n: usize) -> Self {
        Shape::vector(n)
    }
}

impl From<(usize,)> for Shape {
    fn from((n,): (usize,)) -> Self {
        Shape::vector(n)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((m, n): (usize, usize)) -> Self {
        Shape::matrix(m, n)
    }
}

impl From<[usize; 2]> for Shape {
    fn from([m, n]: [usize; 2]) -> Self {
        Shape::matrix(m, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Shape::from(()), Shape::scalar());
        assert_eq!(Shape::from(5), Shape::matrix(5, 1));
        assert_eq!(Shape::from((5,)), Shape::vector(5));
        assert_eq!(Shape::from((2, 3)).size(), 6);
        assert_eq!(Shape::scalar().size(), 1);
    }

    #[test]
    fn test_add() {
        let a = Shape::matrix(2, 3);
        assert_eq!(a.add(&a).unwrap(), a);
        assert_eq!(a.add(&Shape::scalar()).unwrap(), a);
        assert_eq!(Shape::scalar().add(&a).unwrap(), a);
        assert!(a.add(&Shape::matrix(3, 2)).is_err());
        assert!(Shape::vector(3).add(&Shape::vector(4)).is_err());
    }

    #[test]
    fn test_sum() {
        let shapes = [Shape::scalar(), Shape::vector(4), Shape::scalar()];
        assert_eq!(Shape::sum(&shapes).unwrap(), Shape::vector(4));
        assert!(Shape::sum(std::iter::empty::<&Shape>()).is_err());
    }

    #[test]
    fn test_mul() {
        let a = Shape::matrix(2, 3);
        let b = Shape::matrix(3, 4);
        assert_eq!(a.mul(&b).unwrap(), Shape::matrix(2, 4));
        assert_eq!(Shape::scalar().mul(&b).unwrap(), b);
        assert_eq!(a.mul(&Shape::scalar()).unwrap(), a);
        assert!(a.mul(&a).is_err());
    }

    #[test]
    fn test_transpose() {
        assert_eq!(Shape::vector(4).transpose(), Shape::matrix(1, 4));
        assert!(Shape::matrix(1, 4).is_vector());
        assert!(!Shape::matrix(2, 4).is_vector());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::matrix(2, 3)), "(2, 3)");
    }
}
