//! Numeric values: scalars, dense and sparse matrices.

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::dcp::Sign;
use crate::error::{CvxError, Result};
use crate::sparse::{csc_to_dense, dense_to_csc};

use super::index::IndexSpec;
use super::shape::Shape;

/// Efficient array storage (dense or sparse).
#[derive(Debug, Clone)]
pub enum Array {
    /// Dense matrix storage.
    Dense(DMatrix<f64>),
    /// Sparse CSC matrix storage.
    Sparse(CscMatrix<f64>),
    /// Scalar value.
    Scalar(f64),
}

impl Array {
    /// All-zeros array of the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        if shape.is_scalar() {
            Array::Scalar(0.0)
        } else {
            Array::Dense(DMatrix::zeros(shape.rows, shape.cols))
        }
    }

    /// All-ones array of the given shape.
    pub fn ones(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        if shape.is_scalar() {
            Array::Scalar(1.0)
        } else {
            Array::Dense(DMatrix::from_element(shape.rows, shape.cols, 1.0))
        }
    }

    /// Sparse identity matrix.
    pub fn identity(n: usize) -> Self {
        Array::Sparse(CscMatrix::identity(n))
    }

    /// Get the shape of the array.
    pub fn shape(&self) -> Shape {
        match self {
            Array::Dense(m) => Shape::matrix(m.nrows(), m.ncols()),
            Array::Sparse(m) => Shape::matrix(m.nrows(), m.ncols()),
            Array::Scalar(_) => Shape::scalar(),
        }
    }

    /// Get the total number of elements.
    pub fn size(&self) -> usize {
        self.shape().size()
    }

    /// Try to get as a scalar value.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Array::Scalar(v) => Some(*v),
            Array::Dense(m) if m.nrows() == 1 && m.ncols() == 1 => Some(m[(0, 0)]),
            Array::Sparse(m) if m.nrows() == 1 && m.ncols() == 1 => {
                Some(m.values().iter().sum())
            }
            _ => None,
        }
    }

    /// Dense copy of the value.
    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            Array::Scalar(v) => DMatrix::from_element(1, 1, *v),
            Array::Dense(m) => m.clone(),
            Array::Sparse(m) => csc_to_dense(m),
        }
    }

    /// Sparse copy of the value.
    pub fn to_csc(&self) -> CscMatrix<f64> {
        match self {
            Array::Sparse(m) => m.clone(),
            other => dense_to_csc(&other.to_dense()),
        }
    }

    /// Column-major vectorization.
    pub fn to_vec(&self) -> Vec<f64> {
        self.to_dense().as_slice().to_vec()
    }

    /// Sign of the value: the tightest sign every entry satisfies.
    pub fn sign(&self) -> Sign {
        match self {
            Array::Scalar(v) => Sign::of_values([*v]),
            Array::Dense(m) => Sign::of_values(m.iter().copied()),
            // Implicit zeros are both nonnegative and nonpositive.
            Array::Sparse(m) => Sign::of_values(m.values().iter().copied()),
        }
    }

    /// Check if all elements are non-negative.
    pub fn is_nonneg(&self) -> bool {
        self.sign().is_nonneg()
    }

    /// Check if all elements are non-positive.
    pub fn is_nonpos(&self) -> bool {
        self.sign().is_nonpos()
    }

    /// Column-major reshape.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<Array> {
        let shape = shape.into();
        if shape.size() != self.size() {
            return Err(CvxError::ShapeMismatch {
                expected: format!("{} elements", self.size()),
                got: shape.to_string(),
            });
        }
        let data = self.to_vec();
        Ok(Array::Dense(DMatrix::from_vec(shape.rows, shape.cols, data)))
    }

    /// Strided sub-array.
    pub fn slice(&self, spec: &IndexSpec) -> Result<Array> {
        let parent = self.shape();
        spec.validate(&parent)?;
        let data = self.to_vec();
        let picked: Vec<f64> = spec
            .linear_indices(&parent)
            .into_iter()
            .map(|k| data[k])
            .collect();
        let shape = spec.shape();
        Ok(Array::Dense(DMatrix::from_vec(shape.rows, shape.cols, picked)))
    }

    /// Create from a scalar.
    pub fn from_scalar(v: f64) -> Self {
        Array::Scalar(v)
    }

    /// Create a column vector.
    pub fn from_vec(v: Vec<f64>) -> Self {
        let n = v.len();
        Array::Dense(DMatrix::from_vec(n, 1, v))
    }

    /// Create from a dense matrix.
    pub fn from_matrix(m: DMatrix<f64>) -> Self {
        Array::Dense(m)
    }
}

impl From<f64> for Array {
    fn from(v: f64) -> Self {
        Array::Scalar(v)
    }
}

impl From<Vec<f64>> for Array {
    fn from(v: Vec<f64>) -> Self {
        Array::from_vec(v)
    }
}

impl From<DMatrix<f64>> for Array {
    fn from(m: DMatrix<f64>) -> Self {
        Array::Dense(m)
    }
}

impl From<CscMatrix<f64>> for Array {
    fn from(m: CscMatrix<f64>) -> Self {
        Array::Sparse(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::index::Slice;

    #[test]
    fn test_shape_and_sign() {
        assert_eq!(Array::Scalar(3.0).shape(), Shape::scalar());
        assert_eq!(Array::Scalar(-3.0).sign(), Sign::Nonpositive);
        assert_eq!(Array::zeros((2, 2)).sign(), Sign::Zero);
        assert_eq!(Array::from_vec(vec![1.0, -1.0]).sign(), Sign::Unknown);
        assert_eq!(Array::identity(3).sign(), Sign::Nonnegative);
    }

    #[test]
    fn test_reshape_is_column_major() {
        let a = Array::from_matrix(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]));
        let v = a.reshape(4).unwrap();
        assert_eq!(v.to_vec(), vec![1.0, 3.0, 2.0, 4.0]);
        assert!(a.reshape(3).is_err());
    }

    #[test]
    fn test_slice() {
        let a = Array::from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let s = a.slice(&IndexSpec::new(Slice::new(1, 5, 2), 0)).unwrap();
        assert_eq!(s.to_vec(), vec![1.0, 3.0]);
    }
}
