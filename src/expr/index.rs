//! Strided two-dimensional index specifications.

use std::ops::Range;

use crate::error::{CvxError, Result};

use super::shape::Shape;

/// A strided range `start..stop` taking every `step`-th entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl Slice {
    pub fn new(start: usize, stop: usize, step: usize) -> Self {
        Slice { start, stop, step }
    }

    /// The single entry `i`.
    pub fn single(i: usize) -> Self {
        Slice::new(i, i + 1, 1)
    }

    /// The whole dimension of length `n`.
    pub fn full(n: usize) -> Self {
        Slice::new(0, n, 1)
    }

    /// Number of selected entries.
    pub fn len(&self) -> usize {
        if self.stop <= self.start || self.step == 0 {
            0
        } else {
            (self.stop - self.start).div_ceil(self.step)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selected positions, in order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (self.start..self.stop).step_by(self.step.max(1))
    }
}

impl From<Range<usize>> for Slice {
    fn from(r: Range<usize>) -> Self {
        Slice::new(r.start, r.end, 1)
    }
}

impl From<usize> for Slice {
    fn from(i: usize) -> Self {
        Slice::single(i)
    }
}

/// Row and column slices into a two-dimensional expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSpec {
    pub rows: Slice,
    pub cols: Slice,
}

impl IndexSpec {
    pub fn new(rows: impl Into<Slice>, cols: impl Into<Slice>) -> Self {
        IndexSpec {
            rows: rows.into(),
            cols: cols.into(),
        }
    }

    /// Create an index spec for a single element.
    pub fn element(row: usize, col: usize) -> Self {
        IndexSpec::new(row, col)
    }

    /// A range of rows of a column vector.
    pub fn range(start: usize, stop: usize) -> Self {
        IndexSpec::new(start..stop, 0)
    }

    /// Shape of the selection.
    pub fn shape(&self) -> Shape {
        Shape::matrix(self.rows.len(), self.cols.len())
    }

    /// Check the selection is nonempty and fits inside `parent`.
    pub fn validate(&self, parent: &Shape) -> Result<()> {
        let check = |s: &Slice, dim: usize, axis: &str| -> Result<()> {
            if s.step == 0 {
                return Err(CvxError::InvalidArgument(format!(
                    "{} index step must be positive",
                    axis
                )));
            }
            if s.is_empty() || s.stop > dim {
                return Err(CvxError::InvalidArgument(format!(
                    "{} index {}..{} out of bounds for {} {}",
                    axis, s.start, s.stop, dim, axis
                )));
            }
            Ok(())
        };
        check(&self.rows, parent.rows, "row")?;
        check(&self.cols, parent.cols, "column")
    }

    /// Column-major linear positions (into `parent`) of the selected entries,
    /// in column-major order of the result.
    pub fn linear_indices(&self, parent: &Shape) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.rows.len() * self.cols.len());
        for j in self.cols.indices() {
            for i in self.rows.indices() {
                out.push(j * parent.rows + i);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_len() {
        assert_eq!(Slice::new(0, 5, 2).len(), 3);
        assert_eq!(Slice::new(1, 5, 2).len(), 2);
        assert_eq!(Slice::new(3, 3, 1).len(), 0);
        assert_eq!(Slice::new(0, 5, 2).indices().collect::<Vec<_>>(), vec![0, 2, 4]);
    }

    #[test]
    fn test_linear_indices() {
        let parent = Shape::matrix(3, 2);
        let spec = IndexSpec::new(Slice::new(0, 3, 2), 0..2);
        assert_eq!(spec.shape(), Shape::matrix(2, 2));
        assert_eq!(spec.linear_indices(&parent), vec![0, 2, 3, 5]);
    }

    #[test]
    fn test_validate() {
        let parent = Shape::vector(4);
        assert!(IndexSpec::range(1, 4).validate(&parent).is_ok());
        assert!(IndexSpec::range(1, 5).validate(&parent).is_err());
        assert!(IndexSpec::element(0, 1).validate(&parent).is_err());
        assert!(IndexSpec::new(Slice::new(0, 2, 0), 0).validate(&parent).is_err());
    }
}
