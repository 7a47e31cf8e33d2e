//! Sparse matrix utilities.
//!
//! Helper functions for working with nalgebra-sparse matrices. Coefficient
//! matrices are assembled from triplets and combined with the operators
//! nalgebra-sparse provides.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Accumulates triplets and places whole blocks at offsets.
#[derive(Debug, Default, Clone)]
pub struct Triplets {
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
}

impl Triplets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries (duplicates counted separately).
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    pub fn push(&mut self, row: usize, col: usize, val: f64) {
        self.rows.push(row);
        self.cols.push(col);
        self.vals.push(val);
    }

    /// Add every entry of `block` shifted by (`row_offset`, `col_offset`).
    pub fn add_block(&mut self, row_offset: usize, col_offset: usize, block: &CscMatrix<f64>) {
        for (r, c, v) in block.triplet_iter() {
            self.push(row_offset + r, col_offset + c, *v);
        }
    }

    pub fn build(self, nrows: usize, ncols: usize) -> CscMatrix<f64> {
        csc_from_triplets(nrows, ncols, self.rows, self.cols, self.vals)
    }
}

/// Create a CSC identity matrix.
pub fn csc_identity(n: usize) -> CscMatrix<f64> {
    CscMatrix::identity(n)
}

/// Diagonal matrix with the given entries.
pub fn csc_diag(values: &[f64]) -> CscMatrix<f64> {
    let n = values.len();
    let idx: Vec<usize> = (0..n).collect();
    csc_from_triplets(n, n, idx.clone(), idx, values.to_vec())
}

/// Selection matrix `S` (`indices.len() × ncols`) with `S[i, indices[i]] = 1`.
pub fn csc_selection(indices: &[usize], ncols: usize) -> CscMatrix<f64> {
    let rows: Vec<usize> = (0..indices.len()).collect();
    csc_from_triplets(
        indices.len(),
        ncols,
        rows,
        indices.to_vec(),
        vec![1.0; indices.len()],
    )
}

/// Convert a dense matrix to CSC format.
pub fn dense_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut triplets = Triplets::new();
    for j in 0..dense.ncols() {
        for i in 0..dense.nrows() {
            let v = dense[(i, j)];
            if v != 0.0 {
                triplets.push(i, j, v);
            }
        }
    }
    triplets.build(dense.nrows(), dense.ncols())
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

/// Stack CSC matrices vertically. Column counts are padded to the widest.
pub fn csc_vstack(blocks: &[&CscMatrix<f64>]) -> CscMatrix<f64> {
    let ncols = blocks.iter().map(|b| b.ncols()).max().unwrap_or(0);
    let mut triplets = Triplets::new();
    let mut offset = 0;
    for block in blocks {
        triplets.add_block(offset, 0, block);
        offset += block.nrows();
    }
    triplets.build(offset, ncols)
}

/// Add two CSC matrices of equal shape.
pub fn csc_add(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut triplets = Triplets::new();
    triplets.add_block(0, 0, a);
    triplets.add_block(0, 0, b);
    triplets.build(a.nrows(), a.ncols())
}

/// Scale a CSC matrix.
pub fn csc_scale(a: &CscMatrix<f64>, scalar: f64) -> CscMatrix<f64> {
    let mut out = a.clone();
    for v in out.values_mut() {
        *v *= scalar;
    }
    out
}

/// Negate a CSC matrix.
pub fn csc_neg(a: &CscMatrix<f64>) -> CscMatrix<f64> {
    csc_scale(a, -1.0)
}

/// Sparse product `a * b`.
pub fn csc_matmul(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    a * b
}

/// Kronecker product `I_n ⊗ a` (block diagonal with `n` copies of `a`).
pub fn csc_kron_eye_left(n: usize, a: &CscMatrix<f64>) -> CscMatrix<f64> {
    let mut triplets = Triplets::new();
    for k in 0..n {
        triplets.add_block(k * a.nrows(), k * a.ncols(), a);
    }
    triplets.build(n * a.nrows(), n * a.ncols())
}

/// Kronecker product `a ⊗ I_m`.
pub fn csc_kron_eye_right(a: &CscMatrix<f64>, m: usize) -> CscMatrix<f64> {
    let mut triplets = Triplets::new();
    for (r, c, v) in a.triplet_iter() {
        for k in 0..m {
            triplets.push(r * m + k, c * m + k, *v);
        }
    }
    triplets.build(a.nrows() * m, a.ncols() * m)
}
