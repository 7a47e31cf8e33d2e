//! Coefficient extraction: LinOp trees to sparse matrices.
//!
//! For an operator of size `s`, extraction yields one `s × size(x)` block per
//! variable `x` and an `s × 1` constant column, all acting on column-major
//! vectorizations. Duplicate keys may appear; [`super::LinExpr`] merges them.

use log::trace;
use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::error::{CvxError, Result};
use crate::expr::{Array, ExprId, IndexSpec, Shape};
use crate::sparse::{
    csc_diag, csc_kron_eye_left, csc_kron_eye_right, csc_matmul, csc_neg, csc_scale,
    csc_selection, dense_to_csc, Triplets,
};

use super::lin_op::{LinOp, LinOpKind};

/// What a coefficient block multiplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoeffKey {
    Var(ExprId),
    Constant,
}

/// One block of an extracted operator.
#[derive(Debug, Clone)]
pub struct CoeffTerm {
    pub key: CoeffKey,
    /// Shape of the variable (scalar for the constant column).
    pub shape: Shape,
    pub coeff: CscMatrix<f64>,
}

impl CoeffTerm {
    fn map(self, f: impl FnOnce(&CscMatrix<f64>) -> CscMatrix<f64>) -> Self {
        CoeffTerm {
            key: self.key,
            shape: self.shape,
            coeff: f(&self.coeff),
        }
    }
}

/// Extract the coefficient blocks of an operator.
///
/// # Errors
///
/// Fails if a parameter has no value or a constant operand contains a
/// variable.
pub fn get_coefficients(op: &LinOp) -> Result<Vec<CoeffTerm>> {
    let shape = op.shape();
    match op.kind() {
        LinOpKind::Variable(id) => Ok(vec![CoeffTerm {
            key: CoeffKey::Var(*id),
            shape,
            coeff: CscMatrix::identity(shape.size()),
        }]),
        LinOpKind::ScalarConst(_)
        | LinOpKind::DenseConst(_)
        | LinOpKind::SparseConst(_)
        | LinOpKind::Param(_) => {
            let value = const_value(op)?;
            Ok(vec![constant_term(&value.to_vec())])
        }
        LinOpKind::NoOp => Ok(vec![]),
        LinOpKind::Sum => {
            let mut out = Vec::new();
            for arg in op.args() {
                out.extend(get_coefficients(arg)?);
            }
            Ok(out)
        }
        LinOpKind::Neg => Ok(arg_terms(op)?
            .into_iter()
            .map(|t| t.map(csc_neg))
            .collect()),
        LinOpKind::Mul(lhs) => {
            let l = const_value(lhs)?;
            let arg = single_arg(op)?;
            let terms = get_coefficients(arg)?;
            if let Some(s) = l.as_scalar() {
                return Ok(scale_terms(terms, s));
            }
            let lhs_mat = if arg.shape().is_scalar() {
                // matrix times scalar: vec(L) scales the scalar
                dense_to_csc(&DMatrix::from_vec(l.size(), 1, l.to_vec()))
            } else {
                csc_kron_eye_left(arg.shape().cols, &l.to_csc())
            };
            Ok(left_apply(terms, &lhs_mat))
        }
        LinOpKind::RMul(rhs) => {
            let r = const_value(rhs)?;
            let arg = single_arg(op)?;
            let terms = get_coefficients(arg)?;
            if let Some(s) = r.as_scalar() {
                return Ok(scale_terms(terms, s));
            }
            let rhs_mat = if arg.shape().is_scalar() {
                dense_to_csc(&DMatrix::from_vec(r.size(), 1, r.to_vec()))
            } else {
                // vec(X R) = (Rᵀ ⊗ I_m) vec(X)
                csc_kron_eye_right(&r.to_csc().transpose(), arg.shape().rows)
            };
            Ok(left_apply(terms, &rhs_mat))
        }
        LinOpKind::MulElem(c) => {
            let c = const_value(c)?;
            let terms = arg_terms(op)?;
            Ok(left_apply(terms, &csc_diag(&c.to_vec())))
        }
        LinOpKind::Div(c) => {
            let c = const_value(c)?;
            let terms = arg_terms(op)?;
            if let Some(s) = c.as_scalar() {
                return Ok(scale_terms(terms, 1.0 / s));
            }
            let inv: Vec<f64> = c.to_vec().into_iter().map(|v| 1.0 / v).collect();
            Ok(left_apply(terms, &csc_diag(&inv)))
        }
        LinOpKind::Index(spec) => {
            let arg = single_arg(op)?;
            let select = index_selector(spec, &arg.shape());
            if let LinOpKind::Variable(id) = arg.kind() {
                trace!("index fast path for variable {}", id);
                return Ok(vec![CoeffTerm {
                    key: CoeffKey::Var(*id),
                    shape: arg.shape(),
                    coeff: select,
                }]);
            }
            Ok(left_apply(get_coefficients(arg)?, &select))
        }
        LinOpKind::Transpose => {
            let arg = single_arg(op)?;
            let perm = transpose_permutation(&arg.shape());
            Ok(left_apply(get_coefficients(arg)?, &perm))
        }
        LinOpKind::SumEntries => {
            let arg = single_arg(op)?;
            let n = arg.size();
            let ones = dense_to_csc(&DMatrix::from_element(1, n, 1.0));
            Ok(left_apply(get_coefficients(arg)?, &ones))
        }
        LinOpKind::Reshape => arg_terms(op),
        LinOpKind::Conv(kernel) => {
            let k = const_value(kernel)?.to_vec();
            let arg = single_arg(op)?;
            let toeplitz = conv_toeplitz(&k, arg.size());
            Ok(left_apply(get_coefficients(arg)?, &toeplitz))
        }
    }
}

/// Numeric value of a constant operator.
///
/// Leaves are read directly; other constant trees are extracted and their
/// constant column reshaped to the operator's shape.
pub fn const_value(op: &LinOp) -> Result<Array> {
    match op.kind() {
        LinOpKind::ScalarConst(v) => Ok(Array::Scalar(*v)),
        LinOpKind::DenseConst(m) => Ok(Array::Dense(m.clone())),
        LinOpKind::SparseConst(m) => Ok(Array::Sparse(m.clone())),
        LinOpKind::Param(expr) => Ok(Array::Dense(expr.try_value()?)),
        _ => {
            let mut column = vec![0.0; op.size()];
            for term in get_coefficients(op)? {
                match term.key {
                    CoeffKey::Constant => {
                        for (r, _, v) in term.coeff.triplet_iter() {
                            column[r] += *v;
                        }
                    }
                    CoeffKey::Var(id) => {
                        return Err(CvxError::InvalidArgument(format!(
                            "expected a constant operand, found variable {}",
                            id
                        )))
                    }
                }
            }
            let shape = op.shape();
            Ok(Array::Dense(DMatrix::from_vec(shape.rows, shape.cols, column)))
        }
    }
}

fn single_arg(op: &LinOp) -> Result<&LinOp> {
    op.args().first().ok_or_else(|| {
        CvxError::InvalidProblem(format!("{} operator has no argument", op.kind().name()))
    })
}

fn arg_terms(op: &LinOp) -> Result<Vec<CoeffTerm>> {
    get_coefficients(single_arg(op)?)
}

fn constant_term(values: &[f64]) -> CoeffTerm {
    let mut triplets = Triplets::new();
    for (i, v) in values.iter().enumerate() {
        if *v != 0.0 {
            triplets.push(i, 0, *v);
        }
    }
    CoeffTerm {
        key: CoeffKey::Constant,
        shape: Shape::scalar(),
        coeff: triplets.build(values.len(), 1),
    }
}

fn scale_terms(terms: Vec<CoeffTerm>, s: f64) -> Vec<CoeffTerm> {
    terms.into_iter().map(|t| t.map(|c| csc_scale(c, s))).collect()
}

fn left_apply(terms: Vec<CoeffTerm>, m: &CscMatrix<f64>) -> Vec<CoeffTerm> {
    terms
        .into_iter()
        .map(|t| t.map(|c| csc_matmul(m, c)))
        .collect()
}

fn index_selector(spec: &IndexSpec, parent: &Shape) -> CscMatrix<f64> {
    csc_selection(&spec.linear_indices(parent), parent.size())
}

/// Permutation taking `vec(X)` to `vec(Xᵀ)` for `X` of shape `shape`.
pub(crate) fn transpose_permutation(shape: &Shape) -> CscMatrix<f64> {
    let (m, n) = (shape.rows, shape.cols);
    let mut triplets = Triplets::new();
    for i in 0..m {
        for j in 0..n {
            // Xᵀ[j, i] = X[i, j]
            triplets.push(i * n + j, j * m + i, 1.0);
        }
    }
    triplets.build(m * n, m * n)
}

/// Toeplitz matrix of full convolution with `kernel` on vectors of length `n`.
pub(crate) fn conv_toeplitz(kernel: &[f64], n: usize) -> CscMatrix<f64> {
    let m = kernel.len();
    let mut triplets = Triplets::new();
    for j in 0..n {
        for (i, k) in kernel.iter().enumerate() {
            if *k != 0.0 {
                triplets.push(i + j, j, *k);
            }
        }
    }
    triplets.build(m + n - 1, n)
}
