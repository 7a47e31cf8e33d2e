//! Constructors for LinOp trees and the constraints over them.
//!
//! Builders that combine shapes validate them and return `Result`; the
//! rest cannot fail. Concatenation and diagonal placement are expressed
//! as multiplication by constant placement matrices, so they never add
//! constraints.

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::error::{CvxError, Result};
use crate::expr::{Array, Expr, ExprId, IndexSpec, Shape, Slice};
use crate::sparse::Triplets;

use super::cone::{ConeConstraint, LinEqConstr, LinLeqConstr};
use super::lin_op::{LinOp, LinOpKind};

// ============================================================================
// Leaves
// ============================================================================

/// A variable leaf.
pub fn create_var(shape: Shape, id: ExprId) -> LinOp {
    LinOp::new(LinOpKind::Variable(id), shape, vec![])
}

/// A fresh auxiliary variable.
pub fn new_var(shape: Shape) -> LinOp {
    create_var(shape, ExprId::new())
}

/// A constant expression evaluated at extraction time.
pub fn create_param(expr: &Expr) -> LinOp {
    LinOp::new(LinOpKind::Param(expr.clone()), expr.shape(), vec![])
}

/// A constant leaf.
pub fn create_const(value: &Array) -> LinOp {
    match value {
        Array::Scalar(v) => scalar_const(*v),
        Array::Dense(m) => dense_const(m.clone()),
        Array::Sparse(m) => sparse_const(m.clone()),
    }
}

pub fn scalar_const(v: f64) -> LinOp {
    LinOp::new(LinOpKind::ScalarConst(v), Shape::scalar(), vec![])
}

pub fn dense_const(m: DMatrix<f64>) -> LinOp {
    if m.nrows() == 1 && m.ncols() == 1 {
        return scalar_const(m[(0, 0)]);
    }
    let shape = Shape::matrix(m.nrows(), m.ncols());
    LinOp::new(LinOpKind::DenseConst(m), shape, vec![])
}

pub fn sparse_const(m: CscMatrix<f64>) -> LinOp {
    let shape = Shape::matrix(m.nrows(), m.ncols());
    LinOp::new(LinOpKind::SparseConst(m), shape, vec![])
}

/// An operator contributing nothing.
pub fn no_op(shape: Shape) -> LinOp {
    LinOp::new(LinOpKind::NoOp, shape, vec![])
}

// ============================================================================
// Arithmetic
// ============================================================================

/// Sum of operators. Scalar terms are promoted to the common shape.
pub fn sum_expr(ops: &[LinOp]) -> Result<LinOp> {
    let shapes: Vec<Shape> = ops.iter().map(|op| op.shape()).collect();
    let shape = Shape::sum(&shapes)?;
    if ops.len() == 1 {
        return Ok(ops[0].clone());
    }
    let args = ops
        .iter()
        .map(|op| {
            if op.shape() != shape {
                promote(op, shape)
            } else {
                op.clone()
            }
        })
        .collect();
    Ok(LinOp::new(LinOpKind::Sum, shape, args))
}

pub fn neg_expr(op: &LinOp) -> LinOp {
    LinOp::new(LinOpKind::Neg, op.shape(), vec![op.clone()])
}

/// `lhs - rhs`.
pub fn sub_expr(lhs: &LinOp, rhs: &LinOp) -> Result<LinOp> {
    sum_expr(&[lhs.clone(), neg_expr(rhs)])
}

/// `lhs * rhs` where `lhs` is constant.
pub fn mul_expr(lhs: &LinOp, rhs: &LinOp) -> Result<LinOp> {
    let shape = lhs.shape().mul(&rhs.shape())?;
    Ok(LinOp::new(LinOpKind::Mul(lhs.clone()), shape, vec![rhs.clone()]))
}

/// `lhs * rhs` where `rhs` is constant.
pub fn rmul_expr(lhs: &LinOp, rhs: &LinOp) -> Result<LinOp> {
    let shape = lhs.shape().mul(&rhs.shape())?;
    Ok(LinOp::new(LinOpKind::RMul(rhs.clone()), shape, vec![lhs.clone()]))
}

/// Elementwise product `c ⊙ op` with a constant `c`.
pub fn mul_elemwise(c: &LinOp, op: &LinOp) -> Result<LinOp> {
    if c.shape().is_scalar() || op.shape().is_scalar() {
        return mul_expr(c, op);
    }
    if c.shape() != op.shape() {
        return Err(CvxError::ShapeMismatch {
            expected: op.shape().to_string(),
            got: c.shape().to_string(),
        });
    }
    Ok(LinOp::new(LinOpKind::MulElem(c.clone()), op.shape(), vec![op.clone()]))
}

/// Elementwise `op / c` with a constant `c` (scalar or of `op`'s shape).
pub fn div_expr(op: &LinOp, c: &LinOp) -> Result<LinOp> {
    if !c.shape().is_scalar() && c.shape() != op.shape() {
        return Err(CvxError::ShapeMismatch {
            expected: op.shape().to_string(),
            got: c.shape().to_string(),
        });
    }
    Ok(LinOp::new(LinOpKind::Div(c.clone()), op.shape(), vec![op.clone()]))
}

/// Broadcast a scalar operator to `shape` as `ones(shape) * op`.
pub fn promote(op: &LinOp, shape: Shape) -> LinOp {
    if shape.is_scalar() {
        return op.clone();
    }
    let ones = dense_const(DMatrix::from_element(shape.rows, shape.cols, 1.0));
    LinOp::new(LinOpKind::Mul(ones), shape, vec![op.clone()])
}

/// Sum of all entries.
pub fn sum_entries(op: &LinOp) -> LinOp {
    LinOp::new(LinOpKind::SumEntries, Shape::scalar(), vec![op.clone()])
}

// ============================================================================
// Structural
// ============================================================================

pub fn index(op: &LinOp, spec: &IndexSpec) -> Result<LinOp> {
    spec.validate(&op.shape())?;
    Ok(LinOp::new(
        LinOpKind::Index(spec.clone()),
        spec.shape(),
        vec![op.clone()],
    ))
}

/// Column-major reshape.
pub fn reshape(op: &LinOp, shape: Shape) -> Result<LinOp> {
    if op.shape().size() != shape.size() {
        return Err(CvxError::ShapeMismatch {
            expected: format!("{} elements", op.size()),
            got: shape.to_string(),
        });
    }
    if op.shape() == shape {
        return Ok(op.clone());
    }
    Ok(LinOp::new(LinOpKind::Reshape, shape, vec![op.clone()]))
}

/// Transpose.
///
/// Only a bare variable is transposed directly. Anything else is first
/// bound to a fresh variable through an equality constraint.
pub fn transpose(op: &LinOp) -> Result<(LinOp, Vec<ConeConstraint>)> {
    let shape = op.shape().transpose();
    if let LinOpKind::Variable(_) = op.kind() {
        return Ok((LinOp::new(LinOpKind::Transpose, shape, vec![op.clone()]), vec![]));
    }
    let aux = new_var(op.shape());
    let bind = create_eq(&aux, op)?;
    Ok((
        LinOp::new(LinOpKind::Transpose, shape, vec![aux]),
        vec![bind],
    ))
}

/// Full 1-D convolution of two column vectors, `kernel` constant.
pub fn conv(kernel: &LinOp, op: &LinOp) -> Result<LinOp> {
    let (k, x) = (kernel.shape(), op.shape());
    if k.cols != 1 || x.cols != 1 {
        return Err(CvxError::InvalidArgument(format!(
            "conv expects column vectors, got {} and {}",
            k, x
        )));
    }
    let shape = Shape::vector(k.rows + x.rows - 1);
    Ok(LinOp::new(LinOpKind::Conv(kernel.clone()), shape, vec![op.clone()]))
}

/// Column vector of the diagonal of a square operator.
pub fn diag_mat(op: &LinOp) -> Result<LinOp> {
    let shape = op.shape();
    if !shape.is_square() {
        return Err(CvxError::InvalidArgument(format!(
            "diagonal of non-square {}",
            shape
        )));
    }
    let n = shape.rows;
    let flat = reshape(op, Shape::vector(n * n))?;
    index(&flat, &IndexSpec::new(Slice::new(0, n * n, n + 1), 0))
}

/// Square matrix with the given vector on its diagonal.
pub fn diag_vec(op: &LinOp) -> Result<LinOp> {
    let shape = op.shape();
    if !shape.is_vector() {
        return Err(CvxError::InvalidArgument(format!(
            "diag_vec of non-vector {}",
            shape
        )));
    }
    let n = shape.size();
    let mut place = Triplets::new();
    for i in 0..n {
        place.push(i * (n + 1), i, 1.0);
    }
    let flat = reshape(op, Shape::vector(n))?;
    let placed = mul_expr(&sparse_const(place.build(n * n, n)), &flat)?;
    reshape(&placed, Shape::matrix(n, n))
}

/// Trace of a square operator.
pub fn trace(op: &LinOp) -> Result<LinOp> {
    Ok(sum_entries(&diag_mat(op)?))
}

/// Horizontal concatenation.
pub fn hstack(ops: &[LinOp]) -> Result<LinOp> {
    let first = ops
        .first()
        .ok_or_else(|| CvxError::InvalidArgument("hstack of nothing".into()))?;
    let rows = first.shape().rows;
    if let Some(bad) = ops.iter().find(|op| op.shape().rows != rows) {
        return Err(CvxError::ShapeMismatch {
            expected: format!("{} rows", rows),
            got: bad.shape().to_string(),
        });
    }
    let total_cols: usize = ops.iter().map(|op| op.shape().cols).sum();
    let total = rows * total_cols;

    // Column blocks are contiguous in column-major order.
    let mut offset = 0;
    let mut terms = Vec::with_capacity(ops.len());
    for op in ops {
        let size = op.size();
        let mut place = Triplets::new();
        for k in 0..size {
            place.push(offset + k, k, 1.0);
        }
        let flat = reshape(op, Shape::vector(size))?;
        terms.push(mul_expr(&sparse_const(place.build(total, size)), &flat)?);
        offset += size;
    }
    reshape(&sum_expr(&terms)?, Shape::matrix(rows, total_cols))
}

/// Vertical concatenation.
pub fn vstack(ops: &[LinOp]) -> Result<LinOp> {
    let first = ops
        .first()
        .ok_or_else(|| CvxError::InvalidArgument("vstack of nothing".into()))?;
    let cols = first.shape().cols;
    if let Some(bad) = ops.iter().find(|op| op.shape().cols != cols) {
        return Err(CvxError::ShapeMismatch {
            expected: format!("{} columns", cols),
            got: bad.shape().to_string(),
        });
    }
    let total_rows: usize = ops.iter().map(|op| op.shape().rows).sum();
    let total = total_rows * cols;

    let mut row_offset = 0;
    let mut terms = Vec::with_capacity(ops.len());
    for op in ops {
        let Shape { rows, .. } = op.shape();
        let mut place = Triplets::new();
        for c in 0..cols {
            for r in 0..rows {
                place.push(c * total_rows + row_offset + r, c * rows + r, 1.0);
            }
        }
        let flat = reshape(op, Shape::vector(op.size()))?;
        terms.push(mul_expr(&sparse_const(place.build(total, op.size())), &flat)?);
        row_offset += rows;
    }
    reshape(&sum_expr(&terms)?, Shape::matrix(total_rows, cols))
}

/// Interleave equally sized operators entry by entry:
/// `[a₀, b₀, …, a₁, b₁, …]` as a column vector.
pub fn interleave(ops: &[LinOp]) -> Result<LinOp> {
    let first = ops
        .first()
        .ok_or_else(|| CvxError::InvalidArgument("interleave of nothing".into()))?;
    let n = first.size();
    if let Some(bad) = ops.iter().find(|op| op.size() != n) {
        return Err(CvxError::ShapeMismatch {
            expected: format!("{} elements", n),
            got: bad.shape().to_string(),
        });
    }
    let k = ops.len();
    let mut terms = Vec::with_capacity(k);
    for (j, op) in ops.iter().enumerate() {
        let mut place = Triplets::new();
        for i in 0..n {
            place.push(i * k + j, i, 1.0);
        }
        let flat = reshape(op, Shape::vector(n))?;
        terms.push(mul_expr(&sparse_const(place.build(k * n, n)), &flat)?);
    }
    sum_expr(&terms)
}

// ============================================================================
// Constraints
// ============================================================================

/// `lhs == rhs` with a fresh id.
pub fn create_eq(lhs: &LinOp, rhs: &LinOp) -> Result<ConeConstraint> {
    Ok(ConeConstraint::Eq(LinEqConstr::new(
        sub_expr(lhs, rhs)?,
        ExprId::new(),
    )))
}

/// `lhs <= rhs` with a fresh id.
pub fn create_leq(lhs: &LinOp, rhs: &LinOp) -> Result<ConeConstraint> {
    Ok(ConeConstraint::Leq(LinLeqConstr::new(
        sub_expr(lhs, rhs)?,
        ExprId::new(),
    )))
}

/// `lhs >= rhs`, stored as `-lhs <= -rhs`.
pub fn create_geq(lhs: &LinOp, rhs: &LinOp) -> Result<ConeConstraint> {
    create_leq(&neg_expr(lhs), &neg_expr(rhs))
}

/// Variables of an operator tree with their shapes, sorted by id.
pub fn get_expr_vars(op: &LinOp) -> Vec<(ExprId, Shape)> {
    op.variables().into_iter().collect()
}
