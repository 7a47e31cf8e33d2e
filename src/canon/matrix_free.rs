//! Matrix-free evaluation of LinOp trees.
//!
//! [`mul`] applies an operator to variable values and [`tmul`] applies its
//! adjoint, without forming coefficient matrices. [`LinOpOperator`] stacks constraint operators into a single
//! linear map over the flat decision vector for iterative backends.

use std::collections::{BTreeMap, HashMap};

use nalgebra::DMatrix;

use crate::error::{CvxError, Result};
use crate::expr::{ExprId, Shape};

use super::coefficients::const_value;
use super::lin_op::{LinOp, LinOpKind};

/// Variable values keyed by id.
pub type ValueMap = HashMap<ExprId, DMatrix<f64>>;

/// Apply `op` to the given variable values. Missing variables count as zero.
pub fn mul(op: &LinOp, values: &ValueMap) -> Result<DMatrix<f64>> {
    let shape = op.shape();
    let out = match op.kind() {
        LinOpKind::Variable(id) => match values.get(id) {
            Some(v) => v.clone(),
            None => zeros(shape),
        },
        LinOpKind::ScalarConst(_)
        | LinOpKind::DenseConst(_)
        | LinOpKind::SparseConst(_)
        | LinOpKind::Param(_) => const_value(op)?.to_dense(),
        LinOpKind::NoOp => zeros(shape),
        LinOpKind::Sum => {
            let mut acc = zeros(shape);
            for arg in op.args() {
                acc += mul(arg, values)?;
            }
            acc
        }
        LinOpKind::Neg => -mul(arg(op)?, values)?,
        LinOpKind::Mul(lhs) => {
            let l = const_value(lhs)?.to_dense();
            let a = mul(arg(op)?, values)?;
            product(&l, &a)
        }
        LinOpKind::RMul(rhs) => {
            let r = const_value(rhs)?.to_dense();
            let a = mul(arg(op)?, values)?;
            product(&a, &r)
        }
        LinOpKind::MulElem(c) => {
            let c = const_value(c)?.to_dense();
            mul(arg(op)?, values)?.component_mul(&c)
        }
        LinOpKind::Div(c) => {
            let c = const_value(c)?.to_dense();
            let a = mul(arg(op)?, values)?;
            if is_scalar(&c) {
                a / c[(0, 0)]
            } else {
                a.component_div(&c)
            }
        }
        LinOpKind::Index(spec) => {
            let a = mul(arg(op)?, values)?;
            let parent = Shape::matrix(a.nrows(), a.ncols());
            let data = a.as_slice();
            let picked: Vec<f64> = spec
                .linear_indices(&parent)
                .into_iter()
                .map(|k| data[k])
                .collect();
            DMatrix::from_vec(shape.rows, shape.cols, picked)
        }
        LinOpKind::Transpose => mul(arg(op)?, values)?.transpose(),
        LinOpKind::SumEntries => DMatrix::from_element(1, 1, mul(arg(op)?, values)?.sum()),
        LinOpKind::Reshape => {
            let a = mul(arg(op)?, values)?;
            DMatrix::from_vec(shape.rows, shape.cols, a.as_slice().to_vec())
        }
        LinOpKind::Conv(kernel) => {
            let k = const_value(kernel)?.to_vec();
            let a = mul(arg(op)?, values)?;
            let full = convolve(&k, a.as_slice());
            DMatrix::from_vec(shape.rows, 1, full)
        }
    };
    Ok(out)
}

/// Apply the adjoint of `op` to `value` (of `op`'s shape).
///
/// Returns the contribution to every variable the tree touches; variables
/// reached along several paths are summed. Constant leaves contribute
/// nothing.
pub fn tmul(op: &LinOp, value: &DMatrix<f64>) -> Result<ValueMap> {
    let mut out = ValueMap::new();
    tmul_into(op, value, &mut out)?;
    Ok(out)
}

fn tmul_into(op: &LinOp, value: &DMatrix<f64>, out: &mut ValueMap) -> Result<()> {
    match op.kind() {
        LinOpKind::Variable(id) => {
            out.entry(*id)
                .and_modify(|acc| *acc += value)
                .or_insert_with(|| value.clone());
            Ok(())
        }
        LinOpKind::ScalarConst(_)
        | LinOpKind::DenseConst(_)
        | LinOpKind::SparseConst(_)
        | LinOpKind::Param(_)
        | LinOpKind::NoOp => Ok(()),
        LinOpKind::Sum => {
            for a in op.args() {
                tmul_into(a, value, out)?;
            }
            Ok(())
        }
        LinOpKind::Neg => tmul_into(arg(op)?, &-value, out),
        LinOpKind::Mul(lhs) => {
            let l = const_value(lhs)?.to_dense();
            let a = arg(op)?;
            let back = if is_scalar(&l) {
                value * l[(0, 0)]
            } else if a.shape().is_scalar() {
                DMatrix::from_element(1, 1, l.component_mul(value).sum())
            } else {
                l.transpose() * value
            };
            tmul_into(a, &back, out)
        }
        LinOpKind::RMul(rhs) => {
            let r = const_value(rhs)?.to_dense();
            let a = arg(op)?;
            let back = if is_scalar(&r) {
                value * r[(0, 0)]
            } else if a.shape().is_scalar() {
                DMatrix::from_element(1, 1, r.component_mul(value).sum())
            } else {
                value * r.transpose()
            };
            tmul_into(a, &back, out)
        }
        LinOpKind::MulElem(c) => {
            let c = const_value(c)?.to_dense();
            tmul_into(arg(op)?, &value.component_mul(&c), out)
        }
        LinOpKind::Div(c) => {
            let c = const_value(c)?.to_dense();
            let back = if is_scalar(&c) {
                value / c[(0, 0)]
            } else {
                value.component_div(&c)
            };
            tmul_into(arg(op)?, &back, out)
        }
        LinOpKind::Index(spec) => {
            let a = arg(op)?;
            let parent = a.shape();
            let mut back = zeros(parent);
            let slots = back.as_mut_slice();
            for (k, v) in spec.linear_indices(&parent).into_iter().zip(value.iter()) {
                slots[k] += v;
            }
            tmul_into(a, &back, out)
        }
        LinOpKind::Transpose => tmul_into(arg(op)?, &value.transpose(), out),
        LinOpKind::SumEntries => {
            let a = arg(op)?;
            let s = a.shape();
            tmul_into(a, &DMatrix::from_element(s.rows, s.cols, value[(0, 0)]), out)
        }
        LinOpKind::Reshape => {
            let a = arg(op)?;
            let s = a.shape();
            let back = DMatrix::from_vec(s.rows, s.cols, value.as_slice().to_vec());
            tmul_into(a, &back, out)
        }
        LinOpKind::Conv(kernel) => {
            let k = const_value(kernel)?.to_vec();
            let a = arg(op)?;
            let back = correlate(&k, value.as_slice(), a.size());
            tmul_into(a, &DMatrix::from_vec(a.size(), 1, back), out)
        }
    }
}

/// The constant part of `op` (its value with every variable at zero).
pub fn constant_term(op: &LinOp) -> Result<DMatrix<f64>> {
    mul(op, &ValueMap::new())
}

/// Drop variable-free subtrees, leaving the linear part of each operator.
///
/// Constant summands disappear; a wholly constant operator becomes a no-op
/// of the same shape. Constant operands of multiplications are kept.
pub fn prune_constants(ops: &[LinOp]) -> Vec<LinOp> {
    ops.iter().map(prune).collect()
}

fn prune(op: &LinOp) -> LinOp {
    if op.is_constant() {
        return LinOp::new(LinOpKind::NoOp, op.shape(), vec![]);
    }
    let args: Vec<LinOp> = match op.kind() {
        LinOpKind::Sum => op
            .args()
            .iter()
            .filter(|a| !a.is_constant())
            .map(prune)
            .collect(),
        _ => op.args().iter().map(prune).collect(),
    };
    LinOp::new(op.kind().clone(), op.shape(), args)
}

fn arg(op: &LinOp) -> Result<&LinOp> {
    op.args().first().ok_or_else(|| {
        CvxError::InvalidProblem(format!("{} operator has no argument", op.kind().name()))
    })
}

fn zeros(shape: Shape) -> DMatrix<f64> {
    DMatrix::zeros(shape.rows, shape.cols)
}

fn is_scalar(m: &DMatrix<f64>) -> bool {
    m.nrows() == 1 && m.ncols() == 1
}

/// Matrix product with scalar promotion on either side.
fn product(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    if is_scalar(a) {
        b * a[(0, 0)]
    } else if is_scalar(b) {
        a * b[(0, 0)]
    } else {
        a * b
    }
}

/// Full convolution, length `kernel.len() + x.len() - 1`.
pub(crate) fn convolve(kernel: &[f64], x: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; kernel.len() + x.len() - 1];
    for (i, k) in kernel.iter().enumerate() {
        for (j, v) in x.iter().enumerate() {
            out[i + j] += k * v;
        }
    }
    out
}

/// Adjoint of [`convolve`]: correlation with the kernel, truncated to `n`.
pub(crate) fn correlate(kernel: &[f64], y: &[f64], n: usize) -> Vec<f64> {
    (0..n)
        .map(|j| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(i, k)| y.get(i + j).map(|v| k * v))
                .sum::<f64>()
        })
        .collect()
}

/// A linear map `y = α K x + β y`, in the style of first-order solver
/// operator interfaces.
pub trait Operator {
    /// `(rows, cols)` of the map.
    fn size(&self) -> (usize, usize);

    /// `y ← α K x + β y`.
    fn op(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> Result<()>;

    /// `y ← α Kᵀ x + β y`.
    fn trans_op(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> Result<()>;
}

/// Stacked constraint operators acting on the flat decision vector.
///
/// Only the linear part of each operator is applied; the constant part is
/// available from [`LinOpOperator::offset`].
#[derive(Debug, Clone)]
pub struct LinOpOperator {
    ops: Vec<LinOp>,
    constants: Vec<f64>,
    row_offsets: Vec<usize>,
    var_offsets: BTreeMap<ExprId, (usize, Shape)>,
    nrows: usize,
    ncols: usize,
}

impl LinOpOperator {
    /// Build from constraint operators and the column layout of the variables.
    pub fn new(ops: &[LinOp], var_offsets: BTreeMap<ExprId, (usize, Shape)>) -> Result<Self> {
        let mut row_offsets = Vec::with_capacity(ops.len());
        let mut constants = Vec::new();
        let mut nrows = 0;
        for op in ops {
            row_offsets.push(nrows);
            nrows += op.size();
            constants.extend_from_slice(constant_term(op)?.as_slice());
        }
        let ncols = var_offsets
            .values()
            .map(|(offset, shape)| offset + shape.size())
            .max()
            .unwrap_or(0);
        Ok(LinOpOperator {
            ops: prune_constants(ops),
            constants,
            row_offsets,
            var_offsets,
            nrows,
            ncols,
        })
    }

    /// Constant part of the stacked operators.
    pub fn offset(&self) -> &[f64] {
        &self.constants
    }

    /// `K x`.
    pub fn apply(&self, x: &[f64]) -> Result<Vec<f64>> {
        let mut y = vec![0.0; self.nrows];
        self.op(1.0, x, 0.0, &mut y)?;
        Ok(y)
    }

    /// `Kᵀ y`.
    pub fn apply_adjoint(&self, y: &[f64]) -> Result<Vec<f64>> {
        let mut x = vec![0.0; self.ncols];
        self.trans_op(1.0, y, 0.0, &mut x)?;
        Ok(x)
    }

    fn check_len(what: &str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(CvxError::ShapeMismatch {
                expected: format!("{} of length {}", what, expected),
                got: got.to_string(),
            });
        }
        Ok(())
    }
}

impl Operator for LinOpOperator {
    fn size(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    fn op(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> Result<()> {
        Self::check_len("x", x.len(), self.ncols)?;
        Self::check_len("y", y.len(), self.nrows)?;
        let values: ValueMap = self
            .var_offsets
            .iter()
            .map(|(id, (offset, shape))| {
                let data = x[*offset..offset + shape.size()].to_vec();
                (*id, DMatrix::from_vec(shape.rows, shape.cols, data))
            })
            .collect();
        for (op, &row) in self.ops.iter().zip(&self.row_offsets) {
            let ax = mul(op, &values)?;
            for (k, v) in ax.iter().enumerate() {
                y[row + k] = alpha * v + beta * y[row + k];
            }
        }
        Ok(())
    }

    fn trans_op(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> Result<()> {
        Self::check_len("x", x.len(), self.nrows)?;
        Self::check_len("y", y.len(), self.ncols)?;
        for v in y.iter_mut() {
            *v *= beta;
        }
        for (op, &row) in self.ops.iter().zip(&self.row_offsets) {
            let s = op.shape();
            let slice = x[row..row + s.size()].to_vec();
            let back = tmul(op, &DMatrix::from_vec(s.rows, s.cols, slice))?;
            for (id, grad) in back {
                // auxiliary variables outside the layout have no column
                if let Some((offset, _)) = self.var_offsets.get(&id) {
                    for (k, g) in grad.iter().enumerate() {
                        y[offset + k] += alpha * g;
                    }
                }
            }
        }
        Ok(())
    }
}
