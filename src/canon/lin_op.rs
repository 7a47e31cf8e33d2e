//! The linear-operator IR.
//!
//! A [`LinOp`] is an immutable tree (sub-trees may be shared) describing an
//! affine function of the problem variables. Every operator is applied to
//! the column-major vectorization of its argument(s).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::expr::{Expr, ExprId, IndexSpec, Shape};

/// Operator kind, with the constant data some kinds carry.
#[derive(Clone)]
pub enum LinOpKind {
    /// A problem variable.
    Variable(ExprId),
    /// Scalar constant.
    ScalarConst(f64),
    /// Dense constant.
    DenseConst(DMatrix<f64>),
    /// Sparse constant.
    SparseConst(CscMatrix<f64>),
    /// Constant expression evaluated at extraction time (parameters).
    Param(Expr),
    /// Sum of the arguments (all of the node's shape).
    Sum,
    /// Negation.
    Neg,
    /// Left multiplication `lhs * arg` by a constant operator.
    Mul(LinOp),
    /// Right multiplication `arg * rhs` by a constant operator.
    RMul(LinOp),
    /// Elementwise product with a constant operator of the same shape.
    MulElem(LinOp),
    /// Elementwise division by a constant operator.
    Div(LinOp),
    /// Strided sub-matrix.
    Index(IndexSpec),
    /// Matrix transpose.
    Transpose,
    /// Sum of all entries.
    SumEntries,
    /// Column-major reshape to the node's shape.
    Reshape,
    /// Full 1-D convolution with a constant kernel.
    Conv(LinOp),
    /// Contributes nothing (all zeros).
    NoOp,
}

impl LinOpKind {
    /// Short name used in debug output and messages.
    pub fn name(&self) -> &'static str {
        match self {
            LinOpKind::Variable(_) => "variable",
            LinOpKind::ScalarConst(_) => "scalar_const",
            LinOpKind::DenseConst(_) => "dense_const",
            LinOpKind::SparseConst(_) => "sparse_const",
            LinOpKind::Param(_) => "param",
            LinOpKind::Sum => "sum",
            LinOpKind::Neg => "neg",
            LinOpKind::Mul(_) => "mul",
            LinOpKind::RMul(_) => "rmul",
            LinOpKind::MulElem(_) => "mul_elem",
            LinOpKind::Div(_) => "div",
            LinOpKind::Index(_) => "index",
            LinOpKind::Transpose => "transpose",
            LinOpKind::SumEntries => "sum_entries",
            LinOpKind::Reshape => "reshape",
            LinOpKind::Conv(_) => "conv",
            LinOpKind::NoOp => "no_op",
        }
    }
}

struct LinOpNode {
    kind: LinOpKind,
    shape: Shape,
    args: Vec<LinOp>,
}

/// A node of the linear-operator IR.
#[derive(Clone)]
pub struct LinOp(Arc<LinOpNode>);

impl LinOp {
    pub fn new(kind: LinOpKind, shape: Shape, args: Vec<LinOp>) -> Self {
        LinOp(Arc::new(LinOpNode { kind, shape, args }))
    }

    pub fn kind(&self) -> &LinOpKind {
        &self.0.kind
    }

    pub fn shape(&self) -> Shape {
        self.0.shape
    }

    pub fn args(&self) -> &[LinOp] {
        &self.0.args
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.0.shape.size()
    }

    pub fn ptr_eq(&self, other: &LinOp) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether this is a leaf holding constant data.
    pub fn is_const_leaf(&self) -> bool {
        matches!(
            self.kind(),
            LinOpKind::ScalarConst(_)
                | LinOpKind::DenseConst(_)
                | LinOpKind::SparseConst(_)
                | LinOpKind::Param(_)
        )
    }

    /// Whether no variable appears in the tree.
    pub fn is_constant(&self) -> bool {
        match self.kind() {
            LinOpKind::Variable(_) => false,
            _ => self.args().iter().all(|a| a.is_constant()),
        }
    }

    /// Variables referenced by the tree with their shapes, keyed by id.
    pub fn variables(&self) -> BTreeMap<ExprId, Shape> {
        let mut out = BTreeMap::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeMap<ExprId, Shape>) {
        if let LinOpKind::Variable(id) = self.kind() {
            out.insert(*id, self.shape());
        }
        for arg in self.args() {
            arg.collect_variables(out);
        }
    }
}

impl fmt::Debug for LinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            LinOpKind::Variable(id) => write!(f, "var{}{}", id.raw(), self.shape()),
            LinOpKind::ScalarConst(v) => write!(f, "{}", v),
            kind => {
                write!(f, "{}{}", kind.name(), self.shape())?;
                f.debug_list().entries(self.args()).finish()
            }
        }
    }
}
