//! Lowering of expression nodes to LinOp trees plus cone constraints.
//!
//! Each node computes its canonical form once; later calls return the
//! cached form, so shared sub-expressions are lowered a single time and
//! their auxiliary variables and constraint ids stay stable.

use log::trace;

use crate::error::Result;
use crate::expr::{Expr, ExprKind};

use super::builders::{create_const, create_param, create_var, dense_const};
use super::cone::ConeConstraint;
use super::lin_op::LinOp;

/// An affine LinOp standing for the expression, plus the constraints that
/// make the substitution exact.
#[derive(Debug, Clone)]
pub struct CanonicalForm {
    pub expr: LinOp,
    pub constraints: Vec<ConeConstraint>,
}

impl CanonicalForm {
    fn leaf(expr: LinOp) -> Self {
        CanonicalForm {
            expr,
            constraints: Vec::new(),
        }
    }
}

impl Expr {
    /// The canonical form of this node, computed on first use.
    ///
    /// # Errors
    ///
    /// Fails if an atom cannot be lowered (for instance a product of two
    /// non-constant expressions) or a constant sub-expression cannot be
    /// evaluated.
    pub fn canonical_form(&self) -> Result<&CanonicalForm> {
        if let Some(form) = self.canonical_slot().get() {
            return Ok(form);
        }
        let form = self.canonicalize()?;
        Ok(self.canonical_slot().get_or_init(|| form))
    }

    fn canonicalize(&self) -> Result<CanonicalForm> {
        match self.kind() {
            ExprKind::Variable(v) => Ok(CanonicalForm::leaf(create_var(self.shape(), v.id))),
            ExprKind::Parameter(_) => Ok(CanonicalForm::leaf(create_param(self))),
            ExprKind::Constant(value) => Ok(CanonicalForm::leaf(create_const(value))),
            ExprKind::Atom(atom) => {
                if self.is_constant() {
                    // Parameters are read at extraction time, literals now.
                    let op = if self.has_parameters() {
                        create_param(self)
                    } else {
                        dense_const(self.try_value()?)
                    };
                    return Ok(CanonicalForm::leaf(op));
                }

                let mut constraints = Vec::new();
                let mut arg_ops = Vec::with_capacity(self.args().len());
                for arg in self.args() {
                    let form = arg.canonical_form()?;
                    arg_ops.push(form.expr.clone());
                    constraints.extend(form.constraints.iter().cloned());
                }
                let (expr, own) = atom.graph_implementation(&arg_ops, self.shape(), self.args())?;
                trace!(
                    "canonicalized {} with {} new constraints",
                    atom.name(),
                    own.len()
                );
                constraints.extend(own);
                Ok(CanonicalForm { expr, constraints })
            }
        }
    }
}
