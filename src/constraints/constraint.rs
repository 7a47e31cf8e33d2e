//! Constraint types for optimization problems.
//!
//! Constraints map to cone constraints in the solver:
//! - Eq: lhs - rhs == 0 (zero cone)
//! - Leq: lhs - rhs <= 0 (nonnegative orthant on the slack)
//! - Psd: A ⪰ 0 (semidefinite cone)
//!
//! Each constraint carries an id fixed at construction and a dual value
//! slot shared by all of its clones.

use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;

use crate::atoms::try_sub;
use crate::canon::{ConeConstraint, LinEqConstr, LinLeqConstr, Sdp};
use crate::error::{CvxError, Result};
use crate::expr::{Expr, ExprId, IntoExpr, ValueSlot};

/// What a constraint asserts about its expression.
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    /// `expr == 0`.
    Eq(Expr),
    /// `expr <= 0`, elementwise.
    Leq(Expr),
    /// `expr ⪰ 0` for a square `expr`.
    Psd(Expr),
}

#[derive(Debug)]
struct ConstraintNode {
    id: ExprId,
    kind: ConstraintKind,
    dual: ValueSlot,
}

/// A constraint in an optimization problem.
#[derive(Clone)]
pub struct Constraint(Arc<ConstraintNode>);

impl Constraint {
    fn new(kind: ConstraintKind) -> Self {
        Constraint(Arc::new(ConstraintNode {
            id: ExprId::new(),
            kind,
            dual: ValueSlot::default(),
        }))
    }

    /// Create an equality constraint: lhs == rhs.
    ///
    /// # Panics
    ///
    /// Panics if the shapes cannot be broadcast; see [`Constraint::try_eq`].
    pub fn eq(lhs: impl IntoExpr, rhs: impl IntoExpr) -> Self {
        Self::try_eq(lhs, rhs).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Create an inequality constraint: lhs <= rhs.
    pub fn leq(lhs: impl IntoExpr, rhs: impl IntoExpr) -> Self {
        Self::try_leq(lhs, rhs).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Create an inequality constraint: lhs >= rhs.
    pub fn geq(lhs: impl IntoExpr, rhs: impl IntoExpr) -> Self {
        Self::try_geq(lhs, rhs).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Create a semidefinite constraint: a ⪰ 0.
    pub fn psd(a: impl IntoExpr) -> Self {
        Self::try_psd(a).unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn try_eq(lhs: impl IntoExpr, rhs: impl IntoExpr) -> Result<Self> {
        Ok(Self::new(ConstraintKind::Eq(try_sub(lhs, rhs)?)))
    }

    pub fn try_leq(lhs: impl IntoExpr, rhs: impl IntoExpr) -> Result<Self> {
        Ok(Self::new(ConstraintKind::Leq(try_sub(lhs, rhs)?)))
    }

    pub fn try_geq(lhs: impl IntoExpr, rhs: impl IntoExpr) -> Result<Self> {
        Self::try_leq(rhs, lhs)
    }

    pub fn try_psd(a: impl IntoExpr) -> Result<Self> {
        let a = a.into_expr();
        if !a.shape().is_square() {
            return Err(CvxError::InvalidArgument(format!(
                "semidefinite constraint on non-square {}",
                a.shape()
            )));
        }
        Ok(Self::new(ConstraintKind::Psd(a)))
    }

    pub fn id(&self) -> ExprId {
        self.0.id
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.0.kind
    }

    /// The constrained expression (`lhs - rhs` for comparisons).
    pub fn expr(&self) -> &Expr {
        match self.kind() {
            ConstraintKind::Eq(e) | ConstraintKind::Leq(e) | ConstraintKind::Psd(e) => e,
        }
    }

    /// Check if this constraint is DCP-compliant.
    ///
    /// DCP rules for constraints:
    /// - Eq: expression must be affine
    /// - Leq: expression must be convex (convex <= 0)
    /// - Psd: expression must be affine
    pub fn is_dcp(&self) -> bool {
        match self.kind() {
            ConstraintKind::Eq(e) | ConstraintKind::Psd(e) => e.is_affine(),
            ConstraintKind::Leq(e) => e.is_convex(),
        }
    }

    /// Dual value from the last successful solve.
    ///
    /// Equality duals are free, inequality duals are nonnegative, both
    /// shaped like the constraint. Semidefinite duals are symmetric matrices.
    pub fn dual_value(&self) -> Option<DMatrix<f64>> {
        self.0.dual.get()
    }

    pub(crate) fn dual_slot(&self) -> &ValueSlot {
        &self.0.dual
    }

    /// Get all variables in this constraint, sorted by id.
    pub fn variables(&self) -> Vec<Expr> {
        self.expr().variables()
    }

    /// Lower to cone records.
    ///
    /// The record standing for the constraint itself carries the
    /// constraint's id; records from nonlinear atoms inside it follow.
    pub fn canonicalize(&self) -> Result<Vec<ConeConstraint>> {
        let form = self.expr().canonical_form()?;
        let own = match self.kind() {
            ConstraintKind::Eq(_) => {
                ConeConstraint::Eq(LinEqConstr::new(form.expr.clone(), self.id()))
            }
            ConstraintKind::Leq(_) => {
                ConeConstraint::Leq(LinLeqConstr::new(form.expr.clone(), self.id()))
            }
            ConstraintKind::Psd(_) => ConeConstraint::Sdp(Sdp {
                a: form.expr.clone(),
                enforce_sym: true,
                id: self.id(),
            }),
        };
        let mut out = Vec::with_capacity(form.constraints.len() + 1);
        out.push(own);
        out.extend(form.constraints.iter().cloned());
        Ok(out)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("id", &self.id())
            .field("constraint", &self.to_string())
            .finish()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ConstraintKind::Eq(e) => write!(f, "{} == 0", e),
            ConstraintKind::Leq(e) => write!(f, "{} <= 0", e),
            ConstraintKind::Psd(e) => write!(f, "{} >> 0", e),
        }
    }
}

/// Extension trait for creating constraints from expressions.
pub trait ConstraintExt {
    /// Create equality constraint: self == rhs.
    fn equals(&self, rhs: impl IntoExpr) -> Constraint;

    /// Create inequality constraint: self <= rhs.
    fn leq(&self, rhs: impl IntoExpr) -> Constraint;

    /// Create inequality constraint: self >= rhs.
    fn geq(&self, rhs: impl IntoExpr) -> Constraint;

    /// Shorthand for [`ConstraintExt::equals`].
    fn eq(&self, rhs: impl IntoExpr) -> Constraint {
        self.equals(rhs)
    }

    /// Shorthand for [`ConstraintExt::leq`].
    fn le(&self, rhs: impl IntoExpr) -> Constraint {
        self.leq(rhs)
    }

    /// Shorthand for [`ConstraintExt::geq`].
    fn ge(&self, rhs: impl IntoExpr) -> Constraint {
        self.geq(rhs)
    }
}

impl ConstraintExt for Expr {
    fn equals(&self, rhs: impl IntoExpr) -> Constraint {
        Constraint::eq(self, rhs)
    }

    fn leq(&self, rhs: impl IntoExpr) -> Constraint {
        Constraint::leq(self, rhs)
    }

    fn geq(&self, rhs: impl IntoExpr) -> Constraint {
        Constraint::geq(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::{log, norm2};
    use crate::expr::{constant, variable};

    #[test]
    fn test_equality_constraint() {
        let x = variable(5);
        let c = constant(1.0);
        let constr = Constraint::eq(&x, &c);

        assert!(constr.is_dcp());
        assert!(matches!(constr.kind(), ConstraintKind::Eq(_)));
        assert_eq!(constr.expr().shape(), x.shape());
    }

    #[test]
    fn test_inequality_constraint() {
        let x = variable(5);
        let constr = Constraint::geq(&x, 0.0);

        assert!(constr.is_dcp());
        assert!(matches!(constr.kind(), ConstraintKind::Leq(_)));
    }

    #[test]
    fn test_non_dcp_constraint() {
        let x = variable(5);
        // norm(x) >= 1 is NOT DCP (convex >= constant)
        let constr = Constraint::geq(norm2(&x), 1.0);
        assert!(!constr.is_dcp());

        // log(x) >= 1 is DCP (concave >= constant)
        assert!(Constraint::geq(log(&x), 1.0).is_dcp());
    }

    #[test]
    fn test_constraint_ext() {
        let x = variable(5);
        let c = constant(1.0);

        let eq_constr = x.equals(&c);
        assert!(eq_constr.is_dcp());

        let leq_constr = x.leq(&c);
        assert!(leq_constr.is_dcp());

        assert!(x.le(2.0).is_dcp());
        assert!(x.ge(vec![1.0; 5]).is_dcp());
        assert!(Constraint::try_eq(&x, variable(3)).is_err());
    }

    #[test]
    fn test_ids_and_clones_share_duals() {
        let x = variable(2);
        let a = x.geq(0.0);
        let b = x.geq(0.0);
        assert_ne!(a.id(), b.id());

        let a2 = a.clone();
        assert_eq!(a.id(), a2.id());
        a.dual_slot().set(DMatrix::from_element(2, 1, 1.0));
        assert!(a2.dual_value().is_some());
        assert!(b.dual_value().is_none());
    }

    #[test]
    fn test_canonicalize_keeps_id() {
        let x = variable(3);
        let c = norm2(&x).leq(1.0);
        let cones = c.canonicalize().unwrap();
        assert_eq!(cones[0].id(), c.id());
        assert_eq!(cones.len(), 2);

        let m = variable((2, 2));
        assert!(Constraint::try_psd(variable((2, 3))).is_err());
        let p = Constraint::psd(&m);
        assert!(p.is_dcp());
        assert!(matches!(p.canonicalize().unwrap()[0], ConeConstraint::Sdp(_)));
    }
}
