//! Cone constraint records produced by canonicalization.
//!
//! Every record carries an id. Records are shared between the canonical
//! forms of common sub-expressions and deduplicated by id when a problem
//! is assembled.

use nalgebra_sparse::CscMatrix;

use crate::error::Result;
use crate::expr::{ExprId, Shape};
use crate::sparse::Triplets;

use super::builders::{interleave, mul_expr, neg_expr, reshape, sparse_const};
use super::lin_op::LinOp;

/// Affine equality `expr == 0`.
#[derive(Debug, Clone)]
pub struct LinEqConstr {
    pub expr: LinOp,
    pub id: ExprId,
}

impl LinEqConstr {
    pub fn new(expr: LinOp, id: ExprId) -> Self {
        Self { expr, id }
    }

    pub fn size(&self) -> usize {
        self.expr.size()
    }
}

/// Affine inequality `expr <= 0` (elementwise).
#[derive(Debug, Clone)]
pub struct LinLeqConstr {
    pub expr: LinOp,
    pub id: ExprId,
}

impl LinLeqConstr {
    pub fn new(expr: LinOp, id: ExprId) -> Self {
        Self { expr, id }
    }

    pub fn size(&self) -> usize {
        self.expr.size()
    }
}

/// Second-order cone `‖(x₁, …, x_k)‖₂ <= t` with scalar `t`.
#[derive(Debug, Clone)]
pub struct Soc {
    pub t: LinOp,
    pub x_elems: Vec<LinOp>,
    pub id: ExprId,
}

impl Soc {
    pub fn new(t: LinOp, x_elems: Vec<LinOp>) -> Self {
        Self {
            t,
            x_elems,
            id: ExprId::new(),
        }
    }

    /// Cone dimension: `t` plus every entry of the arguments.
    pub fn size(&self) -> usize {
        1 + self.x_elems.iter().map(|x| x.size()).sum::<usize>()
    }
}

/// Elementwise second-order cones: `‖(x₁ᵢ, …, x_kᵢ)‖₂ <= tᵢ` for every entry `i`.
#[derive(Debug, Clone)]
pub struct SocElemwise {
    pub t: LinOp,
    pub x_elems: Vec<LinOp>,
    pub id: ExprId,
}

impl SocElemwise {
    pub fn new(t: LinOp, x_elems: Vec<LinOp>) -> Self {
        Self {
            t,
            x_elems,
            id: ExprId::new(),
        }
    }

    pub fn num_cones(&self) -> usize {
        self.t.size()
    }

    pub fn cone_size(&self) -> usize {
        1 + self.x_elems.len()
    }

    pub fn size(&self) -> usize {
        self.num_cones() * self.cone_size()
    }
}

/// Positive semidefinite cone `A ⪰ 0` for a square `A`.
#[derive(Debug, Clone)]
pub struct Sdp {
    pub a: LinOp,
    /// Add equalities forcing `A = Aᵀ`.
    pub enforce_sym: bool,
    pub id: ExprId,
}

impl Sdp {
    pub fn new(a: LinOp, enforce_sym: bool) -> Self {
        Self {
            a,
            enforce_sym,
            id: ExprId::new(),
        }
    }

    /// Matrix order `n`.
    pub fn order(&self) -> usize {
        self.a.shape().rows
    }
}

/// Elementwise exponential cones: `(xᵢ, yᵢ, zᵢ) ∈ K_exp`, i.e. `yᵢ e^{xᵢ/yᵢ} <= zᵢ`.
#[derive(Debug, Clone)]
pub struct ExpCone {
    pub x: LinOp,
    pub y: LinOp,
    pub z: LinOp,
    pub id: ExprId,
}

impl ExpCone {
    pub fn new(x: LinOp, y: LinOp, z: LinOp) -> Self {
        Self {
            x,
            y,
            z,
            id: ExprId::new(),
        }
    }

    pub fn num_cones(&self) -> usize {
        self.x.size()
    }
}

/// A constraint in canonical (cone) form.
#[derive(Debug, Clone)]
pub enum ConeConstraint {
    Eq(LinEqConstr),
    Leq(LinLeqConstr),
    Soc(Soc),
    SocElemwise(SocElemwise),
    Sdp(Sdp),
    Exp(ExpCone),
}

/// Plain affine rows a generic cone solver consumes.
///
/// Inequality rows follow the `expr <= 0` convention: the slack `-expr`
/// is what lies in the cone.
#[derive(Debug, Clone, Default)]
pub struct FormattedCone {
    pub eq: Vec<LinEqConstr>,
    pub ineq: Vec<LinLeqConstr>,
}

impl ConeConstraint {
    pub fn id(&self) -> ExprId {
        match self {
            ConeConstraint::Eq(c) => c.id,
            ConeConstraint::Leq(c) => c.id,
            ConeConstraint::Soc(c) => c.id,
            ConeConstraint::SocElemwise(c) => c.id,
            ConeConstraint::Sdp(c) => c.id,
            ConeConstraint::Exp(c) => c.id,
        }
    }

    pub fn cone_name(&self) -> &'static str {
        match self {
            ConeConstraint::Eq(_) => "equality",
            ConeConstraint::Leq(_) => "inequality",
            ConeConstraint::Soc(_) | ConeConstraint::SocElemwise(_) => "second-order cone",
            ConeConstraint::Sdp(_) => "semidefinite",
            ConeConstraint::Exp(_) => "exponential cone",
        }
    }

    /// Lower the record to equality and inequality rows.
    ///
    /// Cone rows come out in the order the cone expects: `t` first, then the
    /// arguments; elementwise cones are interleaved one cone at a time.
    pub fn format(&self) -> Result<FormattedCone> {
        let mut out = FormattedCone::default();
        match self {
            ConeConstraint::Eq(c) => out.eq.push(c.clone()),
            ConeConstraint::Leq(c) => out.ineq.push(c.clone()),
            ConeConstraint::Soc(c) => {
                out.ineq.push(LinLeqConstr::new(neg_expr(&c.t), c.id));
                for x in &c.x_elems {
                    out.ineq.push(LinLeqConstr::new(neg_expr(x), c.id));
                }
            }
            ConeConstraint::SocElemwise(c) => {
                let mut parts = Vec::with_capacity(c.cone_size());
                parts.push(c.t.clone());
                parts.extend(c.x_elems.iter().cloned());
                let rows = interleave(&parts)?;
                out.ineq.push(LinLeqConstr::new(neg_expr(&rows), c.id));
            }
            ConeConstraint::Exp(c) => {
                let rows = interleave(&[c.x.clone(), c.y.clone(), c.z.clone()])?;
                out.ineq.push(LinLeqConstr::new(neg_expr(&rows), c.id));
            }
            ConeConstraint::Sdp(c) => {
                let n = c.order();
                let vec_a = reshape(&c.a, Shape::vector(n * n))?;
                if c.enforce_sym && n > 1 {
                    let sym = mul_expr(&sparse_const(symmetry_selector(n)), &vec_a)?;
                    out.eq.push(LinEqConstr::new(sym, c.id));
                }
                out.ineq.push(LinLeqConstr::new(neg_expr(&vec_a), c.id));
            }
        }
        Ok(out)
    }
}

/// Rows `A[i, j] - A[j, i]` for `i < j`, acting on `vec(A)`.
fn symmetry_selector(n: usize) -> CscMatrix<f64> {
    let mut triplets = Triplets::new();
    let mut row = 0;
    for j in 0..n {
        for i in 0..j {
            triplets.push(row, j * n + i, 1.0);
            triplets.push(row, i * n + j, -1.0);
            row += 1;
        }
    }
    triplets.build(row, n * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::builders::{create_var, new_var};

    #[test]
    fn test_soc_size_and_format() {
        let t = new_var(Shape::scalar());
        let x = new_var(Shape::vector(3));
        let soc = ConeConstraint::Soc(Soc::new(t, vec![x]));
        let f = soc.format().unwrap();
        assert!(f.eq.is_empty());
        assert_eq!(f.ineq.len(), 2);
        assert_eq!(f.ineq.iter().map(|r| r.size()).sum::<usize>(), 4);
        assert!(f.ineq.iter().all(|r| r.id == soc.id()));
    }

    #[test]
    fn test_elementwise_formats_interleaved() {
        let t = new_var(Shape::vector(4));
        let x = new_var(Shape::vector(4));
        let y = new_var(Shape::vector(4));
        let c = SocElemwise::new(t, vec![x, y]);
        assert_eq!(c.num_cones(), 4);
        assert_eq!(c.cone_size(), 3);
        let f = ConeConstraint::SocElemwise(c).format().unwrap();
        assert_eq!(f.ineq.len(), 1);
        assert_eq!(f.ineq[0].size(), 12);
    }

    #[test]
    fn test_sdp_symmetry_rows() {
        let a = create_var(Shape::matrix(3, 3), ExprId::new());
        let f = ConeConstraint::Sdp(Sdp::new(a.clone(), true)).format().unwrap();
        assert_eq!(f.eq.len(), 1);
        assert_eq!(f.eq[0].size(), 3);
        assert_eq!(f.ineq[0].size(), 9);

        let f = ConeConstraint::Sdp(Sdp::new(a, false)).format().unwrap();
        assert!(f.eq.is_empty());
    }
}
