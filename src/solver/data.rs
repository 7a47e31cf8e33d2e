//! Problem data assembly ("matrix stuffing").
//!
//! Converts bucketed cone constraints into the standard conic form
//!
//! ```text
//! minimize    c'x + offset
//! subject to  A x = b
//!             h - G x ∈ K
//! ```
//!
//! where `K` is the product of a nonnegative orthant, second-order cones,
//! exponential cones and semidefinite cones, in that order.

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace};
use nalgebra_sparse::CscMatrix;

use crate::canon::{
    ConeConstraint, ExpCone, LinEqConstr, LinExpr, LinLeqConstr, LinOp, Sdp, Soc, SocElemwise,
};
use crate::error::{CvxError, Result};
use crate::expr::{ExprId, Shape};
use crate::sparse::Triplets;

/// Row counts of each cone family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of equality rows.
    pub eq: usize,
    /// Number of nonnegative-orthant rows.
    pub leq: usize,
    /// Second-order cone dimensions (each entry is the cone dimension).
    pub soc: Vec<usize>,
    /// Number of exponential cones (each is 3D).
    pub exp: usize,
    /// Semidefinite cone orders; each cone takes `n²` rows of `vec(A)`.
    pub sdp: Vec<usize>,
}

impl ConeDims {
    /// Total number of inequality rows.
    pub fn ineq_rows(&self) -> usize {
        self.leq
            + self.soc.iter().sum::<usize>()
            + 3 * self.exp
            + self.sdp.iter().map(|n| n * n).sum::<usize>()
    }
}

/// Canonical constraints of a problem, one bucket per cone family.
///
/// Records are deduplicated by id on insertion.
#[derive(Debug, Clone, Default)]
pub struct ConstraintBuckets {
    pub eq: Vec<LinEqConstr>,
    pub leq: Vec<LinLeqConstr>,
    pub soc: Vec<Soc>,
    pub soc_elemwise: Vec<SocElemwise>,
    pub sdp: Vec<Sdp>,
    pub exp: Vec<ExpCone>,
    seen: HashSet<ExprId>,
}

impl ConstraintBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; returns `false` if one with the same id is already present.
    pub fn push(&mut self, constraint: ConeConstraint) -> bool {
        if !self.seen.insert(constraint.id()) {
            return false;
        }
        match constraint {
            ConeConstraint::Eq(c) => self.eq.push(c),
            ConeConstraint::Leq(c) => self.leq.push(c),
            ConeConstraint::Soc(c) => self.soc.push(c),
            ConeConstraint::SocElemwise(c) => self.soc_elemwise.push(c),
            ConeConstraint::Sdp(c) => self.sdp.push(c),
            ConeConstraint::Exp(c) => self.exp.push(c),
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Expand every cone into plain rows and compute the cone dims.
    ///
    /// Inequality rows are ordered: linear, second-order, elementwise
    /// second-order, exponential, semidefinite.
    pub fn format(&self) -> Result<FormattedConstraints> {
        let mut out = FormattedConstraints::default();
        out.eq.extend(self.eq.iter().cloned());
        out.ineq.extend(self.leq.iter().cloned());
        out.dims.leq = self.leq.iter().map(|c| c.size()).sum();

        for c in &self.soc {
            out.dims.soc.push(c.size());
            out.absorb(ConeConstraint::Soc(c.clone()))?;
        }
        for c in &self.soc_elemwise {
            out.dims
                .soc
                .extend(std::iter::repeat(c.cone_size()).take(c.num_cones()));
            out.absorb(ConeConstraint::SocElemwise(c.clone()))?;
        }
        for c in &self.exp {
            out.dims.exp += c.num_cones();
            out.absorb(ConeConstraint::Exp(c.clone()))?;
        }
        for c in &self.sdp {
            out.dims.sdp.push(c.order());
            out.absorb(ConeConstraint::Sdp(c.clone()))?;
        }
        out.dims.eq = out.eq.iter().map(|c| c.size()).sum();
        Ok(out)
    }
}

/// Plain equality and inequality rows plus the cone layout of the inequalities.
#[derive(Debug, Clone, Default)]
pub struct FormattedConstraints {
    pub eq: Vec<LinEqConstr>,
    pub ineq: Vec<LinLeqConstr>,
    pub dims: ConeDims,
}

impl FormattedConstraints {
    fn absorb(&mut self, cone: ConeConstraint) -> Result<()> {
        let formatted = cone.format()?;
        self.eq.extend(formatted.eq);
        self.ineq.extend(formatted.ineq);
        Ok(())
    }
}

/// Row or column range `(start, len)` keyed by id.
pub type Offsets = BTreeMap<ExprId, (usize, usize)>;

/// Numeric problem data in standard conic form.
#[derive(Debug, Clone)]
pub struct ProblemData {
    /// Objective vector.
    pub c: Vec<f64>,
    /// Objective constant.
    pub offset: f64,
    /// Equality matrix.
    pub a: CscMatrix<f64>,
    pub b: Vec<f64>,
    /// Inequality matrix; `h - G x` lies in the cones of `dims`.
    pub g: CscMatrix<f64>,
    pub h: Vec<f64>,
    pub dims: ConeDims,
    /// Column offset and shape of every variable, sorted by id.
    pub var_offsets: BTreeMap<ExprId, (usize, Shape)>,
    /// Equality rows of each constraint id.
    pub eq_offsets: Offsets,
    /// Inequality rows of each constraint id.
    pub ineq_offsets: Offsets,
}

impl ProblemData {
    /// Extract coefficients for a scalar objective and formatted constraints.
    pub fn build(objective: &LinOp, constraints: &FormattedConstraints) -> Result<Self> {
        let var_offsets = get_var_offsets(objective, constraints);
        let n = num_columns(&var_offsets);

        let (c, offset) = objective_vector(objective, &var_offsets, n)?;

        let eq: Vec<(ExprId, &LinOp)> = constraints.eq.iter().map(|c| (c.id, &c.expr)).collect();
        let (a, b, eq_offsets) = constr_matrix(&eq, &var_offsets, n)?;

        let ineq: Vec<(ExprId, &LinOp)> =
            constraints.ineq.iter().map(|c| (c.id, &c.expr)).collect();
        let (g, h, ineq_offsets) = constr_matrix(&ineq, &var_offsets, n)?;

        debug!(
            "problem data: {} variables, {} equality rows, {} inequality rows, {} nonzeros",
            n,
            b.len(),
            h.len(),
            a.nnz() + g.nnz()
        );

        Ok(ProblemData {
            c,
            offset,
            a,
            b,
            g,
            h,
            dims: constraints.dims.clone(),
            var_offsets,
            eq_offsets,
            ineq_offsets,
        })
    }

    /// Length of the flat decision vector.
    pub fn num_vars(&self) -> usize {
        self.c.len()
    }
}

/// Assign column offsets to every variable referenced by the objective or a
/// constraint, in id order.
pub fn get_var_offsets(
    objective: &LinOp,
    constraints: &FormattedConstraints,
) -> BTreeMap<ExprId, (usize, Shape)> {
    let mut shapes = objective.variables();
    for c in &constraints.eq {
        shapes.extend(c.expr.variables());
    }
    for c in &constraints.ineq {
        shapes.extend(c.expr.variables());
    }

    let mut offset = 0;
    shapes
        .into_iter()
        .map(|(id, shape)| {
            let start = offset;
            offset += shape.size();
            (id, (start, shape))
        })
        .collect()
}

fn num_columns(var_offsets: &BTreeMap<ExprId, (usize, Shape)>) -> usize {
    var_offsets
        .values()
        .map(|(start, shape)| start + shape.size())
        .max()
        .unwrap_or(0)
}

fn objective_vector(
    objective: &LinOp,
    var_offsets: &BTreeMap<ExprId, (usize, Shape)>,
    n: usize,
) -> Result<(Vec<f64>, f64)> {
    if objective.size() != 1 {
        return Err(CvxError::InvalidProblem(format!(
            "objective must be scalar, got shape {}",
            objective.shape()
        )));
    }
    let lin = LinExpr::from_op(objective)?;
    let mut c = vec![0.0; n];
    for (id, coeff) in &lin.coeffs {
        let (start, _) = column_block(var_offsets, *id)?;
        for (_, col, v) in coeff.triplet_iter() {
            c[start + col] += *v;
        }
    }
    Ok((c, lin.constant[0]))
}

/// Stack the coefficient blocks of `constraints` into one matrix.
///
/// Each constraint `expr (op) 0` contributes rows `M x + k`; the right-hand
/// side is `-k`. Consecutive rows sharing an id are recorded as one range.
pub fn constr_matrix(
    constraints: &[(ExprId, &LinOp)],
    var_offsets: &BTreeMap<ExprId, (usize, Shape)>,
    n: usize,
) -> Result<(CscMatrix<f64>, Vec<f64>, Offsets)> {
    let mut triplets = Triplets::new();
    let mut rhs = Vec::new();
    let mut offsets = Offsets::new();

    for (id, op) in constraints {
        let row = rhs.len();
        let lin = LinExpr::from_op(op)?;
        trace!(
            "constraint {}: rows {}..{}, {} variable blocks",
            id,
            row,
            row + lin.size(),
            lin.coeffs.len()
        );
        for (var, coeff) in &lin.coeffs {
            let (start, _) = column_block(var_offsets, *var)?;
            triplets.add_block(row, start, coeff);
        }
        rhs.extend(lin.constant.iter().map(|k| -k));
        record_offset(&mut offsets, *id, row, lin.size());
    }

    let m = rhs.len();
    Ok((triplets.build(m, n), rhs, offsets))
}

fn column_block(
    var_offsets: &BTreeMap<ExprId, (usize, Shape)>,
    id: ExprId,
) -> Result<(usize, Shape)> {
    var_offsets
        .get(&id)
        .copied()
        .ok_or_else(|| CvxError::InvalidProblem(format!("variable {} has no column", id)))
}

fn record_offset(offsets: &mut Offsets, id: ExprId, start: usize, len: usize) {
    match offsets.get_mut(&id) {
        Some((s, l)) if *s + *l == start => *l += len,
        Some(_) => {}
        None => {
            offsets.insert(id, (start, len));
        }
    }
}
