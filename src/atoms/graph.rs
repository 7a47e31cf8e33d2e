//! Graph implementations: each atom as an affine operator plus cone
//! constraints over fresh auxiliary variables.
//!
//! Convex atoms are lowered to their epigraph (`t >= f(x)`), concave atoms
//! to their hypograph (`t <= f(x)`); minimizing or maximizing `t` makes the
//! relaxation tight.

use nalgebra::DMatrix;

use crate::canon::builders::{
    conv, create_eq, create_geq, create_leq, dense_const, diag_mat, diag_vec, div_expr, hstack,
    index, mul_elemwise, mul_expr, neg_expr, new_var, promote, reshape, rmul_expr, scalar_const,
    sparse_const, sub_expr, sum_entries, sum_expr, trace, transpose, vstack,
};
use crate::canon::{ConeConstraint, ExpCone, LinOp, Sdp, Soc, SocElemwise};
use crate::dcp::PsdStatus;
use crate::error::{CvxError, Result};
use crate::expr::{Expr, IndexSpec, Shape};
use crate::sparse::{csc_identity, Triplets};

use super::atom::Atom;

type Graph = (LinOp, Vec<ConeConstraint>);

fn affine(op: LinOp) -> Result<Graph> {
    Ok((op, Vec::new()))
}

pub(super) fn lower(atom: &Atom, ops: &[LinOp], shape: Shape, args: &[Expr]) -> Result<Graph> {
    let x = &ops[0];
    match atom {
        Atom::Add => affine(sum_expr(ops)?),
        Atom::Neg => affine(neg_expr(x)),
        Atom::MulExpr => affine(mul_expr(x, &ops[1])?),
        Atom::RMulExpr => affine(rmul_expr(x, &ops[1])?),
        Atom::MulElemwise => affine(mul_elemwise(x, &ops[1])?),
        Atom::DivExpr => affine(div_expr(x, &ops[1])?),
        Atom::Index(spec) => affine(index(x, spec)?),
        Atom::Transpose => transpose(x),
        Atom::Reshape(s) => affine(reshape(x, *s)?),
        Atom::SumEntries => affine(sum_entries(x)),
        Atom::Trace => affine(trace(x)?),
        Atom::HStack => affine(hstack(ops)?),
        Atom::VStack => affine(vstack(ops)?),
        Atom::DiagVec => affine(diag_vec(x)?),
        Atom::DiagMat => affine(diag_mat(x)?),
        Atom::Conv => affine(conv(x, &ops[1])?),

        Atom::Abs => abs(x),
        Atom::Pos => pos(x),
        Atom::NegPart => pos(&neg_expr(x)),
        Atom::MaxElemwise => max_elemwise(ops, shape),
        Atom::MinElemwise => min_elemwise(ops, shape),
        Atom::MaxEntries => max_entries(x),
        Atom::MinEntries => min_entries(x),
        Atom::Norm1 => {
            let (t, constraints) = abs(x)?;
            Ok((sum_entries(&t), constraints))
        }
        Atom::Norm2 => norm2(x),
        Atom::NormInf => norm_inf(x),
        Atom::Square => square(x),
        Atom::SumSquares => quad_over_lin(x, &scalar_const(1.0)),
        Atom::QuadOverLin => quad_over_lin(x, &ops[1]),
        Atom::QuadForm(status) => quad_form(x, &args[1], *status),
        Atom::Exp => exp(x),
        Atom::Sqrt => sqrt(x),
        Atom::Log => log(x),
        Atom::Entropy => entropy(x),
        Atom::LambdaMax => lambda_max(x),
        Atom::LambdaMin => lambda_min(x),
        Atom::LogDet => log_det(x),
    }
}

/// `t >= x`, `t >= -x`.
fn abs(x: &LinOp) -> Result<Graph> {
    let t = new_var(x.shape());
    let constraints = vec![create_leq(x, &t)?, create_leq(&neg_expr(x), &t)?];
    Ok((t, constraints))
}

/// `t >= x`, `t >= 0`.
fn pos(x: &LinOp) -> Result<Graph> {
    let t = new_var(x.shape());
    let constraints = vec![
        create_leq(x, &t)?,
        create_geq(&t, &scalar_const(0.0))?,
    ];
    Ok((t, constraints))
}

fn max_elemwise(ops: &[LinOp], shape: Shape) -> Result<Graph> {
    let t = new_var(shape);
    let constraints = ops
        .iter()
        .map(|op| create_leq(op, &t))
        .collect::<Result<Vec<_>>>()?;
    Ok((t, constraints))
}

fn min_elemwise(ops: &[LinOp], shape: Shape) -> Result<Graph> {
    let t = new_var(shape);
    let constraints = ops
        .iter()
        .map(|op| create_leq(&t, op))
        .collect::<Result<Vec<_>>>()?;
    Ok((t, constraints))
}

fn max_entries(x: &LinOp) -> Result<Graph> {
    let t = new_var(Shape::scalar());
    let constraints = vec![create_leq(x, &t)?];
    Ok((t, constraints))
}

fn min_entries(x: &LinOp) -> Result<Graph> {
    let t = new_var(Shape::scalar());
    let constraints = vec![create_leq(&t, x)?];
    Ok((t, constraints))
}

fn norm_inf(x: &LinOp) -> Result<Graph> {
    let t = new_var(Shape::scalar());
    let constraints = vec![create_leq(x, &t)?, create_leq(&neg_expr(x), &t)?];
    Ok((t, constraints))
}

fn norm2(x: &LinOp) -> Result<Graph> {
    let t = new_var(Shape::scalar());
    let cone = ConeConstraint::Soc(Soc::new(t.clone(), vec![x.clone()]));
    Ok((t, vec![cone]))
}

/// `‖x‖² / y <= t` as `‖(y - t, 2x)‖ <= y + t`, `y >= 0`.
fn quad_over_lin(x: &LinOp, y: &LinOp) -> Result<Graph> {
    let t = new_var(Shape::scalar());
    let two_x = mul_expr(&scalar_const(2.0), x)?;
    let mut constraints = vec![ConeConstraint::Soc(Soc::new(
        sum_expr(&[y.clone(), t.clone()])?,
        vec![sub_expr(y, &t)?, two_x],
    ))];
    if !y.is_constant() {
        constraints.push(create_geq(y, &scalar_const(0.0))?);
    }
    Ok((t, constraints))
}

/// `x² <= t` elementwise as `‖(1 - t, 2x)‖ <= 1 + t`.
fn square(x: &LinOp) -> Result<Graph> {
    let t = new_var(x.shape());
    let one = scalar_const(1.0);
    let cone = SocElemwise::new(
        sum_expr(&[one.clone(), t.clone()])?,
        vec![sub_expr(&one, &t)?, mul_expr(&scalar_const(2.0), x)?],
    );
    Ok((t, vec![ConeConstraint::SocElemwise(cone)]))
}

/// `t <= √x` elementwise as `‖(x - 1, 2t)‖ <= x + 1`.
fn sqrt(x: &LinOp) -> Result<Graph> {
    let t = new_var(x.shape());
    let one = scalar_const(1.0);
    let cone = SocElemwise::new(
        sum_expr(&[x.clone(), one.clone()])?,
        vec![sub_expr(x, &one)?, mul_expr(&scalar_const(2.0), &t)?],
    );
    Ok((t, vec![ConeConstraint::SocElemwise(cone)]))
}

/// `xᵀ P x = ‖Lᵀ x‖²` with `P = L Lᵀ`.
fn quad_form(x: &LinOp, p: &Expr, status: PsdStatus) -> Result<Graph> {
    let p = p.try_value()?;
    let (factor, flip) = match status {
        PsdStatus::Psd => (psd_factor(&p), false),
        PsdStatus::Nsd => (psd_factor(&-p), true),
        PsdStatus::Neither => {
            return Err(CvxError::NotDcp(
                "quad_form needs a positive or negative semidefinite matrix".into(),
            ))
        }
    };
    let y = mul_expr(&dense_const(factor.transpose()), x)?;
    let (t, constraints) = quad_over_lin(&y, &scalar_const(1.0))?;
    if flip {
        Ok((neg_expr(&t), constraints))
    } else {
        Ok((t, constraints))
    }
}

/// `L` with `P = L Lᵀ` for a positive semidefinite `P`.
///
/// Singular matrices have no Cholesky factor; those fall back to
/// `V diag(√λ)` from the eigendecomposition.
fn psd_factor(p: &DMatrix<f64>) -> DMatrix<f64> {
    let sym = (p + p.transpose()) * 0.5;
    if let Some(chol) = sym.clone().cholesky() {
        return chol.l();
    }
    let eig = sym.symmetric_eigen();
    let roots = eig.eigenvalues.map(|l| l.max(0.0).sqrt());
    eig.eigenvectors * DMatrix::from_diagonal(&roots)
}

fn ones_like(x: &LinOp) -> LinOp {
    promote(&scalar_const(1.0), x.shape())
}

/// `e^x <= t` as `(x, 1, t) ∈ K_exp`.
fn exp(x: &LinOp) -> Result<Graph> {
    let t = new_var(x.shape());
    let cone = ExpCone::new(x.clone(), ones_like(x), t.clone());
    Ok((t, vec![ConeConstraint::Exp(cone)]))
}

/// `t <= log x` as `(t, 1, x) ∈ K_exp`.
fn log(x: &LinOp) -> Result<Graph> {
    let t = new_var(x.shape());
    let cone = ExpCone::new(t.clone(), ones_like(x), x.clone());
    Ok((t, vec![ConeConstraint::Exp(cone)]))
}

/// `t <= -x log x` as `(t, x, 1) ∈ K_exp`.
fn entropy(x: &LinOp) -> Result<Graph> {
    let t = new_var(x.shape());
    let cone = ExpCone::new(t.clone(), x.clone(), ones_like(x));
    Ok((t, vec![ConeConstraint::Exp(cone)]))
}

fn scaled_identity(t: &LinOp, n: usize) -> Result<LinOp> {
    mul_expr(&sparse_const(csc_identity(n)), t)
}

/// `t I - A ⪰ 0`.
fn lambda_max(a: &LinOp) -> Result<Graph> {
    let t = new_var(Shape::scalar());
    let ti = scaled_identity(&t, a.shape().rows)?;
    let cone = Sdp::new(sub_expr(&ti, a)?, true);
    Ok((t, vec![ConeConstraint::Sdp(cone)]))
}

/// `A - t I ⪰ 0`, i.e. `-lambda_max(-A)`.
fn lambda_min(a: &LinOp) -> Result<Graph> {
    let t = new_var(Shape::scalar());
    let ti = scaled_identity(&t, a.shape().rows)?;
    let cone = Sdp::new(sub_expr(a, &ti)?, true);
    Ok((t, vec![ConeConstraint::Sdp(cone)]))
}

/// `log det A >= Σ log dᵢ` through
///
/// ```text
/// [ D   Z ]
/// [ Zᵀ  A ] ⪰ 0,   D = diag(d),   Z upper triangular,   diag(Z) = d.
/// ```
fn log_det(a: &LinOp) -> Result<Graph> {
    let n = a.shape().rows;
    let x = new_var(Shape::matrix(2 * n, 2 * n));
    let d_block = index(&x, &IndexSpec::new(0..n, 0..n))?;
    let z = index(&x, &IndexSpec::new(0..n, n..2 * n))?;
    let a_block = index(&x, &IndexSpec::new(n..2 * n, n..2 * n))?;
    let d = diag_mat(&z)?;

    let mut constraints = vec![
        ConeConstraint::Sdp(Sdp::new(x.clone(), true)),
        create_eq(&a_block, a)?,
        create_eq(&d_block, &diag_vec(&d)?)?,
    ];
    if n > 1 {
        let flat = reshape(&z, Shape::vector(n * n))?;
        let lower = mul_expr(&sparse_const(strict_lower_selector(n)), &flat)?;
        constraints.push(create_eq(&lower, &scalar_const(0.0))?);
    }
    let (t, logs) = log(&d)?;
    constraints.extend(logs);
    Ok((sum_entries(&t), constraints))
}

/// Rows picking `Z[i, j]` for `i > j` out of `vec(Z)`.
fn strict_lower_selector(n: usize) -> nalgebra_sparse::CscMatrix<f64> {
    let mut triplets = Triplets::new();
    let mut row = 0;
    for j in 0..n {
        for i in (j + 1)..n {
            triplets.push(row, j * n + i, 1.0);
            row += 1;
        }
    }
    triplets.build(row, n * n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psd_factor_reconstructs() {
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let l = psd_factor(&p);
        assert!((&l * l.transpose() - &p).amax() < 1e-12);

        // singular
        let p = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let l = psd_factor(&p);
        assert!((&l * l.transpose() - &p).amax() < 1e-10);
    }

    #[test]
    fn test_strict_lower_selector() {
        let s = strict_lower_selector(3);
        assert_eq!(s.nrows(), 3);
        let picked: Vec<usize> = s.triplet_iter().map(|(_, c, _)| c).collect();
        assert_eq!(picked, vec![1, 2, 5]);
    }

    #[test]
    fn test_epigraph_constraint_counts() {
        let x = new_var(Shape::vector(4));
        assert_eq!(abs(&x).unwrap().1.len(), 2);
        assert_eq!(norm2(&x).unwrap().1.len(), 1);
        assert_eq!(quad_over_lin(&x, &scalar_const(1.0)).unwrap().1.len(), 1);
        let y = new_var(Shape::scalar());
        assert_eq!(quad_over_lin(&x, &y).unwrap().1.len(), 2);
        let (t, c) = log_det(&new_var(Shape::matrix(3, 3))).unwrap();
        assert!(t.shape().is_scalar());
        // sdp, A block, D block, lower triangle, exp cone
        assert_eq!(c.len(), 5);
    }
}
