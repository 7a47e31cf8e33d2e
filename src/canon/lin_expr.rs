//! Merged affine form of an extracted operator.
//!
//! After extraction, an operator is represented as `sum_i(A_i * vec(x_i)) + b`
//! with one sparse coefficient block per distinct variable.

use std::collections::BTreeMap;

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;

use crate::error::Result;
use crate::expr::{ExprId, Shape};
use crate::sparse::{csc_add, csc_neg};

use super::coefficients::{get_coefficients, CoeffKey, CoeffTerm};
use super::lin_op::LinOp;

/// An affine expression in standard form: sum_i(A_i * x_i) + b
///
/// Each term is a sparse coefficient matrix multiplied by a variable.
/// The constant term `b` is a dense column.
#[derive(Debug, Clone)]
pub struct LinExpr {
    /// Coefficient blocks keyed by variable id, each `(size, var_size)`.
    pub coeffs: BTreeMap<ExprId, CscMatrix<f64>>,
    /// Shapes of the variables in `coeffs`.
    pub var_shapes: BTreeMap<ExprId, Shape>,
    /// Constant term, column-major.
    pub constant: DVector<f64>,
    /// Output shape of this expression.
    pub shape: Shape,
}

impl LinExpr {
    /// Create a zero affine expression with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        LinExpr {
            coeffs: BTreeMap::new(),
            var_shapes: BTreeMap::new(),
            constant: DVector::zeros(shape.size()),
            shape,
        }
    }

    /// Extract and merge the coefficients of an operator.
    pub fn from_op(op: &LinOp) -> Result<Self> {
        Ok(Self::from_terms(op.shape(), get_coefficients(op)?))
    }

    /// Merge raw coefficient blocks, summing duplicate keys.
    pub fn from_terms(shape: Shape, terms: Vec<CoeffTerm>) -> Self {
        let mut out = LinExpr::zeros(shape);
        for term in terms {
            match term.key {
                CoeffKey::Constant => {
                    for (r, _, v) in term.coeff.triplet_iter() {
                        out.constant[r] += *v;
                    }
                }
                CoeffKey::Var(id) => {
                    out.var_shapes.insert(id, term.shape);
                    out.coeffs
                        .entry(id)
                        .and_modify(|c| *c = csc_add(c, &term.coeff))
                        .or_insert(term.coeff);
                }
            }
        }
        out
    }

    /// Check if this is a constant (no variables).
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Get the output size (flattened).
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Negate an affine expression.
    pub fn neg(&self) -> LinExpr {
        LinExpr {
            coeffs: self.coeffs.iter().map(|(k, v)| (*k, csc_neg(v))).collect(),
            var_shapes: self.var_shapes.clone(),
            constant: -&self.constant,
            shape: self.shape,
        }
    }

    /// Evaluate at the given variable values (column-major vectors).
    ///
    /// Variables without a value contribute zero.
    pub fn evaluate(&self, values: &BTreeMap<ExprId, DVector<f64>>) -> DVector<f64> {
        let mut out = self.constant.clone();
        for (id, coeff) in &self.coeffs {
            if let Some(x) = values.get(id) {
                for (r, c, v) in coeff.triplet_iter() {
                    out[r] += v * x[c];
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::builders::*;
    use nalgebra::DMatrix;

    #[test]
    fn test_duplicate_variables_merge() {
        let id = ExprId::new();
        let x = create_var(Shape::vector(2), id);
        let op = sum_expr(&[x.clone(), x.clone(), scalar_const(1.0)]).unwrap();
        let e = LinExpr::from_op(&op).unwrap();
        assert_eq!(e.coeffs.len(), 1);
        assert_eq!(e.var_shapes[&id], Shape::vector(2));
        let mut values = BTreeMap::new();
        values.insert(id, DVector::from_vec(vec![1.0, 2.0]));
        assert_eq!(e.evaluate(&values).as_slice(), &[3.0, 5.0]);
        assert_eq!(e.neg().evaluate(&values).as_slice(), &[-3.0, -5.0]);
    }

    #[test]
    fn test_constant_expression() {
        let op = dense_const(DMatrix::from_row_slice(2, 1, &[4.0, -1.0]));
        let e = LinExpr::from_op(&op).unwrap();
        assert!(e.is_constant());
        assert_eq!(e.constant.as_slice(), &[4.0, -1.0]);
    }
}
