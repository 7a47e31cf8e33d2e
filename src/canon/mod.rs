//! Canonicalization: lowering expressions to the LinOp IR.
//!
//! This module converts DCP expressions into:
//! - LinOp trees for the affine parts (`lin_op`, `builders`)
//! - Cone constraint records for nonlinear atoms (`cone`)
//! - Sparse coefficient blocks (`coefficients`, `lin_expr`)
//! - Matrix-free forward/adjoint evaluation (`matrix_free`)

pub mod builders;
pub mod canonicalize;
pub mod coefficients;
pub mod cone;
pub mod lin_expr;
pub mod lin_op;
pub mod matrix_free;

pub use canonicalize::CanonicalForm;
pub use coefficients::{const_value, get_coefficients, CoeffKey, CoeffTerm};
pub use cone::{
    ConeConstraint, ExpCone, FormattedCone, LinEqConstr, LinLeqConstr, Sdp, Soc, SocElemwise,
};
pub use lin_expr::LinExpr;
pub use lin_op::{LinOp, LinOpKind};
pub use matrix_free::{mul, prune_constants, tmul, LinOpOperator, Operator};
