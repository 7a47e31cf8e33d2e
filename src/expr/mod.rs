//! Expression types and creation utilities.
//!
//! This module provides the core expression types for building optimization problems:
//! - `Expr` - a shared handle to an expression node
//! - `Shape` - two-dimensional shape information
//! - `Array` - numeric values (scalar, dense, sparse)
//! - Variable creation via `variable()` and `VariableBuilder`
//! - Parameter creation via `parameter()` and `ParameterBuilder`
//! - Constant creation via `constant()` and related functions

pub mod array;
pub mod constant;
pub mod expression;
pub mod index;
pub mod parameter;
pub mod shape;
pub mod variable;

pub use array::Array;
pub use constant::{
    constant, constant_dmatrix, constant_matrix, constant_sparse, constant_vec, eye, ones, zeros,
    IntoExpr,
};
pub use expression::{Expr, ExprId, ExprKind, ParameterData, ValueSlot, VariableData};
pub use index::{IndexSpec, Slice};
pub use parameter::{parameter, ParameterBuilder};
pub use shape::Shape;
pub use variable::{named_variable, variable, VariableBuilder};
