//! Solver interface for cvxlin.
//!
//! This module provides:
//! - Solver settings and the shared solution types
//! - The [`Backend`] trait and backend capabilities
//! - Problem data assembly ("stuffing") from formatted cone constraints
//! - Clarabel solver integration

pub mod backend;
pub mod clarabel;
pub mod data;

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::constraints::Constraint;
use crate::error::{CvxError, Result};
use crate::expr::{Expr, ExprId};

pub use self::clarabel::ClarabelBackend;
pub use backend::{Backend, Capabilities, RawSolution, SolverKind};
pub use data::{ConeDims, ConstraintBuckets, FormattedConstraints, ProblemData};

/// Solution status shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// The solver stopped without a certificate (iteration limit,
    /// numerical trouble, ...).
    SolverError,
}

impl SolveStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

/// Solver settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds.
    pub time_limit: f64,
    /// Absolute duality gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality gap tolerance.
    pub tol_gap_rel: f64,
    /// Feasibility tolerance.
    pub tol_feas: f64,
    /// Backend to use; picked from the problem's cones when `None`.
    pub solver: Option<SolverKind>,
    /// Solve non-DCP problems anyway (with a warning).
    pub ignore_dcp: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            tol_feas: 1e-8,
            solver: None,
            ignore_dcp: false,
        }
    }
}

/// Solution of a problem.
///
/// Primal and dual values are also written into the variables and
/// constraints themselves; this struct keeps a copy keyed by id.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status.
    pub status: SolveStatus,
    /// Objective value: finite when optimal, `+∞`/`-∞` for infeasible or
    /// unbounded problems (by sense), `None` on solver error.
    pub value: Option<f64>,
    /// Primal variable values by variable id (if solved).
    pub primal: Option<HashMap<ExprId, DMatrix<f64>>>,
    /// Dual values by constraint id (if solved).
    pub dual: Option<HashMap<ExprId, DMatrix<f64>>>,
    /// Name of the backend that ran.
    pub solver: &'static str,
    /// Solve time in seconds.
    pub solve_time: f64,
    /// Number of iterations.
    pub iterations: u32,
}

impl Solution {
    /// Get the value of a variable.
    pub fn get_value(&self, var_id: ExprId) -> Option<&DMatrix<f64>> {
        self.primal.as_ref().and_then(|p| p.get(&var_id))
    }

    /// Get scalar value for a variable.
    ///
    /// # Panics
    ///
    /// Panics if the expression is not a variable, the variable is not in the
    /// solution, or the variable is not scalar. Use `try_value()` for explicit
    /// error handling, or index operator `solution[&x]` for vectors/matrices.
    pub fn value(&self, var: &Expr) -> f64 {
        self.try_value(var).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Get scalar value for a variable, returning an error on failure.
    pub fn try_value(&self, var: &Expr) -> Result<f64> {
        let m = self.lookup(var)?;
        if m.nrows() == 1 && m.ncols() == 1 {
            Ok(m[(0, 0)])
        } else {
            Err(CvxError::InvalidArgument(
                "variable is not scalar; use the index operator for vectors/matrices".into(),
            ))
        }
    }

    /// Dual value of a constraint, if the problem was solved.
    pub fn constraint_dual(&self, constraint: &Constraint) -> Option<&DMatrix<f64>> {
        self.dual.as_ref().and_then(|d| d.get(&constraint.id()))
    }

    /// Check if the solution has dual values available.
    pub fn has_duals(&self) -> bool {
        self.dual.is_some()
    }

    fn lookup(&self, var: &Expr) -> Result<&DMatrix<f64>> {
        if !var.is_variable() {
            return Err(CvxError::InvalidArgument(
                "expression is not a variable".into(),
            ));
        }
        var.id()
            .and_then(|id| self.get_value(id))
            .ok_or_else(|| CvxError::MissingValue("variable not in solution".into()))
    }
}

impl std::ops::Index<&Expr> for Solution {
    type Output = DMatrix<f64>;

    /// Get the matrix/vector value of a variable.
    ///
    /// # Panics
    ///
    /// Panics if the variable is not in the solution.
    fn index(&self, var: &Expr) -> &DMatrix<f64> {
        self.lookup(var).unwrap_or_else(|e| panic!("{}", e))
    }
}
