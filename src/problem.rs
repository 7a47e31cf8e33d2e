//! Problem definition and solving API.
//!
//! The `Problem` struct represents an optimization problem with:
//! - An objective (minimize or maximize)
//! - A set of constraints
//!
//! Use the builder pattern to construct problems:
//! ```ignore
//! let solution = Problem::minimize(objective)
//!     .subject_to([constraint1, constraint2])
//!     .solve()?;
//! ```
//!
//! Solving runs the whole pipeline from scratch each time: DCP check,
//! canonicalization, cone formatting, backend choice, coefficient extraction,
//! the numeric solve, and the scatter of primal and dual values back onto
//! variables and constraints.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use log::{debug, info, warn};
use nalgebra::DMatrix;

use crate::canon::builders::neg_expr;
use crate::canon::LinOp;
use crate::constraints::{Constraint, ConstraintKind};
use crate::error::{CvxError, Result};
use crate::expr::{Expr, ExprId, IntoExpr, Shape};
use crate::solver::backend::validate_backend;
use crate::solver::{
    Backend, ConstraintBuckets, ProblemData, RawSolution, Settings, Solution, SolveStatus,
    SolverKind,
};

/// Objective type for optimization problems.
#[derive(Debug, Clone)]
pub enum Objective {
    /// Minimize the expression.
    Minimize(Expr),
    /// Maximize the expression (internally converted to minimization).
    Maximize(Expr),
}

impl Objective {
    /// Get the expression being optimized.
    pub fn expr(&self) -> &Expr {
        match self {
            Objective::Minimize(e) | Objective::Maximize(e) => e,
        }
    }

    /// Check if this is a minimization.
    pub fn is_minimize(&self) -> bool {
        matches!(self, Objective::Minimize(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct SolveRecord {
    status: SolveStatus,
    value: Option<f64>,
}

/// An optimization problem.
#[derive(Debug)]
pub struct Problem {
    /// The objective to optimize.
    pub objective: Objective,
    /// The constraints.
    pub constraints: Vec<Constraint>,
    last: RwLock<Option<SolveRecord>>,
}

impl Clone for Problem {
    fn clone(&self) -> Self {
        Problem {
            objective: self.objective.clone(),
            constraints: self.constraints.clone(),
            last: RwLock::new(self.record()),
        }
    }
}

impl Problem {
    /// Create a minimization problem.
    pub fn minimize(expr: impl IntoExpr) -> ProblemBuilder {
        ProblemBuilder {
            objective: Objective::Minimize(expr.into_expr()),
            constraints: Vec::new(),
        }
    }

    /// Create a maximization problem.
    pub fn maximize(expr: impl IntoExpr) -> ProblemBuilder {
        ProblemBuilder {
            objective: Objective::Maximize(expr.into_expr()),
            constraints: Vec::new(),
        }
    }

    /// Check if this problem is DCP-compliant.
    ///
    /// A problem is DCP if:
    /// - Minimize: objective is convex
    /// - Maximize: objective is concave
    /// - All constraints are DCP
    pub fn is_dcp(&self) -> bool {
        let obj_valid = match &self.objective {
            Objective::Minimize(e) => e.is_convex(),
            Objective::Maximize(e) => e.is_concave(),
        };

        obj_valid && self.constraints.iter().all(|c| c.is_dcp())
    }

    /// Status of the last solve, `None` before the first one.
    pub fn status(&self) -> Option<SolveStatus> {
        self.record().map(|r| r.status)
    }

    /// Objective value of the last solve.
    ///
    /// Infinite for infeasible and unbounded problems, `None` before the
    /// first solve or after a solver error.
    pub fn value(&self) -> Option<f64> {
        self.record().and_then(|r| r.value)
    }

    /// Get all variables in this problem, sorted by id.
    pub fn variables(&self) -> Vec<Expr> {
        let mut vars = self.objective.expr().variables();
        for c in &self.constraints {
            vars.extend(c.variables());
        }
        vars.sort_by_key(|v| v.id());
        vars.dedup_by_key(|v| v.id());
        vars
    }

    /// Get all parameters in this problem, sorted by id.
    pub fn parameters(&self) -> Vec<Expr> {
        let mut params = self.objective.expr().parameters();
        for c in &self.constraints {
            params.extend(c.expr().parameters());
        }
        params.sort_by_key(|p| p.id());
        params.dedup_by_key(|p| p.id());
        params
    }

    /// Lower the problem to a scalar objective LinOp (negated for
    /// maximization) and deduplicated cone records.
    pub fn canonicalize(&self) -> Result<(LinOp, ConstraintBuckets)> {
        let obj_expr = self.objective.expr();
        if !obj_expr.is_scalar() {
            return Err(CvxError::InvalidProblem(format!(
                "objective must be scalar, got shape {}",
                obj_expr.shape()
            )));
        }

        let form = obj_expr.canonical_form()?;
        let objective = match &self.objective {
            Objective::Minimize(_) => form.expr.clone(),
            Objective::Maximize(_) => neg_expr(&form.expr),
        };

        let mut buckets = ConstraintBuckets::new();
        for cone in &form.constraints {
            buckets.push(cone.clone());
        }
        let mut seen = HashSet::new();
        for c in &self.constraints {
            if !seen.insert(c.id()) {
                continue;
            }
            for cone in c.canonicalize()? {
                buckets.push(cone);
            }
        }

        debug!(
            "canonicalized: {} cone records ({} eq, {} leq, {} soc, {} soc elementwise, {} exp, {} sdp)",
            buckets.len(),
            buckets.eq.len(),
            buckets.leq.len(),
            buckets.soc.len(),
            buckets.soc_elemwise.len(),
            buckets.exp.len(),
            buckets.sdp.len()
        );
        Ok((objective, buckets))
    }

    /// Numeric problem data, as the given (or automatically chosen) solver
    /// would receive it.
    pub fn get_problem_data(&self, solver: Option<SolverKind>) -> Result<ProblemData> {
        let (_, data) = self.prepare(solver)?;
        Ok(data)
    }

    /// Solve the problem with default settings.
    pub fn solve(&self) -> Result<Solution> {
        self.solve_with(Settings::default())
    }

    /// Solve the problem with custom settings.
    ///
    /// Returns `Err` for malformed problems (not DCP, shape errors, a solver
    /// lacking a required cone). Infeasible, unbounded and failed solves
    /// return `Ok` with the corresponding [`SolveStatus`].
    pub fn solve_with(&self, settings: Settings) -> Result<Solution> {
        self.check_dcp(&settings)?;
        let (kind, data) = self.prepare(settings.solver)?;
        let backend = kind.backend();
        self.run(backend.as_ref(), &data, &settings)
    }

    /// Solve with a caller-provided backend.
    pub fn solve_with_backend(&self, backend: &dyn Backend, settings: Settings) -> Result<Solution> {
        self.check_dcp(&settings)?;
        let (objective, buckets) = self.canonicalize()?;
        let formatted = buckets.format()?;
        validate_backend(backend.name(), &backend.capabilities(), &formatted.dims)?;
        let data = ProblemData::build(&objective, &formatted)?;
        self.run(backend, &data, &settings)
    }

    fn check_dcp(&self, settings: &Settings) -> Result<()> {
        if self.is_dcp() {
            return Ok(());
        }
        let message = self.dcp_violation_message();
        if settings.ignore_dcp {
            warn!("solving a problem that is not DCP: {}", message);
            Ok(())
        } else {
            Err(CvxError::NotDcp(message))
        }
    }

    fn prepare(&self, solver: Option<SolverKind>) -> Result<(SolverKind, ProblemData)> {
        let (objective, buckets) = self.canonicalize()?;
        let formatted = buckets.format()?;
        let kind = match solver {
            Some(kind) => {
                kind.validate(&formatted.dims)?;
                kind
            }
            None => SolverKind::choose(&formatted.dims)?,
        };
        debug!("solver {} for cones {:?}", kind, formatted.dims);
        let data = ProblemData::build(&objective, &formatted)?;
        Ok((kind, data))
    }

    fn run(&self, backend: &dyn Backend, data: &ProblemData, settings: &Settings) -> Result<Solution> {
        let raw = backend.solve(data, settings)?;
        info!(
            "{} finished: {:?} after {} iterations",
            backend.name(),
            raw.status,
            raw.iterations
        );
        let solution = self.scatter(backend.name(), data, &raw)?;
        self.set_record(SolveRecord {
            status: solution.status,
            value: solution.value,
        });
        Ok(solution)
    }

    /// Write primal and dual values back onto variables and constraints.
    ///
    /// On any non-optimal status every slot is cleared.
    fn scatter(&self, solver: &'static str, data: &ProblemData, raw: &RawSolution) -> Result<Solution> {
        let minimize = self.objective.is_minimize();
        let mut solution = Solution {
            status: raw.status,
            value: None,
            primal: None,
            dual: None,
            solver,
            solve_time: raw.solve_time,
            iterations: raw.iterations,
        };

        if raw.status != SolveStatus::Optimal {
            self.clear_values();
            solution.value = match (raw.status, minimize) {
                (SolveStatus::Infeasible, true) | (SolveStatus::Unbounded, false) => {
                    Some(f64::INFINITY)
                }
                (SolveStatus::Infeasible, false) | (SolveStatus::Unbounded, true) => {
                    Some(f64::NEG_INFINITY)
                }
                _ => None,
            };
            return Ok(solution);
        }

        let value = raw.objective + data.offset;
        solution.value = Some(if minimize { value } else { -value });

        let mut primal = HashMap::new();
        for var in self.variables() {
            let Some(id) = var.id() else { continue };
            match data.var_offsets.get(&id) {
                Some((start, shape)) => {
                    let m = reshape_slice(&raw.x, *start, *shape)?;
                    var.set_value(m.clone())?;
                    primal.insert(id, m);
                }
                None => var.clear_value(),
            }
        }

        let mut dual = HashMap::new();
        for c in &self.constraints {
            let (offsets, values): (&BTreeMap<ExprId, (usize, usize)>, &[f64]) = match c.kind() {
                ConstraintKind::Eq(_) => (&data.eq_offsets, raw.y.as_slice()),
                ConstraintKind::Leq(_) | ConstraintKind::Psd(_) => (&data.ineq_offsets, raw.z.as_slice()),
            };
            let shape = c.expr().shape();
            match offsets.get(&c.id()) {
                Some((start, len)) if *len == shape.size() => {
                    let m = reshape_slice(values, *start, shape)?;
                    c.dual_slot().set(m.clone());
                    dual.insert(c.id(), m);
                }
                _ => c.dual_slot().clear(),
            }
        }

        solution.primal = Some(primal);
        solution.dual = Some(dual);
        Ok(solution)
    }

    fn clear_values(&self) {
        for var in self.variables() {
            var.clear_value();
        }
        for c in &self.constraints {
            c.dual_slot().clear();
        }
    }

    fn record(&self) -> Option<SolveRecord> {
        *self.last.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_record(&self, record: SolveRecord) {
        *self.last.write().unwrap_or_else(|e| e.into_inner()) = Some(record);
    }

    /// Get a message describing why the problem is not DCP.
    fn dcp_violation_message(&self) -> String {
        let mut violations = Vec::new();

        match &self.objective {
            Objective::Minimize(e) if !e.is_convex() => {
                violations.push(format!(
                    "Objective has curvature {:?} but must be convex for minimization",
                    e.curvature()
                ));
            }
            Objective::Maximize(e) if !e.is_concave() => {
                violations.push(format!(
                    "Objective has curvature {:?} but must be concave for maximization",
                    e.curvature()
                ));
            }
            _ => {}
        }

        for (i, c) in self.constraints.iter().enumerate() {
            if !c.is_dcp() {
                violations.push(format!("Constraint {} ({}) is not DCP", i, c));
            }
        }

        if violations.is_empty() {
            "Unknown DCP violation".into()
        } else {
            violations.join("; ")
        }
    }
}

fn reshape_slice(values: &[f64], start: usize, shape: Shape) -> Result<DMatrix<f64>> {
    let end = start + shape.size();
    let slice = values.get(start..end).ok_or_else(|| {
        CvxError::SolverError(format!(
            "solver returned {} values, expected at least {}",
            values.len(),
            end
        ))
    })?;
    Ok(DMatrix::from_column_slice(shape.rows, shape.cols, slice))
}

/// Builder for constructing problems.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    objective: Objective,
    constraints: Vec<Constraint>,
}

impl ProblemBuilder {
    /// Add constraints to the problem.
    pub fn subject_to(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Add a single constraint.
    pub fn constraint(mut self, c: Constraint) -> Self {
        self.constraints.push(c);
        self
    }

    /// Build the problem.
    pub fn build(self) -> Problem {
        Problem {
            objective: self.objective,
            constraints: self.constraints,
            last: RwLock::new(None),
        }
    }

    /// Build and solve the problem with default settings.
    pub fn solve(self) -> Result<Solution> {
        self.build().solve()
    }

    /// Build and solve the problem with custom settings.
    pub fn solve_with(self, settings: Settings) -> Result<Solution> {
        self.build().solve_with(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::{log, norm2, sum};
    use crate::constraints::ConstraintExt;
    use crate::expr::{constant, variable};

    #[test]
    fn test_problem_builder() {
        let x = variable(5);
        let problem = Problem::minimize(sum(&x)).build();
        assert!(problem.is_dcp());
        assert!(problem.status().is_none());
        assert!(problem.value().is_none());
    }

    #[test]
    fn test_minimize_convex_is_dcp() {
        let x = variable(5);
        let problem = Problem::minimize(norm2(&x)).build();
        assert!(problem.is_dcp());
    }

    #[test]
    fn test_maximize_convex_not_dcp() {
        let x = variable(5);
        let problem = Problem::maximize(norm2(&x)).build();
        assert!(!problem.is_dcp());
        assert!(matches!(problem.solve(), Err(CvxError::NotDcp(_))));
    }

    #[test]
    fn test_minimize_concave_not_dcp() {
        let x = variable(5);
        let problem = Problem::minimize(-norm2(&x)).build();
        assert!(!problem.is_dcp());
    }

    #[test]
    fn test_maximize_concave_is_dcp() {
        let x = variable(5);
        let problem = Problem::maximize(-norm2(&x)).build();
        assert!(problem.is_dcp());
    }

    #[test]
    fn test_problem_with_constraints() {
        let x = variable(5);
        let c = constant(1.0);
        let problem = Problem::minimize(sum(&x)).subject_to([x.geq(&c)]).build();
        assert!(problem.is_dcp());
    }

    #[test]
    fn test_variables_sorted_and_deduped() {
        let x = variable(2);
        let y = variable(3);
        let problem = Problem::minimize(sum(&y) + sum(&x))
            .subject_to([x.geq(0.0), y.geq(0.0), x.leq(1.0)])
            .build();
        let vars = problem.variables();
        assert_eq!(vars.len(), 2);
        assert!(vars[0].id() < vars[1].id());
    }

    #[test]
    fn test_canonicalize_dedupes_repeated_constraint() {
        let x = variable(3);
        let c = norm2(&x).leq(1.0);
        let problem = Problem::minimize(sum(&x))
            .subject_to([c.clone(), c])
            .build();
        let (_, buckets) = problem.canonicalize().unwrap();
        assert_eq!(buckets.leq.len(), 1);
        assert_eq!(buckets.soc.len(), 1);
    }

    #[test]
    fn test_non_scalar_objective_rejected() {
        let x = variable(3);
        let problem = Problem::minimize(&x).build();
        assert!(matches!(
            problem.canonicalize(),
            Err(CvxError::InvalidProblem(_))
        ));
    }

    #[test]
    fn test_problem_data_exposed() {
        let x = variable(2);
        let problem = Problem::maximize(sum(&log(&x)))
            .subject_to([sum(&x).equals(1.0)])
            .build();
        let data = problem.get_problem_data(None).unwrap();
        assert_eq!(data.dims.eq, 1);
        assert_eq!(data.dims.exp, 2);
        assert_eq!(data.eq_offsets.len(), 1);
    }

    #[test]
    fn test_solve_simple_lp() {
        // Minimize sum(x) subject to x >= 1
        // Optimal: x = [1, 1, 1, 1, 1], value = 5
        let x = variable(5);
        let one = constant(1.0);
        let problem = Problem::minimize(sum(&x)).subject_to([x.geq(&one)]).build();
        let result = problem.solve().expect("solve failed");

        assert_eq!(result.status, SolveStatus::Optimal);
        let value = result.value.expect("no value");
        assert!((value - 5.0).abs() < 1e-4, "Expected ~5.0, got {}", value);
        assert_eq!(problem.status(), Some(SolveStatus::Optimal));
        let xv = x.value().expect("x should be set");
        assert!(xv.iter().all(|v| (v - 1.0).abs() < 1e-4));
    }

    #[test]
    fn test_solve_norm2_minimization() {
        // Minimize ||x||_2 subject to sum(x) = 5
        // Optimal: x = [1, 1, 1, 1, 1], ||x||_2 = sqrt(5)
        let x = variable(5);
        let five = constant(5.0);
        let result = Problem::minimize(norm2(&x))
            .subject_to([sum(&x).equals(&five)])
            .solve()
            .expect("solve failed");

        assert_eq!(result.status, SolveStatus::Optimal);
        let value = result.value.expect("no value");
        let expected = (5.0_f64).sqrt();
        assert!(
            (value - expected).abs() < 1e-3,
            "Expected ~{}, got {}",
            expected,
            value
        );
    }

    #[test]
    fn test_failure_clears_values() {
        let x = variable(());
        x.set_value(3.0).unwrap();
        let c = x.geq(2.0);
        let problem = Problem::minimize(&x)
            .subject_to([c.clone(), x.leq(1.0)])
            .build();
        let solution = problem.solve().unwrap();
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert_eq!(problem.value(), Some(f64::INFINITY));
        assert!(x.value().is_none());
        assert!(c.dual_value().is_none());
    }
}
