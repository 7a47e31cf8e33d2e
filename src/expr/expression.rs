//! Core expression types for cvxlin.
//!
//! An [`Expr`] is a cheap handle to an immutable node. Nodes form a DAG
//! through `Arc` sharing; each node carries its DCP attributes, fixed at
//! construction, and a compute-once slot for its canonical form.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use nalgebra::DMatrix;

use crate::atoms::Atom;
use crate::canon::CanonicalForm;
use crate::dcp::{Curvature, DcpAttr, Sign};
use crate::error::{CvxError, Result};

use super::array::Array;
use super::shape::Shape;

/// Unique identifier for variables, parameters and constraints.
///
/// Ids come from a process-wide monotonic counter, so they order by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(u64);

impl ExprId {
    /// Generate a new unique ID.
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        ExprId(NEXT_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A mutable value slot shared by every handle to a node.
#[derive(Debug, Default)]
pub struct ValueSlot(RwLock<Option<DMatrix<f64>>>);

impl ValueSlot {
    pub fn get(&self) -> Option<DMatrix<f64>> {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, value: DMatrix<f64>) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = Some(value);
    }

    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_set(&self) -> bool {
        self.0.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

/// Data for a variable expression.
#[derive(Debug)]
pub struct VariableData {
    /// Unique identifier.
    pub id: ExprId,
    /// Optional name for display.
    pub name: Option<String>,
    /// Primal value, set after a successful solve.
    pub value: ValueSlot,
}

/// Data for a parameter expression.
#[derive(Debug)]
pub struct ParameterData {
    /// Unique identifier.
    pub id: ExprId,
    /// Optional name for display.
    pub name: Option<String>,
    /// Declared sign; every value must respect it.
    pub sign: Sign,
    /// Current value, folded in at extraction time.
    pub value: ValueSlot,
}

/// What a node is.
#[derive(Debug)]
pub enum ExprKind {
    /// A decision variable.
    Variable(VariableData),
    /// A constant value.
    Constant(Array),
    /// A constant whose value may change between solves.
    Parameter(ParameterData),
    /// An atom applied to the node's arguments.
    Atom(Atom),
}

#[derive(Debug)]
pub(crate) struct Node {
    kind: ExprKind,
    args: Vec<Expr>,
    attr: DcpAttr,
    canonical: OnceLock<CanonicalForm>,
}

/// An expression: a shared, immutable node in the expression DAG.
#[derive(Clone)]
pub struct Expr(Arc<Node>);

impl Expr {
    pub(crate) fn from_parts(kind: ExprKind, args: Vec<Expr>, attr: DcpAttr) -> Self {
        Expr(Arc::new(Node {
            kind,
            args,
            attr,
            canonical: OnceLock::new(),
        }))
    }

    /// Create a variable leaf.
    pub(crate) fn new_variable(shape: Shape, name: Option<String>) -> Self {
        let data = VariableData {
            id: ExprId::new(),
            name,
            value: ValueSlot::default(),
        };
        let attr = DcpAttr::new(Sign::Unknown, Curvature::Affine, shape);
        Self::from_parts(ExprKind::Variable(data), Vec::new(), attr)
    }

    /// Create a constant leaf.
    pub(crate) fn new_constant(value: Array) -> Self {
        let attr = DcpAttr::new(value.sign(), Curvature::Constant, value.shape());
        Self::from_parts(ExprKind::Constant(value), Vec::new(), attr)
    }

    /// Create a parameter leaf.
    pub(crate) fn new_parameter(shape: Shape, sign: Sign, name: Option<String>) -> Self {
        let data = ParameterData {
            id: ExprId::new(),
            name,
            sign,
            value: ValueSlot::default(),
        };
        let attr = DcpAttr::new(sign, Curvature::Constant, shape);
        Self::from_parts(ExprKind::Parameter(data), Vec::new(), attr)
    }

    /// What this node is.
    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Ordered arguments (empty for leaves).
    pub fn args(&self) -> &[Expr] {
        &self.0.args
    }

    /// Sign, curvature and shape.
    pub fn attr(&self) -> DcpAttr {
        self.0.attr
    }

    pub fn shape(&self) -> Shape {
        self.0.attr.shape
    }

    pub fn sign(&self) -> Sign {
        self.0.attr.sign
    }

    pub fn curvature(&self) -> Curvature {
        self.0.attr.curvature
    }

    pub(crate) fn canonical_slot(&self) -> &OnceLock<CanonicalForm> {
        &self.0.canonical
    }

    /// Check if this expression is convex.
    pub fn is_convex(&self) -> bool {
        self.curvature().is_convex()
    }

    /// Check if this expression is concave.
    pub fn is_concave(&self) -> bool {
        self.curvature().is_concave()
    }

    /// Check if this expression is affine.
    pub fn is_affine(&self) -> bool {
        self.curvature().is_affine()
    }

    /// Check if this expression is constant.
    pub fn is_constant(&self) -> bool {
        self.curvature().is_constant()
    }

    /// Check if the curvature is known under the DCP rules.
    pub fn is_dcp(&self) -> bool {
        self.curvature().is_dcp()
    }

    /// Check if this expression is non-negative.
    pub fn is_nonneg(&self) -> bool {
        self.sign().is_nonneg()
    }

    /// Check if this expression is non-positive.
    pub fn is_nonpos(&self) -> bool {
        self.sign().is_nonpos()
    }

    /// Check if this is a scalar expression.
    pub fn is_scalar(&self) -> bool {
        self.shape().is_scalar()
    }

    /// Check if this is a variable leaf.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind(), ExprKind::Variable(_))
    }

    /// Check if this is a parameter leaf.
    pub fn is_parameter(&self) -> bool {
        matches!(self.kind(), ExprKind::Parameter(_))
    }

    /// Id of a variable or parameter leaf.
    pub fn id(&self) -> Option<ExprId> {
        match self.kind() {
            ExprKind::Variable(v) => Some(v.id),
            ExprKind::Parameter(p) => Some(p.id),
            _ => None,
        }
    }

    /// Name of a variable or parameter leaf, if one was given.
    pub fn name(&self) -> Option<&str> {
        match self.kind() {
            ExprKind::Variable(v) => v.name.as_deref(),
            ExprKind::Parameter(p) => p.name.as_deref(),
            _ => None,
        }
    }

    /// Whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Atom of an interior node.
    pub fn atom(&self) -> Option<&Atom> {
        match self.kind() {
            ExprKind::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// Constant value of a constant leaf.
    pub fn constant_value(&self) -> Option<&Array> {
        match self.kind() {
            ExprKind::Constant(a) => Some(a),
            _ => None,
        }
    }

    /// Numeric value of the expression, if every leaf has a value.
    pub fn value(&self) -> Option<DMatrix<f64>> {
        self.try_value().ok()
    }

    /// Numeric value of the expression.
    ///
    /// # Errors
    ///
    /// Returns `MissingValue` if a variable or parameter below has no value.
    pub fn try_value(&self) -> Result<DMatrix<f64>> {
        match self.kind() {
            ExprKind::Constant(a) => Ok(a.to_dense()),
            ExprKind::Variable(v) => v
                .value
                .get()
                .ok_or_else(|| CvxError::MissingValue(format!("variable {}", self.describe()))),
            ExprKind::Parameter(p) => p
                .value
                .get()
                .ok_or_else(|| CvxError::MissingValue(format!("parameter {}", self.describe()))),
            ExprKind::Atom(atom) => {
                let values = self
                    .args()
                    .iter()
                    .map(|a| a.try_value())
                    .collect::<Result<Vec<_>>>()?;
                Ok(atom.numeric(&values, self.shape()))
            }
        }
    }

    /// Value of a scalar expression.
    pub fn scalar_value(&self) -> Option<f64> {
        let v = self.value()?;
        if v.nrows() == 1 && v.ncols() == 1 {
            Some(v[(0, 0)])
        } else {
            None
        }
    }

    /// Set the value of a variable or parameter.
    ///
    /// # Errors
    ///
    /// Fails on shape mismatch, on a parameter value with the wrong sign, and
    /// on any other kind of node.
    pub fn set_value(&self, value: impl Into<Array>) -> Result<()> {
        let value: Array = value.into();
        if value.shape() != self.shape() {
            return Err(CvxError::ShapeMismatch {
                expected: self.shape().to_string(),
                got: value.shape().to_string(),
            });
        }
        match self.kind() {
            ExprKind::Variable(v) => {
                v.value.set(value.to_dense());
                Ok(())
            }
            ExprKind::Parameter(p) => {
                let ok = match p.sign {
                    Sign::Nonnegative => value.is_nonneg(),
                    Sign::Nonpositive => value.is_nonpos(),
                    Sign::Zero => value.sign().is_zero(),
                    Sign::Unknown => true,
                };
                if !ok {
                    return Err(CvxError::ParameterSign {
                        expected: p.sign.to_string(),
                    });
                }
                p.value.set(value.to_dense());
                Ok(())
            }
            _ => Err(CvxError::InvalidArgument(
                "only variables and parameters hold values".into(),
            )),
        }
    }

    /// Clear the value slot of a variable or parameter.
    pub fn clear_value(&self) {
        match self.kind() {
            ExprKind::Variable(v) => v.value.clear(),
            ExprKind::Parameter(p) => p.value.clear(),
            _ => {}
        }
    }

    /// Distinct variables in this expression, sorted by id.
    pub fn variables(&self) -> Vec<Expr> {
        self.collect_leaves(|e| e.is_variable())
    }

    /// Distinct parameters in this expression, sorted by id.
    pub fn parameters(&self) -> Vec<Expr> {
        self.collect_leaves(|e| e.is_parameter())
    }

    /// Whether any parameter appears below this node.
    pub fn has_parameters(&self) -> bool {
        !self.parameters().is_empty()
    }

    fn collect_leaves(&self, keep: impl Fn(&Expr) -> bool) -> Vec<Expr> {
        let mut seen: HashSet<*const Node> = HashSet::new();
        let mut found: BTreeMap<ExprId, Expr> = BTreeMap::new();
        let mut stack = vec![self.clone()];
        while let Some(e) = stack.pop() {
            if !seen.insert(Arc::as_ptr(&e.0)) {
                continue;
            }
            if keep(&e) {
                if let Some(id) = e.id() {
                    found.insert(id, e.clone());
                }
            }
            stack.extend(e.args().iter().cloned());
        }
        found.into_values().collect()
    }

    /// Short description used in messages.
    pub fn describe(&self) -> String {
        match self.kind() {
            ExprKind::Variable(v) => match &v.name {
                Some(n) => n.clone(),
                None => format!("var{}", v.id.raw()),
            },
            ExprKind::Parameter(p) => match &p.name {
                Some(n) => n.clone(),
                None => format!("param{}", p.id.raw()),
            },
            ExprKind::Constant(a) => match a.as_scalar() {
                Some(v) => format!("{}", v),
                None => format!("const{}", a.shape()),
            },
            ExprKind::Atom(atom) => {
                let args: Vec<String> = self.args().iter().map(|a| a.describe()).collect();
                format!("{}({})", atom.name(), args.join(", "))
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expr")
            .field("expr", &self.describe())
            .field("shape", &self.shape())
            .field("sign", &self.sign())
            .field("curvature", &self.curvature())
            .finish()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{constant, parameter, variable, ParameterBuilder};

    #[test]
    fn test_ids_increase() {
        let a = ExprId::new();
        let b = ExprId::new();
        assert!(b > a);
    }

    #[test]
    fn test_leaf_attributes() {
        let x = variable(3);
        assert_eq!(x.sign(), Sign::Unknown);
        assert_eq!(x.curvature(), Curvature::Affine);
        assert_eq!(x.shape(), Shape::vector(3));

        let c = constant(-2.0);
        assert_eq!(c.sign(), Sign::Nonpositive);
        assert_eq!(c.curvature(), Curvature::Constant);

        let p = ParameterBuilder::new(2).nonneg().build();
        assert_eq!(p.sign(), Sign::Nonnegative);
        assert!(p.is_constant());
    }

    #[test]
    fn test_clones_share_value_slot() {
        let x = variable(2);
        let y = x.clone();
        assert!(x.ptr_eq(&y));
        x.set_value(vec![1.0, 2.0]).unwrap();
        assert_eq!(y.value().unwrap()[(1, 0)], 2.0);
        y.clear_value();
        assert!(x.value().is_none());
    }

    #[test]
    fn test_set_value_checks_shape() {
        let x = variable(2);
        assert!(x.set_value(vec![1.0, 2.0, 3.0]).is_err());
        assert!(constant(1.0).set_value(2.0).is_err());
    }

    #[test]
    fn test_parameter_sign_checked() {
        let p = ParameterBuilder::new(()).nonneg().build();
        assert!(p.set_value(1.0).is_ok());
        assert!(matches!(
            p.set_value(-1.0),
            Err(CvxError::ParameterSign { .. })
        ));
        let q = parameter(());
        assert!(q.set_value(-1.0).is_ok());
    }

    #[test]
    fn test_variables_sorted_and_distinct() {
        let x = variable(2);
        let y = variable(2);
        let e = &(&y + &x) + &x;
        let vars = e.variables();
        assert_eq!(vars.len(), 2);
        assert!(vars[0].ptr_eq(&x));
        assert!(vars[1].ptr_eq(&y));
    }
}
