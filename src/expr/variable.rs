//! Variable creation with builder pattern.

use super::expression::Expr;
use super::shape::Shape;

/// Builder for creating variables.
#[derive(Default)]
pub struct VariableBuilder {
    shape: Shape,
    name: Option<String>,
}

impl VariableBuilder {
    /// Create a new variable builder with the given shape.
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            ..Default::default()
        }
    }

    /// Create a scalar variable builder.
    pub fn scalar() -> Self {
        Self::new(Shape::scalar())
    }

    /// Create a vector variable builder.
    pub fn vector(n: usize) -> Self {
        Self::new(Shape::vector(n))
    }

    /// Create a matrix variable builder.
    pub fn matrix(m: usize, n: usize) -> Self {
        Self::new(Shape::matrix(m, n))
    }

    /// Set the name of the variable.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the variable expression.
    pub fn build(self) -> Expr {
        Expr::new_variable(self.shape, self.name)
    }
}

/// Create a variable with the given shape.
///
/// # Examples
///
/// ```
/// use cvxlin::expr::variable;
///
/// // Scalar variable
/// let x = variable(());
///
/// // Vector variable
/// let y = variable(5);
/// let y = variable((5,));
///
/// // Matrix variable
/// let z = variable((3, 4));
/// ```
pub fn variable(shape: impl Into<Shape>) -> Expr {
    VariableBuilder::new(shape).build()
}

/// Create a named variable with the given shape.
pub fn named_variable(name: impl Into<String>, shape: impl Into<Shape>) -> Expr {
    VariableBuilder::new(shape).name(name).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_shapes() {
        assert_eq!(variable(()).shape(), Shape::scalar());
        assert_eq!(variable(5).shape(), Shape::vector(5));
        assert_eq!(VariableBuilder::matrix(3, 4).build().shape(), Shape::matrix(3, 4));
    }

    #[test]
    fn test_variables_get_distinct_ids() {
        let x = variable(2);
        let y = variable(2);
        assert_ne!(x.id(), y.id());
        assert!(x.id().is_some());
    }

    #[test]
    fn test_named_variable() {
        let x = named_variable("x", 3);
        assert_eq!(x.name(), Some("x"));
        assert_eq!(x.to_string(), "x");
    }
}
