//! Parameters: constants whose values may change between solves.
//!
//! A parameter has constant curvature and a declared sign. Its value is
//! read when coefficients are extracted, so re-solving after `set_value`
//! picks up the new data.

use crate::dcp::Sign;

use super::expression::Expr;
use super::shape::Shape;

/// Builder for creating parameters.
#[derive(Default)]
pub struct ParameterBuilder {
    shape: Shape,
    name: Option<String>,
    sign: Option<Sign>,
}

impl ParameterBuilder {
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            ..Default::default()
        }
    }

    /// Set the name of the parameter.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare the parameter non-negative.
    pub fn nonneg(mut self) -> Self {
        self.sign = Some(Sign::Nonnegative);
        self
    }

    /// Declare the parameter non-positive.
    pub fn nonpos(mut self) -> Self {
        self.sign = Some(Sign::Nonpositive);
        self
    }

    pub fn build(self) -> Expr {
        Expr::new_parameter(self.shape, self.sign.unwrap_or(Sign::Unknown), self.name)
    }
}

/// Create a parameter of unknown sign.
pub fn parameter(shape: impl Into<Shape>) -> Expr {
    ParameterBuilder::new(shape).build()
}
