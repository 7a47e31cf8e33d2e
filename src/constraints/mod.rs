//! Constraints for optimization problems.
//!
//! Build them with [`Constraint`] constructors, the [`ConstraintExt`]
//! methods on expressions, or the [`constraint!`](crate::constraint) macro:
//!
//! ```ignore
//! use cvxlin::prelude::*;
//!
//! let x = variable(3);
//! let c1 = constraint!(x >= 0.0);
//! let c2 = constraint!((sum(&x)) == 1.0);
//! let c3 = x.leq(2.0);
//! ```

pub mod constraint;

pub use constraint::{Constraint, ConstraintExt, ConstraintKind};

/// Build a [`Constraint`] from a comparison.
///
/// Operands are single token trees: identifiers, literals, or
/// parenthesized expressions. Operands are taken by reference, so
/// expressions stay usable afterwards.
#[macro_export]
macro_rules! constraint {
    ($lhs:tt == $rhs:tt) => {
        $crate::constraints::Constraint::eq(
            ::std::clone::Clone::clone(&$lhs),
            ::std::clone::Clone::clone(&$rhs),
        )
    };
    ($lhs:tt <= $rhs:tt) => {
        $crate::constraints::Constraint::leq(
            ::std::clone::Clone::clone(&$lhs),
            ::std::clone::Clone::clone(&$rhs),
        )
    };
    ($lhs:tt >= $rhs:tt) => {
        $crate::constraints::Constraint::geq(
            ::std::clone::Clone::clone(&$lhs),
            ::std::clone::Clone::clone(&$rhs),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::sum;
    use crate::expr::variable;

    #[test]
    fn test_constraint_macro() {
        let x = variable(3);
        let c = constraint!(x >= 0.0);
        assert!(matches!(c.kind(), ConstraintKind::Leq(_)));

        let c = constraint!((sum(&x)) == 1.0);
        assert!(matches!(c.kind(), ConstraintKind::Eq(_)));
        assert!(c.is_dcp());

        let c = constraint!(x <= 2.0);
        assert!(c.is_dcp());
        // x is still usable
        assert_eq!(x.shape().size(), 3);
    }
}
