//! The DCP attribute triple carried by every expression node.

use std::ops::Neg;

use super::curvature::Curvature;
use super::sign::Sign;
use crate::error::Result;
use crate::expr::Shape;

/// Sign, curvature and shape of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DcpAttr {
    pub sign: Sign,
    pub curvature: Curvature,
    pub shape: Shape,
}

impl DcpAttr {
    pub fn new(sign: Sign, curvature: Curvature, shape: Shape) -> Self {
        Self {
            sign,
            curvature,
            shape,
        }
    }

    /// Attributes of `self + other`. Fails if the shapes cannot be added.
    pub fn try_add(&self, other: &DcpAttr) -> Result<DcpAttr> {
        Ok(DcpAttr {
            sign: self.sign + other.sign,
            curvature: self.curvature + other.curvature,
            shape: self.shape.add(&other.shape)?,
        })
    }
}

impl Neg for DcpAttr {
    type Output = DcpAttr;

    fn neg(self) -> DcpAttr {
        DcpAttr {
            sign: -self.sign,
            curvature: -self.curvature,
            shape: self.shape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_lifts_components() {
        let a = DcpAttr::new(Sign::Nonnegative, Curvature::Convex, Shape::vector(3));
        let b = DcpAttr::new(Sign::Zero, Curvature::Constant, Shape::scalar());
        let c = a.try_add(&b).unwrap();
        assert_eq!(c.sign, Sign::Nonnegative);
        assert_eq!(c.curvature, Curvature::Convex);
        assert_eq!(c.shape, Shape::vector(3));

        let d = DcpAttr::new(Sign::Unknown, Curvature::Affine, Shape::vector(4));
        assert!(a.try_add(&d).is_err());
    }

    #[test]
    fn test_negation() {
        let a = DcpAttr::new(Sign::Nonnegative, Curvature::Convex, Shape::vector(3));
        let n = -a;
        assert_eq!(n.sign, Sign::Nonpositive);
        assert_eq!(n.curvature, Curvature::Concave);
        assert_eq!(n.shape, a.shape);
    }
}
