//! Curvature tracking for DCP (Disciplined Convex Programming).
//!
//! This module implements the curvature lattice that determines whether an
//! expression is constant, affine, convex, concave, or unknown.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use nalgebra::DMatrix;

/// Curvature of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curvature {
    /// Constant value (most restrictive).
    Constant,
    /// Affine function (both convex and concave).
    Affine,
    /// Convex function.
    Convex,
    /// Concave function.
    Concave,
    /// Unknown curvature (not DCP-compliant).
    Unknown,
}

impl Curvature {
    /// Check if the curvature is convex (constant, affine, or convex).
    pub fn is_convex(self) -> bool {
        matches!(self, Curvature::Constant | Curvature::Affine | Curvature::Convex)
    }

    /// Check if the curvature is concave (constant, affine, or concave).
    pub fn is_concave(self) -> bool {
        matches!(self, Curvature::Constant | Curvature::Affine | Curvature::Concave)
    }

    /// Check if the curvature is affine (constant or affine).
    pub fn is_affine(self) -> bool {
        matches!(self, Curvature::Constant | Curvature::Affine)
    }

    /// Check if this is a constant.
    pub fn is_constant(self) -> bool {
        matches!(self, Curvature::Constant)
    }

    /// Check if the curvature is known (the expression is DCP).
    pub fn is_dcp(self) -> bool {
        !matches!(self, Curvature::Unknown)
    }

    /// Negate the curvature (convex <-> concave).
    pub fn negate(self) -> Self {
        match self {
            Curvature::Convex => Curvature::Concave,
            Curvature::Concave => Curvature::Convex,
            other => other,
        }
    }
}

impl fmt::Display for Curvature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Curvature::Constant => "constant",
            Curvature::Affine => "affine",
            Curvature::Convex => "convex",
            Curvature::Concave => "concave",
            Curvature::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Combine curvatures for addition: a + b.
pub fn add_curvature(a: Curvature, b: Curvature) -> Curvature {
    use Curvature::*;
    match (a, b) {
        // Constants don't affect curvature
        (Constant, x) | (x, Constant) => x,
        (Affine, Affine) => Affine,
        // Affine doesn't affect non-constant curvature
        (Affine, x) | (x, Affine) => x,
        (Convex, Convex) => Convex,
        (Concave, Concave) => Concave,
        (Convex, Concave) | (Concave, Convex) => Unknown,
        // Unknown propagates
        (Unknown, _) | (_, Unknown) => Unknown,
    }
}

/// Sum of several curvatures. An empty sum is constant.
pub fn sum_curvatures<I>(curvatures: I) -> Curvature
where
    I: IntoIterator<Item = Curvature>,
{
    curvatures.into_iter().fold(Curvature::Constant, add_curvature)
}

impl Add for Curvature {
    type Output = Curvature;

    fn add(self, rhs: Curvature) -> Curvature {
        add_curvature(self, rhs)
    }
}

impl Sub for Curvature {
    type Output = Curvature;

    fn sub(self, rhs: Curvature) -> Curvature {
        add_curvature(self, rhs.negate())
    }
}

impl Neg for Curvature {
    type Output = Curvature;

    fn neg(self) -> Curvature {
        self.negate()
    }
}

/// Definiteness of a constant symmetric matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsdStatus {
    /// Positive semidefinite.
    Psd,
    /// Negative semidefinite.
    Nsd,
    /// Indefinite or non-symmetric.
    Neither,
}

impl PsdStatus {
    /// Tolerance on eigenvalues and on asymmetry.
    pub const TOL: f64 = 1e-10;

    /// Classify a square matrix by the extreme eigenvalues of its symmetric part.
    pub fn of_matrix(m: &DMatrix<f64>) -> Self {
        if !m.is_square() || m.nrows() == 0 {
            return PsdStatus::Neither;
        }
        let asym = (m - m.transpose()).amax();
        if asym > Self::TOL * (1.0 + m.amax()) {
            return PsdStatus::Neither;
        }
        let sym = (m + m.transpose()) * 0.5;
        let eig = sym.symmetric_eigenvalues();
        let scale = Self::TOL * (1.0 + m.amax());
        if eig.min() >= -scale {
            PsdStatus::Psd
        } else if eig.max() <= scale {
            PsdStatus::Nsd
        } else {
            PsdStatus::Neither
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curvature_basics() {
        assert!(Curvature::Constant.is_convex());
        assert!(Curvature::Constant.is_concave());
        assert!(Curvature::Constant.is_affine());

        assert!(Curvature::Affine.is_convex());
        assert!(Curvature::Affine.is_concave());
        assert!(Curvature::Affine.is_affine());

        assert!(Curvature::Convex.is_convex());
        assert!(!Curvature::Convex.is_concave());
        assert!(!Curvature::Convex.is_affine());

        assert!(!Curvature::Concave.is_convex());
        assert!(Curvature::Concave.is_concave());
        assert!(!Curvature::Concave.is_affine());

        assert!(!Curvature::Unknown.is_dcp());
    }

    #[test]
    fn test_negate_curvature() {
        assert_eq!(-Curvature::Convex, Curvature::Concave);
        assert_eq!(-Curvature::Concave, Curvature::Convex);
        assert_eq!(-Curvature::Affine, Curvature::Affine);
        assert_eq!(-Curvature::Constant, Curvature::Constant);
    }

    #[test]
    fn test_add_table() {
        use Curvature::*;
        assert_eq!(Convex + Convex, Convex);
        assert_eq!(Concave + Concave, Concave);
        assert_eq!(Affine + Affine, Affine);
        assert_eq!(Constant + Affine, Affine);
        assert_eq!(Convex + Affine, Convex);
        assert_eq!(Concave + Constant, Concave);
        assert_eq!(Convex + Concave, Unknown);
        assert_eq!(Unknown + Constant, Unknown);
        assert_eq!(Convex - Concave, Convex);
        assert_eq!(sum_curvatures([]), Constant);
    }

    #[test]
    fn test_psd_status() {
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        assert_eq!(PsdStatus::of_matrix(&p), PsdStatus::Psd);
        assert_eq!(PsdStatus::of_matrix(&-p), PsdStatus::Nsd);

        let indef = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        assert_eq!(PsdStatus::of_matrix(&indef), PsdStatus::Neither);

        let asym = DMatrix::from_row_slice(2, 2, &[1.0, 5.0, 0.0, 1.0]);
        assert_eq!(PsdStatus::of_matrix(&asym), PsdStatus::Neither);
    }
}
