//! DCP (Disciplined Convex Programming) analysis.
//!
//! This module provides the core DCP analysis functionality:
//! - Curvature tracking (constant, affine, convex, concave)
//! - Sign tracking (non-negative, non-positive, zero)
//! - The composition rule driven by per-argument monotonicity

pub mod attr;
pub mod curvature;
pub mod monotonicity;
pub mod sign;

pub use attr::DcpAttr;
pub use curvature::{add_curvature, sum_curvatures, Curvature, PsdStatus};
pub use monotonicity::{compose_curvature, dcp_curvature, Monotonicity};
pub use sign::{add_sign, mul_sign, sum_signs, Sign};
