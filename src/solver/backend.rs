//! Backend abstraction.
//!
//! A backend consumes [`ProblemData`] (objective vector, equality block,
//! inequality block with cone dims) and returns a [`RawSolution`] whose
//! vectors line up with the data's columns and rows.

use std::fmt;

use crate::error::{CvxError, Result};

use super::clarabel::ClarabelBackend;
use super::data::{ConeDims, ProblemData};
use super::{Settings, SolveStatus};

/// Cone families a backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub lp: bool,
    pub socp: bool,
    pub sdp: bool,
    pub exp: bool,
}

impl Capabilities {
    /// The first cone family in `dims` this backend cannot handle.
    pub fn missing(&self, dims: &ConeDims) -> Option<&'static str> {
        if (dims.eq > 0 || dims.leq > 0) && !self.lp {
            Some("linear")
        } else if !dims.soc.is_empty() && !self.socp {
            Some("second-order cone")
        } else if dims.exp > 0 && !self.exp {
            Some("exponential cone")
        } else if !dims.sdp.is_empty() && !self.sdp {
            Some("semidefinite")
        } else {
            None
        }
    }
}

/// Raw backend output, before scatter onto variables and constraints.
#[derive(Debug, Clone)]
pub struct RawSolution {
    pub status: SolveStatus,
    /// `c'x`, without the objective offset.
    pub objective: f64,
    /// Primal vector, one entry per data column.
    pub x: Vec<f64>,
    /// Equality duals, one per equality row.
    pub y: Vec<f64>,
    /// Inequality duals, one per inequality row.
    pub z: Vec<f64>,
    pub solve_time: f64,
    pub iterations: u32,
}

/// A numeric solver the problem can be dispatched to.
pub trait Backend {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Solve `min c'x + offset s.t. Ax = b, h - Gx ∈ K`.
    ///
    /// Solver outcomes are reported through [`RawSolution::status`];
    /// `Err` is reserved for data the backend cannot accept.
    fn solve(&self, data: &ProblemData, settings: &Settings) -> Result<RawSolution>;
}

/// Backends built into the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    Clarabel,
}

impl SolverKind {
    /// Every built-in backend, in order of preference.
    pub const ALL: [SolverKind; 1] = [SolverKind::Clarabel];

    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Clarabel => "Clarabel",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            SolverKind::Clarabel => ClarabelBackend.capabilities(),
        }
    }

    pub fn backend(&self) -> Box<dyn Backend> {
        match self {
            SolverKind::Clarabel => Box::new(ClarabelBackend),
        }
    }

    /// Pick a backend for the given cones.
    ///
    /// Semidefinite problems go to the first SDP-capable backend, then
    /// exponential-cone problems to the first exp-capable one, then anything
    /// else to the first backend that covers every cone.
    pub fn choose(dims: &ConeDims) -> Result<SolverKind> {
        let wanted: fn(&Capabilities) -> bool = if !dims.sdp.is_empty() {
            |c: &Capabilities| c.sdp
        } else if dims.exp > 0 {
            |c: &Capabilities| c.exp
        } else {
            |_: &Capabilities| true
        };
        SolverKind::ALL
            .iter()
            .copied()
            .find(|k| {
                let caps = k.capabilities();
                wanted(&caps) && caps.missing(dims).is_none()
            })
            .ok_or_else(|| {
                let default = SolverKind::ALL[0];
                CvxError::SolverCapability {
                    solver: default.name().to_string(),
                    cone: default
                        .capabilities()
                        .missing(dims)
                        .unwrap_or("requested")
                        .to_string(),
                }
            })
    }

    /// Fail if this backend cannot handle every cone in `dims`.
    pub fn validate(&self, dims: &ConeDims) -> Result<()> {
        validate_backend(self.name(), &self.capabilities(), dims)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn validate_backend(name: &str, caps: &Capabilities, dims: &ConeDims) -> Result<()> {
    match caps.missing(dims) {
        Some(cone) => Err(CvxError::SolverCapability {
            solver: name.to_string(),
            cone: cone.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_missing() {
        let caps = Capabilities {
            lp: true,
            socp: true,
            sdp: false,
            exp: false,
        };
        let mut dims = ConeDims {
            leq: 3,
            soc: vec![3],
            ..Default::default()
        };
        assert_eq!(caps.missing(&dims), None);

        dims.exp = 1;
        assert_eq!(caps.missing(&dims), Some("exponential cone"));

        dims.exp = 0;
        dims.sdp = vec![2];
        assert_eq!(caps.missing(&dims), Some("semidefinite"));
    }

    #[test]
    fn test_choose_default() {
        let dims = ConeDims::default();
        assert_eq!(SolverKind::choose(&dims).unwrap(), SolverKind::Clarabel);

        let dims = ConeDims {
            exp: 2,
            ..Default::default()
        };
        assert_eq!(SolverKind::choose(&dims).unwrap(), SolverKind::Clarabel);
    }

    #[cfg(not(feature = "sdp"))]
    #[test]
    fn test_sdp_needs_feature() {
        let dims = ConeDims {
            sdp: vec![3],
            ..Default::default()
        };
        assert!(matches!(
            SolverKind::choose(&dims),
            Err(CvxError::SolverCapability { .. })
        ));
        assert!(SolverKind::Clarabel.validate(&dims).is_err());
    }
}
