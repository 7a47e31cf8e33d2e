//! Clarabel solver integration.
//!
//! Clarabel solves `min ½x'Px + q'x s.t. Ax + s = b, s ∈ K`. The equality
//! block maps to a zero cone stacked above the inequality block. Semidefinite
//! rows arrive as full `vec(A)` and are packed into Clarabel's scaled upper
//! triangle here; their duals are unpacked back to full matrices.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use log::{debug, warn};
use nalgebra_sparse::CscMatrix;

use crate::error::{CvxError, Result};
use crate::sparse::{csc_matmul, csc_vstack, Triplets};

use super::backend::{validate_backend, Backend, Capabilities, RawSolution};
use super::data::{ConeDims, ProblemData};
use super::{Settings, SolveStatus};

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => SolveStatus::Optimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            _ => SolveStatus::SolverError,
        }
    }
}

/// The Clarabel interior point solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl Backend for ClarabelBackend {
    fn name(&self) -> &'static str {
        "Clarabel"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            lp: true,
            socp: true,
            sdp: cfg!(feature = "sdp"),
            exp: true,
        }
    }

    fn solve(&self, data: &ProblemData, settings: &Settings) -> Result<RawSolution> {
        validate_backend(self.name(), &self.capabilities(), &data.dims)?;

        let n = data.num_vars();
        let m_eq = data.b.len();
        let packing = SdpPacking::new(&data.dims);

        // [A; G] with the SDP rows of G (and h) packed.
        let g = packing.apply_matrix(&data.g);
        let h = packing.apply_vector(&data.h);
        let stacked = csc_vstack(&[&data.a, &g]);
        let mut rhs = data.b.clone();
        rhs.extend(h);

        let p = ClarabelCsc::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let a = to_clarabel_csc(&stacked);
        let cones = to_clarabel_cones(&data.dims)?;

        let clarabel_settings = DefaultSettingsBuilder::default()
            .verbose(settings.verbose)
            .max_iter(settings.max_iter)
            .time_limit(settings.time_limit)
            .tol_gap_abs(settings.tol_gap_abs)
            .tol_gap_rel(settings.tol_gap_rel)
            .tol_feas(settings.tol_feas)
            .build()
            .map_err(|e| CvxError::SolverError(e.to_string()))?;

        debug!(
            "clarabel: {} columns, {} rows, {} cones",
            n,
            rhs.len(),
            cones.len()
        );

        let mut solver = DefaultSolver::new(&p, &data.c, &a, &rhs, &cones, clarabel_settings);
        solver.solve();

        let solution = &solver.solution;
        let status = SolveStatus::from(solution.status);
        if status == SolveStatus::SolverError {
            warn!("clarabel stopped with status {:?}", solution.status);
        }

        let y = solution.z[..m_eq].to_vec();
        let z = packing.unpack_duals(&solution.z[m_eq..]);

        Ok(RawSolution {
            status,
            objective: solution.obj_val,
            x: solution.x.clone(),
            y,
            z,
            solve_time: solution.solve_time,
            iterations: solution.iterations,
        })
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Result<Vec<SupportedConeT<f64>>> {
    let mut cones = Vec::new();

    if dims.eq > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.eq));
    }

    if dims.leq > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.leq));
    }

    for &soc_dim in &dims.soc {
        cones.push(SupportedConeT::SecondOrderConeT(soc_dim));
    }

    // Exponential cones (each is 3D)
    for _ in 0..dims.exp {
        cones.push(SupportedConeT::ExponentialConeT());
    }

    for &order in &dims.sdp {
        cones.push(psd_cone(order)?);
    }

    Ok(cones)
}

#[cfg(feature = "sdp")]
fn psd_cone(order: usize) -> Result<SupportedConeT<f64>> {
    Ok(SupportedConeT::PSDTriangleConeT(order))
}

#[cfg(not(feature = "sdp"))]
fn psd_cone(_order: usize) -> Result<SupportedConeT<f64>> {
    Err(CvxError::SolverCapability {
        solver: "Clarabel".to_string(),
        cone: "semidefinite".to_string(),
    })
}

/// Row transform between full `vec(A)` semidefinite rows and the packed
/// upper triangle, column by column, off-diagonals scaled by `√2`.
///
/// Rows before the first SDP block pass through unchanged.
struct SdpPacking {
    /// Inequality rows preceding the SDP blocks.
    head: usize,
    orders: Vec<usize>,
    /// Packed rows × full rows; `None` when there are no SDP cones.
    transform: Option<CscMatrix<f64>>,
}

impl SdpPacking {
    fn new(dims: &ConeDims) -> Self {
        let head = dims.ineq_rows() - dims.sdp.iter().map(|n| n * n).sum::<usize>();
        if dims.sdp.is_empty() {
            return SdpPacking {
                head,
                orders: Vec::new(),
                transform: None,
            };
        }

        let mut triplets = Triplets::new();
        for r in 0..head {
            triplets.push(r, r, 1.0);
        }
        let (mut row, mut col) = (head, head);
        for &n in &dims.sdp {
            let (packed, full) = svec_block(n);
            triplets.add_block(row, col, &packed);
            row += packed.nrows();
            col += full;
        }
        SdpPacking {
            head,
            orders: dims.sdp.clone(),
            transform: Some(triplets.build(row, col)),
        }
    }

    fn apply_matrix(&self, g: &CscMatrix<f64>) -> CscMatrix<f64> {
        match &self.transform {
            Some(t) => csc_matmul(t, g),
            None => g.clone(),
        }
    }

    fn apply_vector(&self, h: &[f64]) -> Vec<f64> {
        match &self.transform {
            Some(t) => {
                let mut out = vec![0.0; t.nrows()];
                for (r, c, v) in t.triplet_iter() {
                    out[r] += v * h[c];
                }
                out
            }
            None => h.to_vec(),
        }
    }

    /// Map packed duals back onto the full rows (`Tᵀ z`).
    fn unpack_duals(&self, z: &[f64]) -> Vec<f64> {
        match &self.transform {
            Some(t) => {
                let mut out = vec![0.0; t.ncols()];
                for (r, c, v) in t.triplet_iter() {
                    out[c] += v * z[r];
                }
                out
            }
            None => z.to_vec(),
        }
    }
}

/// Packing rows for one order-`n` block and the number of full rows it reads.
///
/// Off-diagonal rows average `A[i, j]` and `A[j, i]` before scaling, so the
/// packed inner product matches the full one.
fn svec_block(n: usize) -> (CscMatrix<f64>, usize) {
    let mut triplets = Triplets::new();
    let half_sqrt2 = std::f64::consts::SQRT_2 / 2.0;
    let mut row = 0;
    for j in 0..n {
        for i in 0..=j {
            if i == j {
                triplets.push(row, j * n + i, 1.0);
            } else {
                triplets.push(row, j * n + i, half_sqrt2);
                triplets.push(row, i * n + j, half_sqrt2);
            }
            row += 1;
        }
    }
    (triplets.build(row, n * n), n * n)
}

impl std::fmt::Debug for SdpPacking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdpPacking")
            .field("head", &self.head)
            .field("orders", &self.orders)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(SolveStatus::from(SolverStatus::Solved), SolveStatus::Optimal);
        assert_eq!(
            SolveStatus::from(SolverStatus::AlmostSolved),
            SolveStatus::Optimal
        );
        assert_eq!(
            SolveStatus::from(SolverStatus::AlmostPrimalInfeasible),
            SolveStatus::Infeasible
        );
        assert_eq!(
            SolveStatus::from(SolverStatus::DualInfeasible),
            SolveStatus::Unbounded
        );
        assert_eq!(
            SolveStatus::from(SolverStatus::MaxIterations),
            SolveStatus::SolverError
        );
        assert_eq!(
            SolveStatus::from(SolverStatus::NumericalError),
            SolveStatus::SolverError
        );
    }

    #[test]
    fn test_to_clarabel_cones() {
        let dims = ConeDims {
            eq: 2,
            leq: 3,
            soc: vec![4],
            exp: 2,
            sdp: vec![],
        };
        let cones = to_clarabel_cones(&dims).unwrap();
        assert_eq!(cones.len(), 5);
    }

    #[test]
    fn test_svec_preserves_inner_product() {
        // <A, B> for symmetric A, B equals <svec(A), svec(B)>
        let a = [2.0, 1.0, 1.0, 3.0];
        let b = [1.0, -1.0, -1.0, 4.0];
        let (t, full) = svec_block(2);
        assert_eq!(full, 4);
        assert_eq!(t.nrows(), 3);

        let pack = |m: &[f64]| {
            let mut out = vec![0.0; 3];
            for (r, c, v) in t.triplet_iter() {
                out[r] += v * m[c];
            }
            out
        };
        let pa = pack(&a);
        let pb = pack(&b);
        let packed: f64 = pa.iter().zip(&pb).map(|(x, y)| x * y).sum();
        let dense: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!((packed - dense).abs() < 1e-12);
    }

    #[test]
    fn test_packing_passthrough_without_sdp() {
        let dims = ConeDims {
            leq: 2,
            ..Default::default()
        };
        let packing = SdpPacking::new(&dims);
        assert_eq!(packing.apply_vector(&[1.0, 2.0]), vec![1.0, 2.0]);
        assert_eq!(packing.unpack_duals(&[3.0, 4.0]), vec![3.0, 4.0]);
    }

    #[test]
    fn test_packing_unpacks_duals() {
        let dims = ConeDims {
            leq: 1,
            sdp: vec![2],
            ..Default::default()
        };
        let packing = SdpPacking::new(&dims);
        let h = packing.apply_vector(&[5.0, 1.0, 2.0, 2.0, 3.0]);
        assert_eq!(h.len(), 4);
        assert_eq!(h[0], 5.0);
        assert!((h[2] - 2.0 * std::f64::consts::SQRT_2).abs() < 1e-12);

        let z = packing.unpack_duals(&[1.0, 4.0, std::f64::consts::SQRT_2, 6.0]);
        assert_eq!(z.len(), 5);
        assert_eq!(z[1], 4.0);
        assert!((z[2] - 1.0).abs() < 1e-12);
        assert!((z[3] - 1.0).abs() < 1e-12);
        assert_eq!(z[4], 6.0);
    }
}
