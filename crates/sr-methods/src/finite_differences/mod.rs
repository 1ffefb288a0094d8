//! Finite-difference meshes for short-rate models.
//!
//! # Overview
//!
//! * [`TridiagonalOperator`]: tridiagonal matrix with Thomas-algorithm solver
//! * [`FdScheme`]: implicit or Crank–Nicolson time stepping
//! * [`FdShortRateMesh1d`]: θ-scheme mesh for one-factor models, fitted to
//!   the curve by adjoint forward induction
//! * [`FdShortRateMesh2d`]: Douglas ADI mesh for two-factor models, fitted
//!   the same way through the transposed Douglas step
//!
//! Both meshes discretize, for each factor `x` with mean reversion `a` and
//! volatility `σ`, the operator `½σ²∂²/∂x² − a·x·∂/∂x` on a uniform grid
//! symmetric around 0, minus the short rate.

pub mod mesh_1d;
pub mod mesh_2d;

pub use mesh_1d::FdShortRateMesh1d;
pub use mesh_2d::FdShortRateMesh2d;

use serde::{Deserialize, Serialize};
use sr_core::{ensure, fail, Real, Result, Time};
use sr_models::StateFactor;

// ─── Scheme selection ─────────────────────────────────────────────────────────

/// Finite-difference time-stepping scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FdScheme {
    /// Fully implicit steps (θ = 1).
    Implicit,
    /// Crank–Nicolson (θ = ½). The last `damping_steps` steps before the
    /// grid end are taken fully implicit to smooth the terminal payoff.
    CrankNicolson {
        /// Number of implicit steps next to the grid end.
        damping_steps: usize,
    },
}

impl Default for FdScheme {
    fn default() -> Self {
        FdScheme::CrankNicolson { damping_steps: 0 }
    }
}

impl FdScheme {
    /// Implicitness θ of step `i` out of `steps`.
    pub fn theta(self, i: usize, steps: usize) -> Real {
        match self {
            FdScheme::Implicit => 1.0,
            FdScheme::CrankNicolson { damping_steps } => {
                if i + damping_steps >= steps {
                    1.0
                } else {
                    0.5
                }
            }
        }
    }
}

// ─── Tridiagonal operator ─────────────────────────────────────────────────────

/// A tridiagonal matrix operator.
///
/// Stores the lower, diagonal, and upper bands. `lower[0]` and
/// `upper[n - 1]` are unused.
#[derive(Debug, Clone, PartialEq)]
pub struct TridiagonalOperator {
    /// Lower diagonal.
    pub lower: Vec<Real>,
    /// Main diagonal.
    pub diag: Vec<Real>,
    /// Upper diagonal.
    pub upper: Vec<Real>,
}

impl TridiagonalOperator {
    /// Create a zero tridiagonal operator of size `n`.
    pub fn new(n: usize) -> Self {
        Self {
            lower: vec![0.0; n],
            diag: vec![0.0; n],
            upper: vec![0.0; n],
        }
    }

    /// Size (number of rows/columns).
    pub fn size(&self) -> usize {
        self.diag.len()
    }

    /// Apply the operator: `y = A · x`.
    pub fn apply(&self, x: &[Real]) -> Vec<Real> {
        let n = self.size();
        (0..n)
            .map(|i| {
                let mut y = self.diag[i] * x[i];
                if i > 0 {
                    y += self.lower[i] * x[i - 1];
                }
                if i + 1 < n {
                    y += self.upper[i] * x[i + 1];
                }
                y
            })
            .collect()
    }

    /// Solve `A · x = rhs` with the Thomas algorithm.
    ///
    /// Fails with `Numerical` on a vanishing or non-finite pivot.
    pub fn solve(&self, rhs: &[Real]) -> Result<Vec<Real>> {
        let n = self.size();
        ensure!(
            rhs.len() == n,
            InvalidParameter,
            "right-hand side has {} entries, operator has {n} rows",
            rhs.len()
        );
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut c_prime = vec![0.0; n];
        let mut d_prime = vec![0.0; n];
        let mut pivot = self.diag[0];
        for i in 0..n {
            if i > 0 {
                pivot = self.diag[i] - self.lower[i] * c_prime[i - 1];
            }
            if !pivot.is_finite() || pivot.abs() < Real::MIN_POSITIVE {
                fail!(Numerical, "tridiagonal solve: pivot {pivot} at row {i}");
            }
            if i + 1 < n {
                c_prime[i] = self.upper[i] / pivot;
            }
            let previous = if i > 0 { self.lower[i] * d_prime[i - 1] } else { 0.0 };
            d_prime[i] = (rhs[i] - previous) / pivot;
        }

        let mut x = vec![0.0; n];
        x[n - 1] = d_prime[n - 1];
        for i in (0..n - 1).rev() {
            x[i] = d_prime[i] - c_prime[i] * x[i + 1];
        }
        Ok(x)
    }

    /// The transposed operator.
    pub fn transpose(&self) -> Self {
        let n = self.size();
        let mut t = Self::new(n);
        t.diag.clone_from(&self.diag);
        for i in 1..n {
            t.lower[i] = self.upper[i - 1];
            t.upper[i - 1] = self.lower[i];
        }
        t
    }

    /// `I + factor · A`.
    pub fn identity_plus(&self, factor: Real) -> Self {
        let mut op = self.clone();
        op.scale(factor);
        op.add_identity(1.0);
        op
    }

    /// Scale all entries by a scalar.
    pub fn scale(&mut self, factor: Real) {
        for v in self
            .lower
            .iter_mut()
            .chain(self.diag.iter_mut())
            .chain(self.upper.iter_mut())
        {
            *v *= factor;
        }
    }

    /// Add the identity matrix scaled by `factor`: `A ← A + factor · I`.
    pub fn add_identity(&mut self, factor: Real) {
        for d in &mut self.diag {
            *d += factor;
        }
    }
}

// ─── Spatial discretization ──────────────────────────────────────────────────

/// Uniform grid of `2 · (space_steps / 2) + 1` points covering
/// `±std_devs` standard deviations of `factor` at `horizon`.
pub(crate) fn factor_grid(
    factor: &StateFactor,
    horizon: Time,
    space_steps: usize,
    std_devs: Real,
) -> Result<Vec<Real>> {
    ensure!(
        space_steps >= 2,
        InvalidParameter,
        "a mesh needs at least 3 space points, got {space_steps} steps"
    );
    ensure!(
        std_devs.is_finite() && std_devs > 0.0,
        InvalidParameter,
        "mesh width must be a positive number of standard deviations, got {std_devs}"
    );
    let sd = factor.std_deviation(horizon);
    ensure!(
        sd.is_finite() && sd > 0.0,
        InvalidParameter,
        "factor standard deviation at {horizon} must be positive, got {sd}"
    );
    let half = space_steps / 2;
    let dx = std_devs * sd / half as Real;
    Ok((0..=2 * half).map(|j| (j as Real - half as Real) * dx).collect())
}

/// `½σ²∂²/∂x² − a·x·∂/∂x − reaction(j)` on the uniform grid `x`.
///
/// Drift terms switch from central to upwind differences where the cell
/// Péclet number `|a·x|·dx/σ²` exceeds one. Boundary rows carry the upwind
/// drift only.
pub(crate) fn convection_diffusion<F>(
    x: &[Real],
    factor: &StateFactor,
    reaction: F,
) -> TridiagonalOperator
where
    F: Fn(usize) -> Real,
{
    let n = x.len();
    let dx = x[1] - x[0];
    let sigma2 = factor.volatility * factor.volatility;
    let diffusion = 0.5 * sigma2 / (dx * dx);
    let mut op = TridiagonalOperator::new(n);

    for (j, &xj) in x.iter().enumerate() {
        let mu = factor.drift(xj);
        let interior = j > 0 && j + 1 < n;
        if interior && mu.abs() * dx <= sigma2 {
            op.lower[j] = diffusion - mu / (2.0 * dx);
            op.diag[j] = -2.0 * diffusion;
            op.upper[j] = diffusion + mu / (2.0 * dx);
        } else {
            if interior {
                op.lower[j] = diffusion;
                op.diag[j] = -2.0 * diffusion;
                op.upper[j] = diffusion;
            }
            if mu > 0.0 && j + 1 < n {
                op.upper[j] += mu / dx;
                op.diag[j] -= mu / dx;
            } else if mu < 0.0 && j > 0 {
                op.lower[j] -= mu / dx;
                op.diag[j] += mu / dx;
            }
        }
        op.diag[j] -= reaction(j);
    }
    op
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sr_core::Error;

    #[test]
    fn thomas_algorithm_solves_identity() {
        let mut op = TridiagonalOperator::new(4);
        op.add_identity(1.0);
        let rhs = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(op.solve(&rhs).unwrap(), rhs);
    }

    #[test]
    fn thomas_algorithm_solves_tridiagonal() {
        // A = [[2, -1, 0], [-1, 2, -1], [0, -1, 2]], x = [1, 2, 3]
        let mut op = TridiagonalOperator::new(3);
        op.diag = vec![2.0, 2.0, 2.0];
        op.lower = vec![0.0, -1.0, -1.0];
        op.upper = vec![-1.0, -1.0, 0.0];
        let x = op.solve(&[0.0, 0.0, 4.0]).unwrap();
        for (xi, expected) in x.iter().zip([1.0, 2.0, 3.0]) {
            assert_abs_diff_eq!(*xi, expected, epsilon = 1e-12);
        }
        assert_eq!(op.apply(&x).len(), 3);
        assert_abs_diff_eq!(op.apply(&x)[2], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn transpose_is_adjoint() {
        let mut op = TridiagonalOperator::new(4);
        op.lower = vec![0.0, 0.3, -1.2, 0.7];
        op.diag = vec![2.0, 3.0, 4.0, 5.0];
        op.upper = vec![1.5, -0.4, 0.9, 0.0];
        let (u, v) = ([1.0, -2.0, 0.5, 3.0], [0.2, 0.4, -1.0, 2.0]);
        let au = op.apply(&u);
        let atv = op.transpose().apply(&v);
        let lhs: Real = au.iter().zip(&v).map(|(a, b)| a * b).sum();
        let rhs: Real = u.iter().zip(&atv).map(|(a, b)| a * b).sum();
        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12);
    }

    #[test]
    fn singular_system_is_reported() {
        let op = TridiagonalOperator::new(3);
        assert!(matches!(op.solve(&[1.0, 1.0, 1.0]), Err(Error::Numerical(_))));
        assert!(matches!(op.solve(&[1.0]), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn operator_rows_conserve_mass_without_reaction() {
        let factor = StateFactor::new(0.1, 0.01);
        let x = factor_grid(&factor, 10.0, 40, 4.0).unwrap();
        assert_eq!(x.len(), 41);
        assert_abs_diff_eq!(x[20], 0.0);
        let op = convection_diffusion(&x, &factor, |_| 0.0);
        let ones = op.apply(&vec![1.0; x.len()]);
        assert!(ones.iter().all(|v| v.abs() < 1e-9));
        // the operator is exact on linear functions in the interior
        let lx = op.apply(&x);
        for j in 1..x.len() - 1 {
            assert_abs_diff_eq!(lx[j], factor.drift(x[j]), epsilon = 1e-12);
        }
    }

    #[test]
    fn off_diagonals_are_non_negative_with_strong_drift() {
        let factor = StateFactor::new(5.0, 0.001);
        let x = factor_grid(&factor, 1.0, 20, 6.0).unwrap();
        let op = convection_diffusion(&x, &factor, |_| 0.0);
        assert!(op.lower.iter().chain(&op.upper).all(|&v| v >= 0.0));
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        let factor = StateFactor::new(0.1, 0.01);
        assert!(factor_grid(&factor, 1.0, 1, 4.0).is_err());
        assert!(factor_grid(&StateFactor::new(0.1, 0.0), 1.0, 10, 4.0).is_err());
        assert!(factor_grid(&factor, 1.0, 10, 0.0).is_err());
    }

    #[test]
    fn crank_nicolson_damps_the_final_steps() {
        let scheme = FdScheme::CrankNicolson { damping_steps: 2 };
        assert_eq!(scheme.theta(0, 10), 0.5);
        assert_eq!(scheme.theta(7, 10), 0.5);
        assert_eq!(scheme.theta(8, 10), 1.0);
        assert_eq!(scheme.theta(9, 10), 1.0);
        assert_eq!(FdScheme::Implicit.theta(0, 10), 1.0);
        let json = serde_json::to_string(&scheme).unwrap();
        assert_eq!(serde_json::from_str::<FdScheme>(&json).unwrap(), scheme);
    }
}
