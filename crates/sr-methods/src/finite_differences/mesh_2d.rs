//! Douglas ADI mesh for two-factor short-rate models.
//!
//! The operator `L = L0 + L1 + L2` splits into the mixed-derivative term
//! `L0 = ρσ₁σ₂ ∂²/∂x∂y` and one-dimensional terms `L1`, `L2` that each carry
//! their factor's convection–diffusion and half of the short rate. A step
//! back over `dt` is
//!
//! ```text
//! Y0 = V + dt·L V
//! (I − θ·dt·L1) Y1 = Y0 − θ·dt·L1 V
//! (I − θ·dt·L2) Y2 = Y1 − θ·dt·L2 V
//! ```
//!
//! with `Y2` the value one step earlier. Writing that step as the matrix
//! `B_i`, the state prices go forward as `Q_{i+1} = B_iᵀ Q_i` from the unit
//! vector at the centre node, and the shift `φ_i` is fitted so that
//! `Σ Q_{i+1}` equals the curve's discount factor at `t_{i+1}`.

use sr_core::{ensure, Real, Result};
use sr_models::{ShortRateModel, StateFactor};
use tracing::debug;

use super::{convection_diffusion, factor_grid, FdScheme, TridiagonalOperator};
use crate::lattice::{check_step_input, fit_shift, Lattice, TimeGrid};

/// `L1` on every x-line and `L2` on every y-line of one step.
struct LineOperators {
    x: Vec<TridiagonalOperator>,
    y: Vec<TridiagonalOperator>,
}

/// Finite-difference mesh of a two-factor short-rate model.
///
/// Node `(ix, iy)` is stored at index `ix + iy · nx`.
#[derive(Debug, Clone)]
pub struct FdShortRateMesh2d {
    grid: TimeGrid,
    x: Vec<Real>,
    y: Vec<Real>,
    factors: [StateFactor; 2],
    rho: Real,
    thetas: Vec<Real>,
    shifts: Vec<Real>,
    /// Short rate per node, slice-major.
    rates: Vec<Real>,
}

impl FdShortRateMesh2d {
    /// Build the mesh of `model` over `grid` and fit it to the curve.
    pub fn new(
        model: &dyn ShortRateModel,
        grid: &TimeGrid,
        space_steps: usize,
        std_devs: Real,
        scheme: FdScheme,
    ) -> Result<Self> {
        let factors = model.factors();
        ensure!(
            factors.len() == 2,
            InvalidParameter,
            "{} has {} factors, a two-dimensional mesh needs exactly two",
            model.name(),
            factors.len()
        );
        let rho = model.correlation();
        ensure!(
            rho.is_finite() && rho.abs() <= 1.0,
            InvalidParameter,
            "factor correlation must lie in [-1, 1], got {rho}"
        );
        let x = factor_grid(&factors[0], grid.end(), space_steps, std_devs)?;
        let y = factor_grid(&factors[1], grid.end(), space_steps, std_devs)?;
        let n = grid.steps();

        let mut mesh = Self {
            grid: grid.clone(),
            thetas: (0..n).map(|i| scheme.theta(i, n)).collect(),
            rates: Vec::with_capacity((n + 1) * x.len() * y.len()),
            x,
            y,
            factors: [factors[0], factors[1]],
            rho,
            shifts: Vec::with_capacity(n),
        };
        mesh.fit(model)?;

        debug!(
            model = model.name(),
            time_steps = n,
            space_points = mesh.x.len() * mesh.y.len(),
            ?scheme,
            "two-dimensional mesh fitted"
        );
        Ok(mesh)
    }

    fn fit(&mut self, model: &dyn ShortRateModel) -> Result<()> {
        let n = self.grid.steps();
        let curve = model.term_structure();
        let mut q = vec![0.0; self.x.len() * self.y.len()];
        q[self.centre()] = 1.0;
        for i in 0..n {
            let t = self.grid.time(i);
            let target = curve.discount(self.grid.time(i + 1));
            let phi = fit_shift(
                |phi| match self.forward_adjoint(i, &self.node_rates(model, phi), &q) {
                    Ok(next) => next.iter().sum::<Real>() - target,
                    Err(_) => Real::NAN,
                },
                model.shift_guess(t),
                t,
            )?;
            let rates = self.node_rates(model, phi);
            q = self.forward_adjoint(i, &rates, &q)?;
            self.rates.extend(rates);
            self.shifts.push(phi);
        }
        let last_shift = self.shifts.last().copied().unwrap_or(0.0);
        let rates = self.node_rates(model, last_shift);
        self.rates.extend(rates);
        Ok(())
    }

    /// Factor values of the mesh axes.
    pub fn axes(&self) -> (&[Real], &[Real]) {
        (&self.x, &self.y)
    }

    /// Fitted shift applied over step `i`.
    pub fn shift(&self, i: usize) -> Real {
        self.shifts[i]
    }

    fn centre(&self) -> usize {
        self.x.len() / 2 + (self.y.len() / 2) * self.x.len()
    }

    fn node_rates(&self, model: &dyn ShortRateModel, phi: Real) -> Vec<Real> {
        let mut rates = Vec::with_capacity(self.x.len() * self.y.len());
        for &yj in &self.y {
            rates.extend(self.x.iter().map(|&xi| model.short_rate(phi, xi + yj)));
        }
        rates
    }

    fn slice_rates(&self, i: usize) -> &[Real] {
        let m = self.x.len() * self.y.len();
        &self.rates[i * m..(i + 1) * m]
    }

    fn line_operators(&self, rates: &[Real]) -> LineOperators {
        let (nx, ny) = (self.x.len(), self.y.len());
        LineOperators {
            x: (0..ny)
                .map(|iy| {
                    convection_diffusion(&self.x, &self.factors[0], |ix| 0.5 * rates[ix + iy * nx])
                })
                .collect(),
            y: (0..nx)
                .map(|ix| {
                    convection_diffusion(&self.y, &self.factors[1], |iy| 0.5 * rates[ix + iy * nx])
                })
                .collect(),
        }
    }

    /// Applies `f` to every x-line of `values`, one operator per line.
    fn map_rows<F>(&self, ops: &[TridiagonalOperator], values: &[Real], f: F) -> Result<Vec<Real>>
    where
        F: Fn(&TridiagonalOperator, &[Real]) -> Result<Vec<Real>>,
    {
        let nx = self.x.len();
        let mut out = Vec::with_capacity(values.len());
        for (iy, op) in ops.iter().enumerate() {
            out.extend(f(op, &values[iy * nx..(iy + 1) * nx])?);
        }
        Ok(out)
    }

    /// Applies `f` to every y-line of `values`, one operator per line.
    fn map_columns<F>(
        &self,
        ops: &[TridiagonalOperator],
        values: &[Real],
        f: F,
    ) -> Result<Vec<Real>>
    where
        F: Fn(&TridiagonalOperator, &[Real]) -> Result<Vec<Real>>,
    {
        let (nx, ny) = (self.x.len(), self.y.len());
        let mut out = vec![0.0; values.len()];
        for (ix, op) in ops.iter().enumerate() {
            let column: Vec<Real> = (0..ny).map(|iy| values[ix + iy * nx]).collect();
            for (iy, v) in f(op, &column)?.into_iter().enumerate() {
                out[ix + iy * nx] = v;
            }
        }
        Ok(out)
    }

    fn mixed_coefficient(&self) -> Real {
        self.rho * self.factors[0].volatility * self.factors[1].volatility
            / (4.0 * (self.x[1] - self.x[0]) * (self.y[1] - self.y[0]))
    }

    /// `L0 V` on interior nodes, zero on the boundary.
    fn mixed(&self, values: &[Real]) -> Vec<Real> {
        let (nx, ny) = (self.x.len(), self.y.len());
        let mut out = vec![0.0; nx * ny];
        let coefficient = self.mixed_coefficient();
        if coefficient == 0.0 {
            return out;
        }
        for iy in 1..ny - 1 {
            for ix in 1..nx - 1 {
                let at = |dx: usize, dy: usize| values[(ix + dx - 1) + (iy + dy - 1) * nx];
                out[ix + iy * nx] =
                    coefficient * (at(2, 2) - at(2, 0) - at(0, 2) + at(0, 0));
            }
        }
        out
    }

    /// `L0ᵀ u`.
    fn mixed_adjoint(&self, u: &[Real]) -> Vec<Real> {
        let (nx, ny) = (self.x.len(), self.y.len());
        let mut out = vec![0.0; nx * ny];
        let coefficient = self.mixed_coefficient();
        if coefficient == 0.0 {
            return out;
        }
        for iy in 1..ny - 1 {
            for ix in 1..nx - 1 {
                let c = coefficient * u[ix + iy * nx];
                out[(ix + 1) + (iy + 1) * nx] += c;
                out[(ix + 1) + (iy - 1) * nx] -= c;
                out[(ix - 1) + (iy + 1) * nx] -= c;
                out[(ix - 1) + (iy - 1) * nx] += c;
            }
        }
        out
    }

    /// State prices one step forward: `B_iᵀ q` with the step built on `rates`.
    fn forward_adjoint(&self, i: usize, rates: &[Real], q: &[Real]) -> Result<Vec<Real>> {
        let dt = self.grid.dt(i);
        let theta = self.thetas[i];
        let ops = self.line_operators(rates);

        let w = self.map_columns(&ops.y, q, |op, line| {
            op.identity_plus(-theta * dt).transpose().solve(line)
        })?;
        let u = self.map_rows(&ops.x, &w, |op, line| {
            op.identity_plus(-theta * dt).transpose().solve(line)
        })?;
        let l1u = self.map_rows(&ops.x, &u, |op, line| Ok(op.transpose().apply(line)))?;
        let l2u = self.map_columns(&ops.y, &u, |op, line| Ok(op.transpose().apply(line)))?;
        let l2w = self.map_columns(&ops.y, &w, |op, line| Ok(op.transpose().apply(line)))?;
        let l0u = self.mixed_adjoint(&u);

        Ok((0..u.len())
            .map(|k| {
                u[k] + dt * (l0u[k] + (1.0 - theta) * l1u[k] + l2u[k]) - theta * dt * l2w[k]
            })
            .collect())
    }
}

impl Lattice for FdShortRateMesh2d {
    fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    fn size(&self, _i: usize) -> usize {
        self.x.len() * self.y.len()
    }

    fn short_rate(&self, i: usize, index: usize) -> Real {
        self.slice_rates(i)[index]
    }

    fn step_back(&self, i: usize, values: &[Real]) -> Result<Vec<Real>> {
        check_step_input(self, i, values)?;
        let dt = self.grid.dt(i);
        let theta = self.thetas[i];
        let ops = self.line_operators(self.slice_rates(i));

        let l1v = self.map_rows(&ops.x, values, |op, line| Ok(op.apply(line)))?;
        let l2v = self.map_columns(&ops.y, values, |op, line| Ok(op.apply(line)))?;
        let l0v = self.mixed(values);

        let rhs: Vec<Real> = (0..values.len())
            .map(|k| values[k] + dt * (l0v[k] + l1v[k] + l2v[k]) - theta * dt * l1v[k])
            .collect();
        let y1 = self.map_rows(&ops.x, &rhs, |op, line| {
            op.identity_plus(-theta * dt).solve(line)
        })?;

        let rhs: Vec<Real> = (0..values.len())
            .map(|k| y1[k] - theta * dt * l2v[k])
            .collect();
        self.map_columns(&ops.y, &rhs, |op, line| {
            op.identity_plus(-theta * dt).solve(line)
        })
    }

    fn root_value(&self, values: &[Real]) -> Real {
        values[self.centre()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sr_core::{Error, OptionType};
    use sr_models::{HullWhite, G2};
    use sr_termstructures::{FlatForward, YieldTermStructure};
    use std::sync::Arc;

    fn curve() -> Arc<dyn YieldTermStructure> {
        Arc::new(FlatForward::continuous(0.035))
    }

    fn g2() -> G2 {
        G2::new(curve(), 0.1, 0.01, 0.1, 0.01, -0.75).unwrap()
    }

    #[test]
    fn discount_bonds_match_the_curve() {
        for scheme in [FdScheme::Implicit, FdScheme::default()] {
            let grid = TimeGrid::new(&[1.0, 6.0], 60).unwrap();
            let mesh = FdShortRateMesh2d::new(&g2(), &grid, 40, 4.0, scheme).unwrap();
            for i in 0..=grid.steps() {
                assert_relative_eq!(
                    mesh.discount_bond(i).unwrap(),
                    curve().discount(grid.time(i)),
                    max_relative = 1e-10
                );
            }
        }
    }

    #[test]
    fn forward_step_is_the_transpose_of_the_step_back() {
        let grid = TimeGrid::uniform(2.0, 8).unwrap();
        let scheme = FdScheme::CrankNicolson { damping_steps: 0 };
        let mesh = FdShortRateMesh2d::new(&g2(), &grid, 12, 4.0, scheme).unwrap();
        let m = mesh.size(3);
        let v: Vec<Real> = (0..m).map(|k| 1.0 + (k as Real * 0.37).sin()).collect();
        let q: Vec<Real> = (0..m).map(|k| (k as Real * 0.11).cos().abs()).collect();

        let bv = mesh.step_back(3, &v).unwrap();
        let btq = mesh.forward_adjoint(3, mesh.slice_rates(3), &q).unwrap();
        let lhs: Real = q.iter().zip(&bv).map(|(a, b)| a * b).sum();
        let rhs: Real = btq.iter().zip(&v).map(|(a, b)| a * b).sum();
        assert_relative_eq!(lhs, rhs, max_relative = 1e-12);
    }

    #[test]
    fn shift_is_close_to_the_closed_form() {
        let model = g2();
        let grid = TimeGrid::uniform(5.0, 50).unwrap();
        let mesh = FdShortRateMesh2d::new(&model, &grid, 60, 5.0, FdScheme::default()).unwrap();
        for i in [0, 20, 49] {
            let t = grid.time(i) + 0.5 * grid.dt(i);
            let analytic = model.fitted_shift(t).unwrap();
            assert!((mesh.shift(i) - analytic).abs() < 2e-4, "step {i}: {} vs {analytic}", mesh.shift(i));
        }
    }

    #[test]
    fn zero_bond_option_matches_closed_form() {
        let model = g2();
        let (expiry, maturity, strike) = (1.0, 4.0, 0.90);
        let grid = TimeGrid::new(&[expiry, maturity], 80).unwrap();
        let scheme = FdScheme::CrankNicolson { damping_steps: 2 };
        let mesh = FdShortRateMesh2d::new(&model, &grid, 60, 5.0, scheme).unwrap();
        let (ie, im) = (grid.index(expiry).unwrap(), grid.index(maturity).unwrap());
        let bond = mesh.rollback(vec![1.0; mesh.size(im)], im, ie).unwrap();
        let payoff = bond.iter().map(|p| (p - strike).max(0.0)).collect();
        let fd_price = mesh.root_value(&mesh.rollback(payoff, ie, 0).unwrap());
        let exact = model
            .coupon_bond_option(OptionType::Call, strike, expiry, &[maturity], &[1.0])
            .unwrap()
            .unwrap();
        assert!(
            (fd_price - exact).abs() < 3e-4,
            "mesh {fd_price}, closed form {exact}"
        );
    }

    #[test]
    fn one_factor_model_is_rejected() {
        let model = HullWhite::new(curve(), 0.1, 0.01).unwrap();
        let grid = TimeGrid::uniform(1.0, 4).unwrap();
        assert!(matches!(
            FdShortRateMesh2d::new(&model, &grid, 10, 4.0, FdScheme::Implicit),
            Err(Error::InvalidParameter(_))
        ));
    }
}
