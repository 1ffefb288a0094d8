//! θ-scheme mesh for one-factor short-rate models.
//!
//! Over step `i` the value vector is propagated backward by
//! `(I − θ·dt·L_i) V_i = (I + (1 − θ)·dt·L_i) V_{i+1}`, where `L_i` carries
//! the short rate `g(φ_i + x)`. The shifts are fitted going forward: the
//! state-price vector obeys the adjoint recursion
//! `Q_{i+1} = (I + (1 − θ)·dt·L_i)ᵀ (I − θ·dt·L_i)⁻ᵀ Q_i` with `Q_0` the unit
//! vector at the centre node, and `φ_i` is chosen so that `Σ Q_{i+1}` equals
//! the curve's discount factor at `t_{i+1}`.

use sr_core::{ensure, Real, Result};
use sr_models::{ShortRateModel, StateFactor};
use tracing::debug;

use super::{convection_diffusion, factor_grid, FdScheme, TridiagonalOperator};
use crate::lattice::{check_step_input, fit_shift, Lattice, TimeGrid};

#[derive(Debug, Clone)]
struct StepOperators {
    implicit: TridiagonalOperator,
    explicit: Option<TridiagonalOperator>,
}

impl StepOperators {
    fn new(l: &TridiagonalOperator, theta: Real, dt: Real) -> Self {
        Self {
            implicit: l.identity_plus(-theta * dt),
            explicit: (theta < 1.0).then(|| l.identity_plus((1.0 - theta) * dt)),
        }
    }

    fn backward(&self, values: &[Real]) -> Result<Vec<Real>> {
        match &self.explicit {
            Some(explicit) => self.implicit.solve(&explicit.apply(values)),
            None => self.implicit.solve(values),
        }
    }

    fn forward_adjoint(&self, state_prices: &[Real]) -> Result<Vec<Real>> {
        let y = self.implicit.transpose().solve(state_prices)?;
        Ok(match &self.explicit {
            Some(explicit) => explicit.transpose().apply(&y),
            None => y,
        })
    }
}

/// Finite-difference mesh of a one-factor short-rate model.
#[derive(Debug, Clone)]
pub struct FdShortRateMesh1d {
    grid: TimeGrid,
    x: Vec<Real>,
    shifts: Vec<Real>,
    /// Short rate per node, slice-major.
    rates: Vec<Real>,
    steps: Vec<StepOperators>,
}

impl FdShortRateMesh1d {
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
            factors.len() == 1,
            InvalidParameter,
            "{} has {} factors, a one-dimensional mesh needs exactly one",
            model.name(),
            factors.len()
        );
        let factor: StateFactor = factors[0];
        let x = factor_grid(&factor, grid.end(), space_steps, std_devs)?;
        let m = x.len();
        let n = grid.steps();
        let curve = model.term_structure();

        let step_operators = |phi: Real, i: usize| {
            let l = convection_diffusion(&x, &factor, |j| model.short_rate(phi, x[j]));
            StepOperators::new(&l, scheme.theta(i, n), grid.dt(i))
        };

        let mut q = vec![0.0; m];
        q[m / 2] = 1.0;
        let mut shifts = Vec::with_capacity(n);
        let mut steps = Vec::with_capacity(n);
        let mut rates = Vec::with_capacity((n + 1) * m);
        for i in 0..n {
            let t = grid.time(i);
            let target = curve.discount(grid.time(i + 1));
            let phi = fit_shift(
                |phi| match step_operators(phi, i).forward_adjoint(&q) {
                    Ok(next) => next.iter().sum::<Real>() - target,
                    Err(_) => Real::NAN,
                },
                model.shift_guess(t),
                t,
            )?;
            let ops = step_operators(phi, i);
            q = ops.forward_adjoint(&q)?;
            rates.extend(x.iter().map(|&xj| model.short_rate(phi, xj)));
            shifts.push(phi);
            steps.push(ops);
        }
        let last_shift = shifts.last().copied().unwrap_or(0.0);
        rates.extend(x.iter().map(|&xj| model.short_rate(last_shift, xj)));

        debug!(
            model = model.name(),
            time_steps = n,
            space_points = m,
            x_max = x[m - 1],
            ?scheme,
            "one-dimensional mesh fitted"
        );

        Ok(Self {
            grid: grid.clone(),
            x,
            shifts,
            rates,
            steps,
        })
    }

    /// Factor values of the mesh points.
    pub fn states(&self) -> &[Real] {
        &self.x
    }

    /// Fitted shift applied over step `i`.
    pub fn shift(&self, i: usize) -> Real {
        self.shifts[i]
    }
}

impl Lattice for FdShortRateMesh1d {
    fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    fn size(&self, _i: usize) -> usize {
        self.x.len()
    }

    fn short_rate(&self, i: usize, index: usize) -> Real {
        self.rates[i * self.x.len() + index]
    }

    fn step_back(&self, i: usize, values: &[Real]) -> Result<Vec<Real>> {
        check_step_input(self, i, values)?;
        self.steps[i].backward(values)
    }

    fn root_value(&self, values: &[Real]) -> Real {
        values[self.x.len() / 2]
    }
}
