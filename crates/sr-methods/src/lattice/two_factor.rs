//! Curve-fitted tree for two-factor short-rate models.
//!
//! The first factor `x` runs on its own [`TrinomialTree`]. The second is
//! carried as the residual `z = y − β·x`, where `β = Cov[x, y] / Var[x]`
//! over the step just taken, so that the shocks of `x` and `z` over a step
//! are uncorrelated. Each node then branches into the product of two
//! trinomial branchings, which keeps every probability non-negative while
//! the conditional means, variances and covariance of `(x, y)` are matched
//! exactly for any `|ρ| < 1`.
//!
//! Nodes of slice `i` are pairs `(i1, i2)` flattened as `i1 + i2 · size1(i)`,
//! with `i1` indexing `x` and `i2` indexing `z`. Branch `b` moves `x` along
//! `b % 3` and `z` along `b / 3`.

use sr_core::{ensure, Real, Result};
use sr_models::{ShortRateModel, StateFactor};
use tracing::debug;

use super::trinomial_tree::{branch, check_probabilities, Branching, TrinomialTree};
use super::{check_step_input, fit_shift, slice_offsets, Lattice, TimeGrid};

/// Residual variance, relative to the second factor's, below which the
/// factors are treated as perfectly correlated.
const DEGENERATE_RESIDUAL: Real = 1e-10;

/// Tree lattice of a two-factor short-rate model.
#[derive(Debug, Clone)]
pub struct TwoFactorTreeLattice {
    tree1: TrinomialTree,
    /// Residual spacing per slice; `dz[0] = 0` for the root.
    dz: Vec<Real>,
    /// Loading `β` of the second factor on the first, per slice.
    loadings: Vec<Real>,
    /// Residual branching of every node, per step.
    branchings: Vec<Branching>,
    shifts: Vec<Real>,
    offsets: Vec<usize>,
    rates: Vec<Real>,
    discounts: Vec<Real>,
    state_prices: Vec<Real>,
}

impl TwoFactorTreeLattice {
    /// Build and fit the tree of `model` over `grid`.
    ///
    /// Fails with `LatticeConstruction` when the factors are perfectly
    /// correlated, since the residual factor then has no variance to branch
    /// on.
    pub fn new(model: &dyn ShortRateModel, grid: &TimeGrid) -> Result<Self> {
        let factors = model.factors();
        ensure!(
            factors.len() == 2,
            InvalidParameter,
            "{} has {} factors, a two-factor tree needs exactly two",
            model.name(),
            factors.len()
        );
        let rho = model.correlation();
        ensure!(
            rho.is_finite() && rho.abs() <= 1.0,
            InvalidParameter,
            "factor correlation must lie in [-1, 1], got {rho}"
        );

        let tree1 = TrinomialTree::new(&factors[0], 0.0, grid)?;
        let mut lattice = Self {
            tree1,
            dz: vec![0.0],
            loadings: vec![0.0],
            branchings: Vec::with_capacity(grid.steps()),
            shifts: Vec::new(),
            offsets: Vec::new(),
            rates: Vec::new(),
            discounts: Vec::new(),
            state_prices: Vec::new(),
        };
        lattice.branch_residual(&factors[0], &factors[1], rho, grid)?;
        lattice.fit(model, grid)?;
        Ok(lattice)
    }

    fn branch_residual(
        &mut self,
        f1: &StateFactor,
        f2: &StateFactor,
        rho: Real,
        grid: &TimeGrid,
    ) -> Result<()> {
        for i in 0..grid.steps() {
            let dt = grid.dt(i);
            let v1 = f1.variance(dt);
            let v2 = f2.variance(dt);
            ensure!(
                v2.is_finite() && v2 > 0.0,
                InvalidParameter,
                "factor variance over step {i} must be positive, got {v2}"
            );
            let cov = f1.covariance(f2, rho, dt);
            let beta = cov / v1;
            let vz = v2 - beta * cov;
            ensure!(
                vz > DEGENERATE_RESIDUAL * v2,
                LatticeConstruction,
                "correlation {rho} leaves no residual variance over step {i}"
            );

            let mut branching = Branching::with_capacity(self.size(i));
            for index in 0..self.size(i) {
                let (x, y) = self.factor_values(i, index);
                let m = f2.expectation(y, dt) - beta * f1.expectation(x, dt);
                let (k, probs) = branch(m, 0.0, vz);
                check_probabilities(&probs, i, index)?;
                branching.add(k, probs);
            }
            self.branchings.push(branching);
            self.dz.push(vz.sqrt() * (3.0 as Real).sqrt());
            self.loadings.push(beta);
        }
        Ok(())
    }

    fn fit(&mut self, model: &dyn ShortRateModel, grid: &TimeGrid) -> Result<()> {
        let n = grid.steps();
        let curve = model.term_structure();
        self.offsets = slice_offsets((0..=n).map(|i| self.size(i)));
        let total = self.offsets[n + 1];
        self.rates.reserve(total);
        self.discounts.reserve(self.offsets[n]);
        self.state_prices.reserve(total);

        let mut q = vec![1.0];
        for i in 0..n {
            let (t, dt) = (grid.time(i), grid.dt(i));
            let states = self.states(i);
            let target = curve.discount(grid.time(i + 1));

            let phi = fit_shift(
                |phi| {
                    q.iter()
                        .zip(&states)
                        .map(|(qj, &x)| qj * (-model.short_rate(phi, x) * dt).exp())
                        .sum::<Real>()
                        - target
                },
                model.shift_guess(t),
                t,
            )?;

            let mut next = vec![0.0; self.size(i + 1)];
            for (index, &x) in states.iter().enumerate() {
                let r = model.short_rate(phi, x);
                let disc = (-r * dt).exp();
                self.rates.push(r);
                self.discounts.push(disc);
                let probs = self.branch_probabilities(i, index);
                for (b, p) in probs.iter().enumerate() {
                    next[self.descendant(i, index, b)] += q[index] * p * disc;
                }
            }
            self.state_prices.extend_from_slice(&q);
            self.shifts.push(phi);
            q = next;
        }
        let last_shift = self.shifts.last().copied().unwrap_or(0.0);
        let final_states = self.states(n);
        self.rates
            .extend(final_states.iter().map(|&x| model.short_rate(last_shift, x)));
        self.state_prices.extend_from_slice(&q);

        debug!(
            model = model.name(),
            steps = n,
            nodes = total,
            correlation = model.correlation(),
            "two-factor tree fitted"
        );
        Ok(())
    }

    /// Summed factor state of every node at slice `i`.
    fn states(&self, i: usize) -> Vec<Real> {
        (0..self.size(i))
            .map(|index| {
                let (x, y) = self.factor_values(i, index);
                x + y
            })
            .collect()
    }

    fn split(&self, i: usize, index: usize) -> (usize, usize) {
        let s1 = self.tree1.size(i);
        (index % s1, index / s1)
    }

    fn size2(&self, i: usize) -> usize {
        if i == 0 {
            1
        } else {
            self.branchings[i - 1].size()
        }
    }

    /// Nine branch probabilities of node `index` at slice `i`.
    fn branch_probabilities(&self, i: usize, index: usize) -> [Real; 9] {
        let (i1, _) = self.split(i, index);
        let p1 = self.tree1.probabilities(i, i1);
        let p2 = self.branchings[i].probabilities(index);
        let mut probs = [0.0; 9];
        for (b, p) in probs.iter_mut().enumerate() {
            *p = p1[b % 3] * p2[b / 3];
        }
        probs
    }

    /// The tree of the first factor.
    pub fn first_tree(&self) -> &TrinomialTree {
        &self.tree1
    }

    /// Fitted shift applied over step `i`.
    pub fn shift(&self, i: usize) -> Real {
        self.shifts[i]
    }

    /// Arrow–Debreu prices of the nodes at slice `i`.
    pub fn state_prices(&self, i: usize) -> &[Real] {
        &self.state_prices[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Transition probability from node `index` at slice `i` along `branch`
    /// (0..9).
    pub fn probability(&self, i: usize, index: usize, branch: usize) -> Real {
        self.branch_probabilities(i, index)[branch]
    }

    /// Descendant at slice `i + 1` of node `index` along `branch` (0..9).
    pub fn descendant(&self, i: usize, index: usize, branch: usize) -> usize {
        let (i1, _) = self.split(i, index);
        let d1 = self.tree1.descendant(i, i1, branch % 3);
        let d2 = self.branchings[i].descendant(index, branch / 3);
        d1 + d2 * self.tree1.size(i + 1)
    }

    /// Values `(x, y)` of both factors at node `index` of slice `i`.
    pub fn factor_values(&self, i: usize, index: usize) -> (Real, Real) {
        let (i1, i2) = self.split(i, index);
        let x = self.tree1.underlying(i, i1);
        if i == 0 {
            return (x, 0.0);
        }
        let z = (self.branchings[i - 1].j_min() as Real + i2 as Real) * self.dz[i];
        (x, z + self.loadings[i] * x)
    }
}

impl Lattice for TwoFactorTreeLattice {
    fn time_grid(&self) -> &TimeGrid {
        self.tree1.time_grid()
    }

    fn size(&self, i: usize) -> usize {
        self.tree1.size(i) * self.size2(i)
    }

    fn short_rate(&self, i: usize, index: usize) -> Real {
        self.rates[self.offsets[i] + index]
    }

    fn step_back(&self, i: usize, values: &[Real]) -> Result<Vec<Real>> {
        check_step_input(self, i, values)?;
        let discounts = &self.discounts[self.offsets[i]..self.offsets[i + 1]];
        let mut out = Vec::with_capacity(discounts.len());
        for (index, disc) in discounts.iter().enumerate() {
            let probs = self.branch_probabilities(i, index);
            let expected: Real = probs
                .iter()
                .enumerate()
                .map(|(b, p)| p * values[self.descendant(i, index, b)])
                .sum();
            out.push(disc * expected);
        }
        Ok(out)
    }

    fn root_value(&self, values: &[Real]) -> Real {
        values[0]
    }
}
