//! Curve-fitted trinomial tree for one-factor short-rate models.
//!
//! The short rate at node `j` of slice `i` is `g(φ_i + x_j)`. The shifts
//! `φ_i` are found slice by slice with forward induction on Arrow–Debreu
//! prices, so that the tree reprices every discount bond on the grid.

use sr_core::{ensure, Real, Result};
use sr_models::ShortRateModel;
use tracing::debug;

use super::trinomial_tree::TrinomialTree;
use super::{check_step_input, fit_shift, slice_offsets, Lattice, TimeGrid};

/// Trinomial tree lattice of a one-factor short-rate model.
#[derive(Debug, Clone)]
pub struct OneFactorTreeLattice {
    tree: TrinomialTree,
    shifts: Vec<Real>,
    offsets: Vec<usize>,
    /// Short rate per node, all slices.
    rates: Vec<Real>,
    /// One-step discount factor per node, slices `0..n`.
    discounts: Vec<Real>,
    /// Arrow–Debreu price per node, all slices.
    state_prices: Vec<Real>,
}

impl OneFactorTreeLattice {
    /// Build and fit the tree of `model` over `grid`.
    pub fn new(model: &dyn ShortRateModel, grid: &TimeGrid) -> Result<Self> {
        let factors = model.factors();
        ensure!(
            factors.len() == 1,
            InvalidParameter,
            "{} has {} factors, a one-factor tree needs exactly one",
            model.name(),
            factors.len()
        );
        let tree = TrinomialTree::new(&factors[0], 0.0, grid)?;
        let n = grid.steps();
        let curve = model.term_structure();

        let offsets = slice_offsets((0..=n).map(|i| tree.size(i)));
        let total = offsets[n + 1];
        let mut shifts = Vec::with_capacity(n);
        let mut rates = Vec::with_capacity(total);
        let mut discounts = Vec::with_capacity(offsets[n]);
        let mut state_prices = Vec::with_capacity(total);

        let mut q = vec![1.0];
        for i in 0..n {
            let (t, dt) = (grid.time(i), grid.dt(i));
            let xs: Vec<Real> = (0..tree.size(i)).map(|j| tree.underlying(i, j)).collect();
            let target = curve.discount(grid.time(i + 1));

            let phi = fit_shift(
                |phi| {
                    q.iter()
                        .zip(&xs)
                        .map(|(qj, &x)| qj * (-model.short_rate(phi, x) * dt).exp())
                        .sum::<Real>()
                        - target
                },
                model.shift_guess(t),
                t,
            )?;

            let mut next = vec![0.0; tree.size(i + 1)];
            for (j, &x) in xs.iter().enumerate() {
                let r = model.short_rate(phi, x);
                let disc = (-r * dt).exp();
                rates.push(r);
                discounts.push(disc);
                for b in 0..3 {
                    next[tree.descendant(i, j, b)] += q[j] * tree.probability(i, j, b) * disc;
                }
            }
            state_prices.extend_from_slice(&q);
            shifts.push(phi);
            q = next;
        }
        let last_shift = shifts.last().copied().unwrap_or(0.0);
        rates.extend((0..tree.size(n)).map(|j| model.short_rate(last_shift, tree.underlying(n, j))));
        state_prices.extend_from_slice(&q);

        debug!(
            model = model.name(),
            steps = n,
            nodes = total,
            widest = (0..=n).map(|i| tree.size(i)).max().unwrap_or(1),
            "one-factor tree fitted"
        );

        Ok(Self {
            tree,
            shifts,
            offsets,
            rates,
            discounts,
            state_prices,
        })
    }

    /// The underlying factor tree.
    pub fn tree(&self) -> &TrinomialTree {
        &self.tree
    }

    /// Fitted shift applied over step `i`.
    pub fn shift(&self, i: usize) -> Real {
        self.shifts[i]
    }

    /// Arrow–Debreu prices of the nodes at slice `i`.
    pub fn state_prices(&self, i: usize) -> &[Real] {
        &self.state_prices[self.offsets[i]..self.offsets[i + 1]]
    }
}

impl Lattice for OneFactorTreeLattice {
    fn time_grid(&self) -> &TimeGrid {
        self.tree.time_grid()
    }

    fn size(&self, i: usize) -> usize {
        self.tree.size(i)
    }

    fn short_rate(&self, i: usize, index: usize) -> Real {
        self.rates[self.offsets[i] + index]
    }

    fn step_back(&self, i: usize, values: &[Real]) -> Result<Vec<Real>> {
        check_step_input(self, i, values)?;
        let discounts = &self.discounts[self.offsets[i]..self.offsets[i + 1]];
        Ok(discounts
            .iter()
            .enumerate()
            .map(|(j, disc)| {
                let expected: Real = (0..3)
                    .map(|b| self.tree.probability(i, j, b) * values[self.tree.descendant(i, j, b)])
                    .sum();
                disc * expected
            })
            .collect())
    }

    fn root_value(&self, values: &[Real]) -> Real {
        values[0]
    }
}
