//! Recombining trinomial tree for a zero-mean Ornstein–Uhlenbeck factor.
//!
//! The spacing of slice `i + 1` is `dx = v·√3` with `v²` the conditional
//! variance over step `i`. Each node branches to the three nodes around the
//! one nearest to its conditional mean, with probabilities matching the
//! conditional mean and variance exactly.

use sr_core::{ensure, Real, Result};
use sr_models::StateFactor;

use super::TimeGrid;

/// Probabilities must lie in `[0, 1]` and sum to 1 within this tolerance.
pub(crate) const PROBABILITY_TOLERANCE: Real = 1e-12;

/// Branching data for a single time step of a trinomial factor.
#[derive(Debug, Clone)]
pub(crate) struct Branching {
    /// Middle descendant of each node, as an offset from the centre.
    k: Vec<i32>,
    /// Down, middle and up probabilities of each node.
    probs: Vec<[Real; 3]>,
    /// Extreme offsets reached at the next slice.
    j_min: i32,
    j_max: i32,
}

impl Branching {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            k: Vec::with_capacity(n),
            probs: Vec::with_capacity(n),
            j_min: i32::MAX,
            j_max: i32::MIN,
        }
    }

    pub(crate) fn add(&mut self, k: i32, probs: [Real; 3]) {
        self.k.push(k);
        self.probs.push(probs);
        self.j_min = self.j_min.min(k - 1);
        self.j_max = self.j_max.max(k + 1);
    }

    pub(crate) fn size(&self) -> usize {
        (self.j_max - self.j_min + 1) as usize
    }

    /// Lowest offset reached at the next slice.
    pub(crate) fn j_min(&self) -> i32 {
        self.j_min
    }

    pub(crate) fn descendant(&self, index: usize, branch: usize) -> usize {
        (self.k[index] - self.j_min - 1 + branch as i32) as usize
    }

    pub(crate) fn probabilities(&self, index: usize) -> [Real; 3] {
        self.probs[index]
    }
}

/// Branches from a conditional mean `m` onto the grid `x0 + k·dx` with
/// `dx = v·√3`, returning the middle offset `k` and the down, middle and up
/// probabilities matching mean `m` and variance `v2`.
pub(crate) fn branch(m: Real, x0: Real, v2: Real) -> (i32, [Real; 3]) {
    let v = v2.sqrt();
    let sqrt3 = (3.0 as Real).sqrt();
    let dx = v * sqrt3;
    let k = ((m - x0) / dx + 0.5).floor() as i32;
    let e = m - (x0 + k as Real * dx);
    let e2 = e * e / v2;
    let e3 = e * sqrt3 / v;
    let probs = [
        (1.0 + e2 - e3) / 6.0,
        (2.0 - e2) / 3.0,
        (1.0 + e2 + e3) / 6.0,
    ];
    (k, probs)
}

/// Validates one node's branch probabilities.
pub(crate) fn check_probabilities(probs: &[Real], slice: usize, index: usize) -> Result<()> {
    let sum: Real = probs.iter().sum();
    ensure!(
        probs.iter().all(|p| p.is_finite()
            && *p >= -PROBABILITY_TOLERANCE
            && *p <= 1.0 + PROBABILITY_TOLERANCE)
            && (sum - 1.0).abs() <= 1e-10,
        LatticeConstruction,
        "invalid branch probabilities {probs:?} at slice {slice}, node {index}"
    );
    Ok(())
}

/// A recombining trinomial tree approximating one OU factor.
#[derive(Debug, Clone)]
pub struct TrinomialTree {
    x0: Real,
    /// Node spacing per slice; `dx[0] = 0` for the root.
    dx: Vec<Real>,
    branchings: Vec<Branching>,
    time_grid: TimeGrid,
}

impl TrinomialTree {
    /// Build the tree of `factor` started at `x0` over `grid`.
    pub fn new(factor: &StateFactor, x0: Real, grid: &TimeGrid) -> Result<Self> {
        let n = grid.steps();
        let sqrt3 = (3.0 as Real).sqrt();

        let mut dx = Vec::with_capacity(n + 1);
        dx.push(0.0);
        let mut branchings: Vec<Branching> = Vec::with_capacity(n);
        let (mut j_min, mut j_max) = (0i32, 0i32);

        for i in 0..n {
            let dt = grid.dt(i);
            let v2 = factor.variance(dt);
            ensure!(
                v2.is_finite() && v2 > 0.0,
                InvalidParameter,
                "factor variance over step {i} must be positive, got {v2}"
            );
            let dx_next = v2.sqrt() * sqrt3;

            let mut branching = Branching::with_capacity((j_max - j_min + 1) as usize);
            for (index, j) in (j_min..=j_max).enumerate() {
                let x = x0 + j as Real * dx[i];
                let (k, probs) = branch(factor.expectation(x, dt), x0, v2);
                check_probabilities(&probs, i, index)?;
                branching.add(k, probs);
            }

            j_min = branching.j_min;
            j_max = branching.j_max;
            dx.push(dx_next);
            branchings.push(branching);
        }

        Ok(Self {
            x0,
            dx,
            branchings,
            time_grid: grid.clone(),
        })
    }

    /// The tree's time grid.
    pub fn time_grid(&self) -> &TimeGrid {
        &self.time_grid
    }

    /// Number of time steps.
    pub fn steps(&self) -> usize {
        self.branchings.len()
    }

    /// Number of nodes at slice `i`.
    pub fn size(&self, i: usize) -> usize {
        if i == 0 {
            1
        } else {
            self.branchings[i - 1].size()
        }
    }

    /// Node spacing at slice `i`.
    pub fn dx(&self, i: usize) -> Real {
        self.dx[i]
    }

    /// Factor value at node `(i, index)`.
    pub fn underlying(&self, i: usize, index: usize) -> Real {
        if i == 0 {
            self.x0
        } else {
            let j_min = self.branchings[i - 1].j_min;
            self.x0 + (j_min as Real + index as Real) * self.dx[i]
        }
    }

    /// Descendant at slice `i + 1` of node `index` along `branch` (0..3).
    pub fn descendant(&self, i: usize, index: usize, branch: usize) -> usize {
        self.branchings[i].descendant(index, branch)
    }

    /// Transition probability from node `(i, index)` along `branch`.
    pub fn probability(&self, i: usize, index: usize, branch: usize) -> Real {
        self.branchings[i].probabilities(index)[branch]
    }

    /// Down, middle and up probabilities of node `(i, index)`.
    pub fn probabilities(&self, i: usize, index: usize) -> [Real; 3] {
        self.branchings[i].probabilities(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use sr_core::Error;

    fn tree(a: Real, sigma: Real, end: Real, steps: usize) -> TrinomialTree {
        let grid = TimeGrid::uniform(end, steps).unwrap();
        TrinomialTree::new(&StateFactor::new(a, sigma), 0.0, &grid).unwrap()
    }

    #[test]
    fn sizes_grow_by_at_most_two() {
        let t = tree(0.0, 0.01, 1.0, 10);
        assert_eq!(t.size(0), 1);
        for i in 1..=10 {
            assert_eq!(t.size(i), 2 * i + 1);
        }
    }

    #[test]
    fn mean_reversion_bounds_the_width() {
        let t = tree(0.5, 0.01, 30.0, 300);
        let widest = (0..=300).map(|i| t.size(i)).max().unwrap();
        assert!(widest < 30, "widest slice {widest}");
        assert_eq!(t.size(300), t.size(299));
    }

    #[test]
    fn branching_matches_conditional_moments() {
        let factor = StateFactor::new(0.1, 0.01);
        let t = tree(0.1, 0.01, 5.0, 20);
        let dt = 0.25;
        for i in [3, 10, 19] {
            for index in 0..t.size(i) {
                let x = t.underlying(i, index);
                let (mean, var) = factor.drift_moments(0.0, x, dt);
                let (mut m1, mut m2) = (0.0, 0.0);
                for b in 0..3 {
                    let p = t.probability(i, index, b);
                    let y = t.underlying(i + 1, t.descendant(i, index, b));
                    m1 += p * y;
                    m2 += p * y * y;
                }
                assert_abs_diff_eq!(m1, mean, epsilon = 1e-14);
                assert_abs_diff_eq!(m2 - m1 * m1, var, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn zero_volatility_is_rejected() {
        let grid = TimeGrid::uniform(1.0, 4).unwrap();
        let r = TrinomialTree::new(&StateFactor::new(0.1, 0.0), 0.0, &grid);
        assert!(matches!(r, Err(Error::InvalidParameter(_))));
    }

    proptest! {
        #[test]
        fn probabilities_are_valid(
            a in 0.0f64..2.0,
            sigma in 0.001f64..0.5,
            end in 0.5f64..30.0,
            steps in 1usize..120,
        ) {
            let t = tree(a, sigma, end, steps);
            for i in 0..t.steps() {
                for index in 0..t.size(i) {
                    let p = t.probabilities(i, index);
                    prop_assert!(p.iter().all(|&q| (0.0..=1.0).contains(&q)));
                    prop_assert!((p.iter().sum::<Real>() - 1.0).abs() < 1e-12);
                    prop_assert!(t.descendant(i, index, 2) < t.size(i + 1));
                }
            }
        }
    }
}
