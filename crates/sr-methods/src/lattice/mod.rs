//! Time grids and lattices for short-rate models.
//!
//! # Overview
//!
//! * [`TimeGrid`]: grid of times containing every mandatory time exactly
//! * [`Lattice`]: slice sizes, short rates and one-step rollback
//! * [`TrinomialTree`]: recombining trinomial tree for one OU factor
//! * [`OneFactorTreeLattice`]: curve-fitted tree for one-factor models
//! * [`TwoFactorTreeLattice`]: curve-fitted nine-branch tree for two-factor
//!   models

pub mod one_factor;
pub mod trinomial_tree;
pub mod two_factor;

pub use one_factor::OneFactorTreeLattice;
pub use trinomial_tree::TrinomialTree;
pub use two_factor::TwoFactorTreeLattice;

use sr_core::{ensure, Error, Real, Result, Time};
use sr_math::{brent_with_guess, close_enough};
use std::fmt;

/// Absolute accuracy of the fitted shift at each slice.
pub(crate) const SHIFT_ACCURACY: Real = 1e-12;

/// Initial bracketing step of the shift search.
pub(crate) const SHIFT_STEP: Real = 0.01;

// ─── TimeGrid ─────────────────────────────────────────────────────────────────

/// A grid of time points used by lattice methods.
///
/// The grid starts at 0 and ends at the latest mandatory time. Every
/// mandatory time is a grid point; the intervals between consecutive
/// mandatory times are split into equal sub-steps no longer than
/// (approximately) `end / steps`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<Time>,
    dts: Vec<Time>,
    mandatory: Vec<Time>,
}

impl TimeGrid {
    /// Build a grid containing all of `mandatory` with about `steps`
    /// intervals overall.
    pub fn new(mandatory: &[Time], steps: usize) -> Result<Self> {
        ensure!(steps > 0, InvalidParameter, "time grid needs at least one step");
        for &t in mandatory {
            ensure!(
                t.is_finite() && t >= 0.0,
                InvalidParameter,
                "time grid points must be finite and non-negative, got {t}"
            );
        }

        let mut points: Vec<Time> = mandatory.to_vec();
        points.push(0.0);
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup_by(|a, b| close_enough(*a, *b, 100));

        let end = points[points.len() - 1];
        ensure!(end > 0.0, InvalidParameter, "time grid end must be positive");

        let dt_max = end / steps as Real;
        let mut times = vec![0.0];
        for w in points.windows(2) {
            let (start, stop) = (w[0], w[1]);
            let n = (((stop - start) / dt_max + 0.5).floor() as usize).max(1);
            let dt = (stop - start) / n as Real;
            for k in 1..n {
                times.push(start + k as Real * dt);
            }
            times.push(stop);
        }
        let dts = times.windows(2).map(|w| w[1] - w[0]).collect();

        Ok(Self {
            times,
            dts,
            mandatory: points,
        })
    }

    /// Uniform grid from 0 to `end` with `steps` intervals.
    pub fn uniform(end: Time, steps: usize) -> Result<Self> {
        Self::new(&[end], steps)
    }

    /// Number of time points (= steps + 1).
    pub fn size(&self) -> usize {
        self.times.len()
    }

    /// Number of steps (= time points − 1).
    pub fn steps(&self) -> usize {
        self.dts.len()
    }

    /// Time at index `i`.
    pub fn time(&self, i: usize) -> Time {
        self.times[i]
    }

    /// Time step between index `i` and `i+1`.
    pub fn dt(&self, i: usize) -> Time {
        self.dts[i]
    }

    /// Final time.
    pub fn end(&self) -> Time {
        self.times[self.times.len() - 1]
    }

    /// All time points.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// The mandatory times, sorted, deduplicated and including 0.
    pub fn mandatory_times(&self) -> &[Time] {
        &self.mandatory
    }

    /// Index of the grid point closest to `t`.
    pub fn closest_index(&self, t: Time) -> usize {
        let pos = self.times.partition_point(|&x| x < t);
        if pos == 0 {
            0
        } else if pos == self.times.len() {
            self.times.len() - 1
        } else if t - self.times[pos - 1] <= self.times[pos] - t {
            pos - 1
        } else {
            pos
        }
    }

    /// Index of the grid point equal to `t`; fails if `t` is not on the grid.
    pub fn index(&self, t: Time) -> Result<usize> {
        let i = self.closest_index(t);
        ensure!(
            close_enough(self.times[i], t, 100),
            InvalidParameter,
            "time {t} is not on the grid (closest point {})",
            self.times[i]
        );
        Ok(i)
    }
}

// ─── Lattice ──────────────────────────────────────────────────────────────────

/// A discretized short-rate model over a [`TimeGrid`].
///
/// Slice `i` holds the nodes alive at `time_grid().time(i)`. Values at a
/// slice are plain vectors of length `size(i)`; the rollback operator maps
/// values at slice `i + 1` to their discounted expectation at slice `i`.
pub trait Lattice: fmt::Debug + Send + Sync {
    /// The lattice's time grid.
    fn time_grid(&self) -> &TimeGrid;

    /// Number of nodes at slice `i`.
    fn size(&self, i: usize) -> usize;

    /// Short rate at node `index` of slice `i`.
    fn short_rate(&self, i: usize, index: usize) -> Real;

    /// Discounted conditional expectation of `values` (given at slice
    /// `i + 1`) at slice `i`.
    fn step_back(&self, i: usize, values: &[Real]) -> Result<Vec<Real>>;

    /// Value at the root node, given the values at slice 0.
    fn root_value(&self, values: &[Real]) -> Real;

    /// Roll `values` back from slice `from` to slice `to <= from`.
    fn rollback(&self, values: Vec<Real>, from: usize, to: usize) -> Result<Vec<Real>> {
        ensure!(
            to <= from && from <= self.time_grid().steps(),
            InvalidParameter,
            "cannot roll back from slice {from} to slice {to}"
        );
        let mut values = values;
        for i in (to..from).rev() {
            values = self.step_back(i, &values)?;
        }
        Ok(values)
    }

    /// Lattice price of the zero-coupon bond maturing at slice `i`.
    fn discount_bond(&self, i: usize) -> Result<Real> {
        let values = self.rollback(vec![1.0; self.size(i)], i, 0)?;
        Ok(self.root_value(&values))
    }
}

/// Checks that a rollback input has the size of slice `i + 1`.
pub(crate) fn check_step_input(lattice: &dyn Lattice, i: usize, values: &[Real]) -> Result<()> {
    ensure!(
        i < lattice.time_grid().steps(),
        InvalidParameter,
        "no step back from slice {}",
        i + 1
    );
    ensure!(
        values.len() == lattice.size(i + 1),
        InvalidParameter,
        "slice {} has {} nodes, got {} values",
        i + 1,
        lattice.size(i + 1),
        values.len()
    );
    Ok(())
}

/// Solves `objective(φ) = 0` for the shift applied over the step starting
/// at time `t`.
pub(crate) fn fit_shift<F>(objective: F, guess: Real, t: Time) -> Result<Real>
where
    F: Fn(Real) -> Real,
{
    brent_with_guess(objective, SHIFT_ACCURACY, guess, SHIFT_STEP).map_err(|e| {
        Error::LatticeConstruction(format!("cannot fit the curve at t = {t}: {e}"))
    })
}

/// Start offset of every slice in a flat node arena, plus the total size.
pub(crate) fn slice_offsets(sizes: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut offsets = vec![0];
    for size in sizes {
        offsets.push(offsets[offsets.len() - 1] + size);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use sr_core::Error;

    #[test]
    fn uniform_grid() {
        let grid = TimeGrid::uniform(2.0, 4).unwrap();
        assert_eq!(grid.steps(), 4);
        assert_eq!(grid.times(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_abs_diff_eq!(grid.dt(2), 0.5);
    }

    #[test]
    fn mandatory_times_are_hit_exactly() {
        let grid = TimeGrid::new(&[1.0, 6.0, 3.3, 1.0], 10).unwrap();
        assert_eq!(grid.end(), 6.0);
        for &t in &[0.0, 1.0, 3.3, 6.0] {
            let i = grid.index(t).unwrap();
            assert_eq!(grid.time(i), t);
        }
        assert_eq!(grid.mandatory_times(), &[0.0, 1.0, 3.3, 6.0]);
    }

    #[test]
    fn closely_spaced_mandatory_times_get_one_step() {
        let grid = TimeGrid::new(&[1.0, 1.01, 2.0], 4).unwrap();
        assert!(grid.index(1.01).is_ok());
        assert_eq!(grid.index(1.01).unwrap(), grid.index(1.0).unwrap() + 1);
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        assert!(matches!(TimeGrid::new(&[1.0], 0), Err(Error::InvalidParameter(_))));
        assert!(matches!(TimeGrid::new(&[-1.0], 5), Err(Error::InvalidParameter(_))));
        assert!(matches!(TimeGrid::new(&[0.0], 5), Err(Error::InvalidParameter(_))));
        assert!(matches!(
            TimeGrid::new(&[Real::NAN], 5),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn off_grid_time_is_rejected() {
        let grid = TimeGrid::uniform(1.0, 4).unwrap();
        assert_eq!(grid.closest_index(0.3), 1);
        assert!(grid.index(0.3).is_err());
    }

    proptest! {
        #[test]
        fn grid_is_increasing_and_contains_mandatory(
            mut times in proptest::collection::vec(0.01f64..30.0, 1..8),
            steps in 1usize..200,
        ) {
            let grid = TimeGrid::new(&times, steps).unwrap();
            prop_assert!(grid.times().windows(2).all(|w| w[1] > w[0]));
            times.sort_by(|a, b| a.total_cmp(b));
            for t in times {
                prop_assert!(grid.index(t).is_ok());
            }
        }
    }
}
