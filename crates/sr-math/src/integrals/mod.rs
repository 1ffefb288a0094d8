//! Numerical integration.

use sr_core::{fail, Real, Result};

/// A numerical integrator.
pub trait Integrator {
    /// Integrate `f` on `[a, b]`.
    fn integrate<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Result<Real>;
}

// ── Simpson ───────────────────────────────────────────────────────────────────

/// Composite Simpson's rule with successive interval halving.
///
/// Each refinement reuses the ordinates of the previous trapezoid sum, so
/// going from `n` to `2n` intervals costs `n` new evaluations. Iteration
/// stops once two successive Simpson estimates agree within the absolute
/// accuracy, after at least `min_refinements` halvings.
#[derive(Debug, Clone)]
pub struct SimpsonIntegral {
    absolute_accuracy: Real,
    max_evaluations: usize,
    min_refinements: u32,
}

impl SimpsonIntegral {
    /// Create a new Simpson integrator.
    pub fn new(absolute_accuracy: Real, max_evaluations: usize) -> Self {
        Self {
            absolute_accuracy,
            max_evaluations,
            min_refinements: 4,
        }
    }

    /// Require at least `n` halvings before the accuracy test applies.
    pub fn with_min_refinements(mut self, n: u32) -> Self {
        self.min_refinements = n;
        self
    }
}

impl Integrator for SimpsonIntegral {
    fn integrate<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Result<Real> {
        if a == b {
            return Ok(0.0);
        }
        let mut n = 1usize;
        let mut trapezoid = 0.5 * (b - a) * (f(a) + f(b));
        let mut evaluations = 2usize;
        let mut old_simpson = trapezoid;
        let mut refinements = 0u32;

        loop {
            let h = (b - a) / n as Real;
            let midpoints: Real = (0..n).map(|i| f(a + (i as Real + 0.5) * h)).sum();
            evaluations += n;
            let refined = 0.5 * (trapezoid + h * midpoints);
            let simpson = (4.0 * refined - trapezoid) / 3.0;
            refinements += 1;
            n *= 2;

            if !simpson.is_finite() {
                fail!(Numerical, "simpson: non-finite integrand on [{a}, {b}]");
            }
            if refinements >= self.min_refinements
                && (simpson - old_simpson).abs() <= self.absolute_accuracy
            {
                return Ok(simpson);
            }
            if evaluations + n > self.max_evaluations {
                fail!(
                    Numerical,
                    "simpson: max evaluations ({}) exceeded, last change {:e}",
                    self.max_evaluations,
                    (simpson - old_simpson).abs()
                );
            }
            old_simpson = simpson;
            trapezoid = refined;
        }
    }
}
