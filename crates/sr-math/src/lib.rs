//! # sr-math
//!
//! Numerical building blocks shared by the models, lattices and the
//! calibration engine: the standard normal distribution (via statrs),
//! bracketing root finders, quadrature, and a Levenberg–Marquardt
//! least-squares optimizer over nalgebra vectors.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Floating-point comparison utilities.
pub mod comparison;

/// Probability distributions.
pub mod distributions;

/// Numerical integration.
pub mod integrals;

/// Least-squares optimization.
pub mod optimization;

/// 1D root-finding solvers.
pub mod solvers1d;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use comparison::{close, close_enough};
pub use distributions::{normal_cdf, normal_pdf};
pub use integrals::{Integrator, SimpsonIntegral};
pub use optimization::{
    BoxConstraint, Constraint, CostFunction, EndCriteria, EndCriteriaType, LevenbergMarquardt,
    NoConstraint, OptimizationResult,
};
pub use solvers1d::{bracket, brent, brent_with_guess};
