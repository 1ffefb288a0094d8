//! # sr-termstructures
//!
//! The discount-curve seam consumed by the short-rate models, plus two
//! minimal curves: a flat forward curve and a log-linear discount curve.
//! Times are year fractions from the curve reference date.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// `YieldTermStructure`: the discount-factor interface.
pub mod yield_term_structure;

/// `FlatForward`: constant forward-rate yield curve.
pub mod flat_forward;

/// `InterpolatedDiscountCurve`: log-linear interpolation on discount factors.
pub mod interpolated_discount_curve;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use flat_forward::FlatForward;
pub use interpolated_discount_curve::InterpolatedDiscountCurve;
pub use yield_term_structure::YieldTermStructure;
