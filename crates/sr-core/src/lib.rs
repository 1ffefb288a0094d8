//! # sr-core
//!
//! Core types and error definitions shared by every crate of the workspace:
//! the primitive type aliases, the error taxonomy of the pricing and
//! calibration engines, the `ensure!` / `fail!` macros, and the small enums
//! (compounding, option type) that several crates need.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Compounding conventions.
pub mod compounding;

/// Error taxonomy and the `ensure!` / `fail!` macros.
pub mod errors;

/// Call / put flag for options on bonds.
pub mod option_type;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the workspace.
pub type Real = f64;

/// Alias used for array sizes / indices.
pub type Size = usize;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A spread over a reference rate.
pub type Spread = Real;

/// A discount factor in (0, 1] under positive rates.
pub type DiscountFactor = Real;

/// A price or value.
pub type Price = Real;

/// A volatility level expressed as a decimal.
pub type Volatility = Real;

/// A time measurement in years from the curve reference date.
pub type Time = Real;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use compounding::Compounding;
pub use errors::{Error, Result};
pub use option_type::OptionType;
