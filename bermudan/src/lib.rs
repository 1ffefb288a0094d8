//! # bermudan
//!
//! Bermudan swaption pricing on short-rate lattices, with Levenberg–Marquardt
//! calibration of the models to European swaption volatilities.
//!
//! This crate is a **façade** that re-exports the workspace crates and adds
//! [`price_bermudan`], which prices the standard 1y-into-5y payer deal in
//! one call.
//!
//! ## Quick start
//!
//! ```no_run
//! let atm = bermudan::price_bermudan(0.035, "hw", "tree", 1.0)?;
//! let otm = bermudan::price_bermudan(0.035, "hw", "tree", 1.2)?;
//! assert!(otm < atm);
//! # Ok::<(), bermudan::core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, and error definitions.
pub use sr_core as core;

/// Root finding, normal distribution, integration, optimization.
pub use sr_math as math;

/// Discount curves.
pub use sr_termstructures as termstructures;

/// Hull–White, Black–Karasinski and G2 short-rate models.
pub use sr_models as models;

/// Trinomial trees and finite-difference meshes.
pub use sr_methods as methods;

/// Schedules, swaps and swaptions.
pub use sr_instruments as instruments;

/// Swap and swaption pricing engines.
pub use sr_pricingengines as pricingengines;

/// Calibration baskets and the model calibrator.
pub use sr_calibration as calibration;

pub mod pricer;

pub use pricer::{engine_config, price_bermudan, standard_swaption, PriceRequest};
