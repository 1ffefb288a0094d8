//! # sr-models
//!
//! Calibratable short-rate models.
//!
//! ## Trait hierarchy
//!
//! ```text
//! CalibratedModel
//! └── ShortRateModel  → HullWhite, BlackKarasinski (one factor), G2 (two factors)
//! ```
//!
//! All three write the short rate over zero-mean Ornstein–Uhlenbeck
//! factors, which is what the lattice builders consume.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Infrastructure ───────────────────────────────────────────────────────
pub mod calibrated_model;
pub mod model_kind;
pub mod model_record;
pub mod short_rate_model;

// ── One-factor short-rate models ─────────────────────────────────────────
pub mod black_karasinski;
pub mod hull_white_model;

// ── Two-factor short-rate models ─────────────────────────────────────────
pub mod g2_model;

// ── Re-exports ───────────────────────────────────────────────────────────
pub use black_karasinski::BlackKarasinski;
pub use calibrated_model::{CalibratedModel, Parameter, ParameterConstraint, POSITIVE_FLOOR};
pub use g2_model::G2;
pub use hull_white_model::HullWhite;
pub use model_kind::ModelKind;
pub use model_record::ModelRecord;
pub use short_rate_model::{decay_integral, ShortRateModel, StateFactor};
