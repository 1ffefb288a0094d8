//! # sr-pricingengines
//!
//! Pricing engines for swaps and swaptions.
//!
//! ## Engines
//!
//! - [`DiscountingSwapEngine`]: discounted cash flows, fair rate and annuity
//! - [`BlackSwaptionEngine`]: market-convention European swaption price
//! - [`AnalyticSwaptionEngine`]: closed-form European swaption under a
//!   short-rate model (Hull–White, G2)
//! - [`LatticeSwaptionEngine`]: Bermudan swaptions by backward induction
//!   on a tree or finite-difference lattice
//!
//! [`EnginePolicy`] picks between the last two.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod analytic_swaption_engine;
pub mod black_formula;
pub mod black_swaption_engine;
pub mod discounting_swap_engine;
pub mod engine_config;
pub mod lattice_swaption_engine;

pub use analytic_swaption_engine::{closed_form_price, AnalyticSwaptionEngine};
pub use black_formula::{black_formula, black_formula_std_dev_derivative, black_implied_std_dev};
pub use black_swaption_engine::BlackSwaptionEngine;
pub use discounting_swap_engine::{DiscountingSwapEngine, SwapLegValues};
pub use engine_config::{EngineConfig, EnginePolicy, ExerciseTieBreak};
pub use lattice_swaption_engine::{
    price_on_lattice, ExerciseDiagnostics, LatticeSwaptionEngine, LatticeSwaptionResults,
};
