//! # sr-instruments
//!
//! Instruments priced by bermudan-rs: regular schedules of accrual times,
//! fixed and floating coupons, fixed-for-floating swaps and European or
//! Bermudan swaptions on them.
//!
//! All dates are year fractions from the curve's reference date.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod coupon;
pub mod exercise;
pub mod instrument;
pub mod schedule;
pub mod swap;
pub mod swaption;

pub use coupon::{Coupon, CouponKind, FixedRateLegBuilder, FloatingRateLegBuilder, Leg};
pub use exercise::{Exercise, ExerciseType};
pub use instrument::{Instrument, PricingEngine, PricingResults};
pub use schedule::{Frequency, Schedule};
pub use swap::{SwapType, VanillaSwap, VanillaSwapBuilder};
pub use swaption::Swaption;
