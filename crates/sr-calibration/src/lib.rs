//! # sr-calibration
//!
//! Fitting short-rate models to European swaption volatilities.
//!
//! A basket of [`SwaptionHelper`]s prices each at-the-money swaption with
//! Black's formula at its quoted volatility; [`Calibrator`] then moves the
//! free model parameters with Levenberg–Marquardt until the model prices
//! match, and reports a [`CalibrationResult`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use sr_calibration::{diagonal_basket, Calibrator};
//! use sr_models::HullWhite;
//! use sr_termstructures::{FlatForward, YieldTermStructure};
//!
//! let curve: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::continuous(0.035));
//! let basket = diagonal_basket(&curve)?;
//! let mut model = HullWhite::new(curve, 0.1, 0.01)?;
//! let result = Calibrator::default().calibrate(&mut model, &basket)?;
//! println!("{:?}", result.params);
//! # Ok::<(), sr_core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod basket;
pub mod calibrator;
pub mod result;
pub mod swaption_helper;

pub use basket::{build_basket, diagonal_basket, diagonal_quotes, SWAPTION_VOLS};
pub use calibrator::{CalibrationConfig, CalibrationRun, Calibrator, OptimizerConfig};
pub use result::{CalibrationDiagnostics, CalibrationResult, FittedParameter, HelperDiagnostics};
pub use swaption_helper::{
    ErrorType, SwaptionHelper, SwaptionQuote, IMPLIED_VOL_ACCURACY, MAX_IMPLIED_VOL,
    MIN_IMPLIED_VOL,
};
