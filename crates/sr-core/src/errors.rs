//! Error types for bermudan-rs.
//!
//! Every failure of the pricing and calibration core maps to one variant of
//! a single `thiserror`-derived enum. Errors are raised where the violated
//! precondition is detected, through the `ensure!` and `fail!` macros
//! defined here, and are never retried inside the library.

use thiserror::Error;

/// The top-level error type used throughout bermudan-rs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Model parameters violate positivity or stationarity constraints, or
    /// a numerical setting (steps, grid size) is degenerate.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed schedule, exercise dates, or instrument definition.
    #[error("invalid instrument: {0}")]
    InvalidInstrument(String),

    /// The discretization is degenerate, e.g. transition probabilities
    /// outside `[0, 1]` or a curve-fitting shift that cannot be bracketed.
    #[error("lattice construction failed: {0}")]
    LatticeConstruction(String),

    /// Empty basket, diverging optimizer, or non-finite residuals.
    #[error("calibration failed: {0}")]
    Calibration(String),

    /// A numerical routine (root finder, integrator) did not converge.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Shorthand `Result` type used throughout bermudan-rs.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns early with the given error kind if `$cond` is false.
///
/// # Example
/// ```
/// use sr_core::{ensure, errors::Error};
/// fn positive(x: f64) -> sr_core::Result<f64> {
///     ensure!(x > 0.0, InvalidParameter, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::InvalidParameter(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $kind:ident, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::$kind(format!($($msg)*)));
        }
    };
}

/// Returns `Err` of the given kind immediately.
///
/// # Example
/// ```
/// use sr_core::{fail, errors::Error};
/// fn always_err() -> sr_core::Result<()> {
///     fail!(Calibration, "basket is empty");
/// }
/// assert_eq!(
///     always_err(),
///     Err(Error::Calibration("basket is empty".into()))
/// );
/// ```
#[macro_export]
macro_rules! fail {
    ($kind:ident, $($msg:tt)*) => {
        return Err($crate::errors::Error::$kind(format!($($msg)*)))
    };
}

impl Error {
    /// Re-tag the error as a calibration failure, keeping its message.
    ///
    /// Used where a pricing error surfaces inside an optimizer run.
    pub fn into_calibration(self) -> Self {
        match self {
            Error::Calibration(msg) => Error::Calibration(msg),
            other => Error::Calibration(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_steps(n: usize) -> Result<usize> {
        ensure!(n > 0, InvalidParameter, "time steps must be positive");
        Ok(n)
    }

    #[test]
    fn ensure_maps_to_requested_kind() {
        assert_eq!(checked_steps(3), Ok(3));
        assert_eq!(
            checked_steps(0),
            Err(Error::InvalidParameter("time steps must be positive".into()))
        );
    }

    #[test]
    fn display_includes_kind() {
        let e = Error::LatticeConstruction("p_up = -0.1".into());
        assert_eq!(e.to_string(), "lattice construction failed: p_up = -0.1");
    }

    #[test]
    fn retag_as_calibration() {
        let e = Error::Numerical("brent: no bracket".into()).into_calibration();
        assert!(matches!(e, Error::Calibration(ref m) if m.contains("brent")));
    }
}
