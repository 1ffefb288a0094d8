//! Black-Karasinski short-rate model.
//!
//! ```text
//! r(t) = exp(φ(t) + x(t)),   dx = −a x dt + σ dW,   x(0) = 0
//! ```
//!
//! A log-normal short-rate model: rates stay positive by construction.
//! There is no closed-form bond price, so `φ` only exists as the
//! numerically fitted shift of a lattice and every price comes from a
//! tree or a finite-difference mesh.

use crate::calibrated_model::{CalibratedModel, Parameter, ParameterConstraint};
use crate::short_rate_model::{ShortRateModel, StateFactor};
use sr_core::{Real, Result, Time};
use sr_termstructures::YieldTermStructure;
use std::sync::Arc;

/// Floor applied to the forward rate before taking its log for the shift
/// search starting point.
const MIN_GUESS_RATE: Real = 1e-6;

/// Black-Karasinski short-rate model.
#[derive(Debug, Clone)]
pub struct BlackKarasinski {
    term_structure: Arc<dyn YieldTermStructure>,
    params: [Parameter; 2],
}

impl BlackKarasinski {
    /// Default mean reversion.
    pub const DEFAULT_A: Real = 0.1;
    /// Default volatility of `ln r`.
    pub const DEFAULT_SIGMA: Real = 0.1;

    /// Create a new Black-Karasinski model; fails with `InvalidParameter`
    /// when `a < 0` or `sigma <= 0`.
    pub fn new(term_structure: Arc<dyn YieldTermStructure>, a: Real, sigma: Real) -> Result<Self> {
        Ok(Self {
            term_structure,
            params: [
                Parameter::new("a", a, ParameterConstraint::NonNegative)?,
                Parameter::new("sigma", sigma, ParameterConstraint::Positive)?,
            ],
        })
    }

    /// Mean-reversion speed.
    pub fn a(&self) -> Real {
        self.params[0].value()
    }

    /// Volatility of `ln r`.
    pub fn sigma(&self) -> Real {
        self.params[1].value()
    }
}

impl CalibratedModel for BlackKarasinski {
    fn name(&self) -> &'static str {
        "BlackKarasinski"
    }

    fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Parameter] {
        &mut self.params
    }
}

impl ShortRateModel for BlackKarasinski {
    fn term_structure(&self) -> &Arc<dyn YieldTermStructure> {
        &self.term_structure
    }

    fn factors(&self) -> Vec<StateFactor> {
        vec![StateFactor::new(self.a(), self.sigma())]
    }

    fn short_rate(&self, shift: Real, state: Real) -> Real {
        (shift + state).exp()
    }

    /// Log of the forward rate, lowered by half the factor variance so that
    /// `E[r(t)]` starts near `f(0, t)`.
    fn shift_guess(&self, t: Time) -> Real {
        let f = self.term_structure.instantaneous_forward(t).max(MIN_GUESS_RATE);
        f.ln() - 0.5 * StateFactor::new(self.a(), self.sigma()).variance(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sr_core::OptionType;
    use sr_termstructures::FlatForward;

    fn bk() -> BlackKarasinski {
        BlackKarasinski::new(Arc::new(FlatForward::continuous(0.035)), 0.1, 0.1).unwrap()
    }

    #[test]
    fn rates_are_exponential_in_state() {
        let m = bk();
        assert_abs_diff_eq!(m.short_rate(0.035_f64.ln(), 0.0), 0.035, epsilon = 1e-15);
        assert!(m.short_rate(-50.0, -10.0) > 0.0);
    }

    #[test]
    fn no_closed_forms() {
        let m = bk();
        assert!(m.fitted_shift(1.0).is_none());
        assert!(m.discount_bond(0.0, 1.0, &[0.0]).is_none());
        assert!(m
            .coupon_bond_option(OptionType::Put, 1.0, 1.0, &[2.0], &[1.0])
            .is_none());
    }

    #[test]
    fn shift_guess_is_near_log_forward() {
        let m = bk();
        let g = m.shift_guess(1.0);
        assert!((m.short_rate(g, 0.0) - 0.035).abs() < 0.001);
    }

    #[test]
    fn set_params_validates() {
        let mut m = bk();
        assert!(m.set_params(&[0.2, -0.1]).is_err());
        m.set_params(&[0.2, 0.15]).unwrap();
        assert_eq!(m.sigma(), 0.15);
        assert_eq!(m.dimension(), 1);
    }
}
