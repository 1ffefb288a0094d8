//! Hull-White (extended Vasicek) model.
//!
//! ```text
//! r(t) = φ(t) + x(t),   dx = −a x dt + σ dW,   x(0) = 0
//! ```
//!
//! `φ` is chosen so that the model reprices the initial curve exactly:
//! `φ(t) = f(0,t) + σ²/(2a²)·(1 − e^{−at})²`.
//!
//! Discount bond:
//! `P(t,T|x) = P(0,T)/P(0,t) · exp(−B x − σ²/2 · [B·B_a(t)² + B²·B_{2a}(t)])`
//! with `B = B_a(T − t)` and `B_a(τ) = (1 − e^{−aτ})/a`.

use crate::calibrated_model::{CalibratedModel, Parameter, ParameterConstraint};
use crate::short_rate_model::{check_coupon_bond, decay_integral, ShortRateModel, StateFactor};
use sr_core::{OptionType, Real, Result, Time};
use sr_math::{brent_with_guess, normal_cdf};
use sr_termstructures::YieldTermStructure;
use std::sync::Arc;

/// Hull-White one-factor model.
#[derive(Debug, Clone)]
pub struct HullWhite {
    term_structure: Arc<dyn YieldTermStructure>,
    params: [Parameter; 2],
}

impl HullWhite {
    /// Default mean reversion.
    pub const DEFAULT_A: Real = 0.1;
    /// Default volatility.
    pub const DEFAULT_SIGMA: Real = 0.01;

    /// Create a new Hull-White model; fails with `InvalidParameter` when
    /// `a < 0` or `sigma <= 0`.
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

    /// Volatility.
    pub fn sigma(&self) -> Real {
        self.params[1].value()
    }

    /// `B(t,T) = (1 − e^{−a(T−t)})/a`.
    pub fn b_function(&self, t: Time, maturity: Time) -> Real {
        decay_integral(self.a(), maturity - t)
    }

    /// `P(t, T | x)` in closed form.
    pub fn bond(&self, t: Time, maturity: Time, x: Real) -> Real {
        let (a, sigma) = (self.a(), self.sigma());
        let ts = &self.term_structure;
        let b = self.b_function(t, maturity);
        let ba = decay_integral(a, t);
        let convexity = 0.5 * sigma * sigma * (b * ba * ba + b * b * decay_integral(2.0 * a, t));
        ts.discount(maturity) / ts.discount(t) * (-b * x - convexity).exp()
    }

    /// Price at 0 of a European option expiring at `expiry` on the zero
    /// bond maturing at `maturity`.
    pub fn discount_bond_option(
        &self,
        option: OptionType,
        strike: Real,
        expiry: Time,
        maturity: Time,
    ) -> Real {
        let ts = &self.term_structure;
        let p_expiry = ts.discount(expiry);
        let p_maturity = ts.discount(maturity);
        let sigma_p = self.sigma()
            * decay_integral(2.0 * self.a(), expiry).sqrt()
            * self.b_function(expiry, maturity);
        let w = option.sign();
        if sigma_p <= Real::EPSILON {
            return (w * (p_maturity - strike * p_expiry)).max(0.0);
        }
        let h = (p_maturity / (p_expiry * strike)).ln() / sigma_p + 0.5 * sigma_p;
        w * (p_maturity * normal_cdf(w * h) - strike * p_expiry * normal_cdf(w * (h - sigma_p)))
    }

    /// Jamshidian decomposition of a coupon-bond option into zero-bond
    /// options struck at the bond prices at the critical state `x*`.
    fn jamshidian(
        &self,
        option: OptionType,
        strike: Real,
        expiry: Time,
        times: &[Time],
        amounts: &[Real],
    ) -> Result<Real> {
        check_coupon_bond(strike, expiry, times, amounts)?;
        let bond_value = |x: Real| -> Real {
            times
                .iter()
                .zip(amounts)
                .map(|(&t, &c)| c * self.bond(expiry, t, x))
                .sum::<Real>()
                - strike
        };
        let x_star = brent_with_guess(bond_value, 1e-12, 0.0, 0.01)?;
        Ok(times
            .iter()
            .zip(amounts)
            .map(|(&t, &c)| {
                let k = self.bond(expiry, t, x_star);
                c * self.discount_bond_option(option, k, expiry, t)
            })
            .sum())
    }
}

impl CalibratedModel for HullWhite {
    fn name(&self) -> &'static str {
        "HullWhite"
    }

    fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Parameter] {
        &mut self.params
    }
}

impl ShortRateModel for HullWhite {
    fn term_structure(&self) -> &Arc<dyn YieldTermStructure> {
        &self.term_structure
    }

    fn factors(&self) -> Vec<StateFactor> {
        vec![StateFactor::new(self.a(), self.sigma())]
    }

    fn fitted_shift(&self, t: Time) -> Option<Real> {
        let ba = decay_integral(self.a(), t);
        let sigma = self.sigma();
        Some(self.term_structure.instantaneous_forward(t) + 0.5 * sigma * sigma * ba * ba)
    }

    fn discount_bond(&self, t: Time, maturity: Time, state: &[Real]) -> Option<Real> {
        Some(self.bond(t, maturity, state.first().copied().unwrap_or(0.0)))
    }

    fn coupon_bond_option(
        &self,
        option: OptionType,
        strike: Real,
        expiry: Time,
        times: &[Time],
        amounts: &[Real],
    ) -> Option<Result<Real>> {
        Some(self.jamshidian(option, strike, expiry, times, amounts))
    }
}
