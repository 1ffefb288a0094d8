//! Short-rate model capability trait.
//!
//! Every supported model writes the short rate as a deterministic shift
//! plus a sum of zero-mean Ornstein–Uhlenbeck state factors, possibly
//! through a monotone transform:
//!
//! ```text
//! r(t) = g(φ(t) + Σ x_k(t)),   dx_k = −a_k x_k dt + σ_k dW_k,   x_k(0) = 0
//! ```
//!
//! with `g` the identity for the Gaussian models and `exp` for
//! Black–Karasinski. Lattice builders only need the factor moments, the
//! correlation and `g`; the shift `φ` is fitted numerically on each lattice
//! so that it reprices the discount curve. Models with closed forms expose
//! them through the optional methods, which engines probe instead of
//! matching on concrete model types.

use crate::calibrated_model::CalibratedModel;
use sr_core::{ensure, OptionType, Real, Result, Time};
use sr_termstructures::YieldTermStructure;
use std::sync::Arc;

/// `(1 − e^{−a t}) / a`, with the `a → 0` limit handled.
pub fn decay_integral(a: Real, t: Time) -> Real {
    let at = a * t;
    if at.abs() < 1e-6 {
        t * (1.0 - 0.5 * at + at * at / 6.0)
    } else {
        -(-at).exp_m1() / a
    }
}

/// Validate the inputs of a coupon-bond option.
pub(crate) fn check_coupon_bond(
    strike: Real,
    expiry: Time,
    times: &[Time],
    amounts: &[Real],
) -> Result<()> {
    ensure!(
        strike > 0.0 && strike.is_finite(),
        InvalidInstrument,
        "bond option strike must be positive, got {strike}"
    );
    ensure!(expiry >= 0.0, InvalidInstrument, "bond option expiry {expiry} is negative");
    ensure!(
        !times.is_empty() && times.len() == amounts.len(),
        InvalidInstrument,
        "bond needs matching non-empty payment times and amounts ({} vs {})",
        times.len(),
        amounts.len()
    );
    ensure!(
        times[0] > expiry,
        InvalidInstrument,
        "bond payment at {} does not follow option expiry {expiry}",
        times[0]
    );
    for w in times.windows(2) {
        ensure!(
            w[1] > w[0],
            InvalidInstrument,
            "bond payment times must be strictly increasing: {} then {}",
            w[0],
            w[1]
        );
    }
    Ok(())
}

// ── State factors ─────────────────────────────────────────────────────────────

/// A zero-mean Ornstein–Uhlenbeck factor `dx = −a x dt + σ dW`, `x(0) = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateFactor {
    /// Mean-reversion speed `a >= 0`.
    pub mean_reversion: Real,
    /// Volatility `σ > 0`.
    pub volatility: Real,
}

impl StateFactor {
    /// Create a factor.
    pub fn new(mean_reversion: Real, volatility: Real) -> Self {
        Self {
            mean_reversion,
            volatility,
        }
    }

    /// `E[x(t + dt) | x(t) = x]`.
    pub fn expectation(&self, x: Real, dt: Time) -> Real {
        x * (-self.mean_reversion * dt).exp()
    }

    /// `Var[x(t + dt) | x(t)]`.
    pub fn variance(&self, dt: Time) -> Real {
        self.volatility * self.volatility * decay_integral(2.0 * self.mean_reversion, dt)
    }

    /// Standard deviation of `x(t)` seen from time 0.
    pub fn std_deviation(&self, t: Time) -> Real {
        self.variance(t).sqrt()
    }

    /// Conditional mean and variance over `[t, t + dt]` starting from `x`.
    ///
    /// The factor is time-homogeneous, so `t` does not enter.
    pub fn drift_moments(&self, _t: Time, x: Real, dt: Time) -> (Real, Real) {
        (self.expectation(x, dt), self.variance(dt))
    }

    /// Instantaneous drift `−a x`.
    pub fn drift(&self, x: Real) -> Real {
        -self.mean_reversion * x
    }

    /// `Cov[x(t), y(t)]` seen from 0 for two factors with instantaneous
    /// correlation `rho`.
    pub fn covariance(&self, other: &StateFactor, rho: Real, t: Time) -> Real {
        rho * self.volatility
            * other.volatility
            * decay_integral(self.mean_reversion + other.mean_reversion, t)
    }
}

// ── Short-rate model ──────────────────────────────────────────────────────────

/// A short-rate model usable by the lattice and analytic engines.
pub trait ShortRateModel: CalibratedModel {
    /// The discount curve the model is fitted to.
    fn term_structure(&self) -> &Arc<dyn YieldTermStructure>;

    /// The Gaussian state factors, one per model dimension.
    fn factors(&self) -> Vec<StateFactor>;

    /// Instantaneous correlation between the first two factors.
    fn correlation(&self) -> Real {
        0.0
    }

    /// Maps shift plus summed factor state to the short rate.
    fn short_rate(&self, shift: Real, state: Real) -> Real {
        shift + state
    }

    /// Starting point for the numerical shift search at time `t`.
    fn shift_guess(&self, t: Time) -> Real {
        self.fitted_shift(t)
            .unwrap_or_else(|| self.term_structure().instantaneous_forward(t))
    }

    /// Closed-form shift `φ(t)` that makes the model reprice the curve.
    fn fitted_shift(&self, _t: Time) -> Option<Real> {
        None
    }

    /// Closed-form `P(t, maturity | state)`.
    fn discount_bond(&self, _t: Time, _maturity: Time, _state: &[Real]) -> Option<Real> {
        None
    }

    /// Closed-form price at time 0 of a European option expiring at
    /// `expiry` on a bond paying `amounts[i]` at `times[i]`.
    ///
    /// A payer swaption is a put on the fixed-rate bond with strike 1.
    fn coupon_bond_option(
        &self,
        _option: OptionType,
        _strike: Real,
        _expiry: Time,
        _times: &[Time],
        _amounts: &[Real],
    ) -> Option<Result<Real>> {
        None
    }

    /// Number of state factors.
    fn dimension(&self) -> usize {
        self.factors().len()
    }
}
