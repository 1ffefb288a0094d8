//! G2++ two-factor Gaussian short-rate model.
//!
//! ```text
//! r(t) = φ(t) + x(t) + y(t)
//! dx = −a·x dt + σ dW₁
//! dy = −b·y dt + η dW₂
//! dW₁·dW₂ = ρ dt
//! ```
//!
//! Discount bond: `P(t,T) = A(t,T) exp(−B_a(τ)·x − B_b(τ)·y)` with
//! `A(t,T) = P(0,T)/P(0,t) · exp(½[V(T−t) − V(T) + V(t)])`, where `V(τ)` is
//! the variance of `∫ (x + y)` over an interval of length `τ`.
//!
//! European coupon-bond options (hence European swaptions) reduce to a
//! one-dimensional integral over `x(T)` under the `T`-forward measure.

use crate::calibrated_model::{CalibratedModel, Parameter, ParameterConstraint};
use crate::short_rate_model::{check_coupon_bond, decay_integral, ShortRateModel, StateFactor};
use sr_core::{ensure, Error, OptionType, Real, Result, Time};
use sr_math::{brent_with_guess, normal_cdf, Integrator, SimpsonIntegral};
use sr_termstructures::YieldTermStructure;
use std::cell::RefCell;
use std::f64::consts::PI;
use std::sync::Arc;

/// Integration range in standard deviations of `x(T)`.
const INTEGRATION_RANGE: Real = 8.0;

/// G2++ two-factor model.
#[derive(Debug, Clone)]
pub struct G2 {
    term_structure: Arc<dyn YieldTermStructure>,
    params: [Parameter; 5],
}

impl G2 {
    /// Smallest admissible mean reversion; the closed forms divide by `a`
    /// and `b`.
    pub const MIN_MEAN_REVERSION: Real = 1e-4;
    /// Default first-factor mean reversion.
    pub const DEFAULT_A: Real = 0.1;
    /// Default first-factor volatility.
    pub const DEFAULT_SIGMA: Real = 0.01;
    /// Default second-factor mean reversion.
    pub const DEFAULT_B: Real = 0.1;
    /// Default second-factor volatility.
    pub const DEFAULT_ETA: Real = 0.01;
    /// Default correlation.
    pub const DEFAULT_RHO: Real = -0.75;

    /// Create a new G2++ model.
    ///
    /// Fails with `InvalidParameter` when a mean reversion is below
    /// [`G2::MIN_MEAN_REVERSION`], a volatility is not positive, or
    /// `|rho| > 1`.
    pub fn new(
        term_structure: Arc<dyn YieldTermStructure>,
        a: Real,
        sigma: Real,
        b: Real,
        eta: Real,
        rho: Real,
    ) -> Result<Self> {
        let reversion = ParameterConstraint::Boundary {
            lower: Self::MIN_MEAN_REVERSION,
            upper: Real::INFINITY,
        };
        Ok(Self {
            term_structure,
            params: [
                Parameter::new("a", a, reversion)?,
                Parameter::new("sigma", sigma, ParameterConstraint::Positive)?,
                Parameter::new("b", b, reversion)?,
                Parameter::new("eta", eta, ParameterConstraint::Positive)?,
                Parameter::new(
                    "rho",
                    rho,
                    ParameterConstraint::Boundary {
                        lower: -1.0,
                        upper: 1.0,
                    },
                )?,
            ],
        })
    }

    /// First-factor mean reversion.
    pub fn a(&self) -> Real {
        self.params[0].value()
    }

    /// First-factor volatility.
    pub fn sigma(&self) -> Real {
        self.params[1].value()
    }

    /// Second-factor mean reversion.
    pub fn b(&self) -> Real {
        self.params[2].value()
    }

    /// Second-factor volatility.
    pub fn eta(&self) -> Real {
        self.params[3].value()
    }

    /// Factor correlation.
    pub fn rho(&self) -> Real {
        self.params[4].value()
    }

    /// `V(τ)`.
    fn v(&self, tau: Time) -> Real {
        let (a, sigma, b, eta, rho) = (self.a(), self.sigma(), self.b(), self.eta(), self.rho());
        let (da, db) = (decay_integral(a, tau), decay_integral(b, tau));
        let vx = sigma * sigma / (a * a) * (tau - 2.0 * da + decay_integral(2.0 * a, tau));
        let vy = eta * eta / (b * b) * (tau - 2.0 * db + decay_integral(2.0 * b, tau));
        let vxy = 2.0 * rho * sigma * eta / (a * b) * (tau - da - db + decay_integral(a + b, tau));
        vx + vy + vxy
    }

    /// `A(t,T)`.
    fn a_function(&self, t: Time, maturity: Time) -> Real {
        let ts = &self.term_structure;
        ts.discount(maturity) / ts.discount(t)
            * (0.5 * (self.v(maturity - t) - self.v(maturity) + self.v(t))).exp()
    }

    /// `P(t, T | x, y)` in closed form.
    pub fn bond(&self, t: Time, maturity: Time, x: Real, y: Real) -> Real {
        let tau = maturity - t;
        self.a_function(t, maturity)
            * (-decay_integral(self.a(), tau) * x - decay_integral(self.b(), tau) * y).exp()
    }

    fn bond_option_integral(
        &self,
        option: OptionType,
        strike: Real,
        expiry: Time,
        times: &[Time],
        amounts: &[Real],
    ) -> Result<Real> {
        check_coupon_bond(strike, expiry, times, amounts)?;
        let (a, sigma, b, eta, rho) = (self.a(), self.sigma(), self.b(), self.eta(), self.rho());
        let t = expiry;
        // Put on the bond pays like a payer swaption.
        let w = -option.sign();

        let (dat, d2at) = (decay_integral(a, t), decay_integral(2.0 * a, t));
        let (dbt, d2bt) = (decay_integral(b, t), decay_integral(2.0 * b, t));
        let dabt = decay_integral(a + b, t);
        let mu_x = -sigma * sigma / a * (dat - d2at) - rho * sigma * eta / b * (dat - dabt);
        let mu_y = -eta * eta / b * (dbt - d2bt) - rho * sigma * eta / a * (dbt - dabt);
        let sigma_x = sigma * d2at.sqrt();
        let sigma_y = eta * d2bt.sqrt();
        if sigma_x <= Real::EPSILON || sigma_y <= Real::EPSILON {
            let ts = &self.term_structure;
            let bond: Real = times.iter().zip(amounts).map(|(&ti, &c)| c * ts.discount(ti)).sum();
            return Ok((w * (strike * ts.discount(t) - bond)).max(0.0));
        }
        let rho_xy = rho * sigma * eta * dabt / (sigma_x * sigma_y);
        let txy = (1.0 - rho_xy * rho_xy).max(0.0).sqrt();
        ensure!(
            txy > 1e-8,
            InvalidParameter,
            "G2 bond option needs |rho_xy| < 1, got {rho_xy}"
        );

        let coupons: Vec<(Real, Real, Real)> = times
            .iter()
            .zip(amounts)
            .map(|(&ti, &c)| {
                (
                    c / strike * self.a_function(t, ti),
                    decay_integral(a, ti - t),
                    decay_integral(b, ti - t),
                )
            })
            .collect();

        let failure: RefCell<Option<Error>> = RefCell::new(None);
        let integrand = |x: Real| -> Real {
            let lambda: Vec<Real> = coupons.iter().map(|&(ca, ba, _)| ca * (-ba * x).exp()).collect();
            let solving = |y: Real| -> Real {
                1.0 - lambda
                    .iter()
                    .zip(&coupons)
                    .map(|(l, &(_, _, bb))| l * (-bb * y).exp())
                    .sum::<Real>()
            };
            let y_bar = match brent_with_guess(solving, 1e-10, 0.0, 0.01) {
                Ok(y) => y,
                Err(e) => {
                    failure.borrow_mut().get_or_insert(e);
                    return Real::NAN;
                }
            };
            let h1 = (y_bar - mu_y) / (sigma_y * txy) - rho_xy * (x - mu_x) / (sigma_x * txy);
            let mut value = normal_cdf(-w * h1);
            for (l, &(_, _, bb)) in lambda.iter().zip(&coupons) {
                let h2 = h1 + bb * sigma_y * txy;
                let kappa = -bb
                    * (mu_y - 0.5 * txy * txy * sigma_y * sigma_y * bb
                        + rho_xy * sigma_y * (x - mu_x) / sigma_x);
                value -= l * kappa.exp() * normal_cdf(-w * h2);
            }
            let z = (x - mu_x) / sigma_x;
            (-0.5 * z * z).exp() * value / (sigma_x * (2.0 * PI).sqrt())
        };

        let integrator = SimpsonIntegral::new(1e-12, 1 << 14);
        let lower = mu_x - INTEGRATION_RANGE * sigma_x;
        let upper = mu_x + INTEGRATION_RANGE * sigma_x;
        let integral = integrator.integrate(integrand, lower, upper);
        if let Some(e) = failure.into_inner() {
            return Err(e);
        }
        Ok((strike * w * self.term_structure.discount(t) * integral?).max(0.0))
    }
}

impl CalibratedModel for G2 {
    fn name(&self) -> &'static str {
        "G2"
    }

    fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Parameter] {
        &mut self.params
    }
}

impl ShortRateModel for G2 {
    fn term_structure(&self) -> &Arc<dyn YieldTermStructure> {
        &self.term_structure
    }

    fn factors(&self) -> Vec<StateFactor> {
        vec![
            StateFactor::new(self.a(), self.sigma()),
            StateFactor::new(self.b(), self.eta()),
        ]
    }

    fn correlation(&self) -> Real {
        self.rho()
    }

    fn fitted_shift(&self, t: Time) -> Option<Real> {
        let (sigma, eta) = (self.sigma(), self.eta());
        let (da, db) = (decay_integral(self.a(), t), decay_integral(self.b(), t));
        Some(
            self.term_structure.instantaneous_forward(t)
                + 0.5 * sigma * sigma * da * da
                + 0.5 * eta * eta * db * db
                + self.rho() * sigma * eta * da * db,
        )
    }

    fn discount_bond(&self, t: Time, maturity: Time, state: &[Real]) -> Option<Real> {
        let x = state.first().copied().unwrap_or(0.0);
        let y = state.get(1).copied().unwrap_or(0.0);
        Some(self.bond(t, maturity, x, y))
    }

    fn coupon_bond_option(
        &self,
        option: OptionType,
        strike: Real,
        expiry: Time,
        times: &[Time],
        amounts: &[Real],
    ) -> Option<Result<Real>> {
        Some(self.bond_option_integral(option, strike, expiry, times, amounts))
    }
}
