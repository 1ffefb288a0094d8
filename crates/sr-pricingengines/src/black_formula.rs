//! Black's formula on a forward.
//!
//! Used for the market side of swaption calibration: the price of a
//! European swaption is the fixed-leg annuity times Black's formula on the
//! forward swap rate.

use sr_core::{ensure, OptionType, Real, Result};
use sr_math::{brent, normal_cdf, normal_pdf};

/// Upper end of the implied standard deviation search.
const MAX_STD_DEV: Real = 10.0;

fn check_inputs(strike: Real, forward: Real, std_dev: Real, discount: Real) -> Result<()> {
    ensure!(
        strike > 0.0 && forward > 0.0,
        InvalidParameter,
        "Black's formula needs positive strike and forward, got {strike} and {forward}"
    );
    ensure!(
        std_dev >= 0.0 && std_dev.is_finite(),
        InvalidParameter,
        "standard deviation must be finite and non-negative, got {std_dev}"
    );
    ensure!(
        discount > 0.0,
        InvalidParameter,
        "discount must be positive, got {discount}"
    );
    Ok(())
}

/// Black's formula
///
/// $$D\,\omega\left(F N(\omega d_1) - K N(\omega d_2)\right),\quad
///   d_{1,2} = \frac{\ln(F/K)}{s} \pm \frac{s}{2}$$
///
/// where `std_dev` $s = \sigma\sqrt{T}$ and $\omega = \pm 1$ for a call or
/// put.
pub fn black_formula(
    option: OptionType,
    strike: Real,
    forward: Real,
    std_dev: Real,
    discount: Real,
) -> Result<Real> {
    check_inputs(strike, forward, std_dev, discount)?;
    let w = option.sign();
    if std_dev == 0.0 {
        return Ok(discount * (w * (forward - strike)).max(0.0));
    }
    let d1 = (forward / strike).ln() / std_dev + 0.5 * std_dev;
    let d2 = d1 - std_dev;
    let price = discount * w * (forward * normal_cdf(w * d1) - strike * normal_cdf(w * d2));
    Ok(price.max(0.0))
}

/// Derivative of [`black_formula`] with respect to the standard deviation,
/// `D F φ(d1)`; the same for calls and puts.
pub fn black_formula_std_dev_derivative(
    strike: Real,
    forward: Real,
    std_dev: Real,
    discount: Real,
) -> Result<Real> {
    check_inputs(strike, forward, std_dev, discount)?;
    if std_dev == 0.0 {
        return Ok(0.0);
    }
    let d1 = (forward / strike).ln() / std_dev + 0.5 * std_dev;
    Ok(discount * forward * normal_pdf(d1))
}

/// Standard deviation that makes [`black_formula`] return `price`.
///
/// Fails with `Numerical` when `price` lies outside the no-arbitrage
/// range `[intrinsic, D F]` (call) or `[intrinsic, D K]` (put).
pub fn black_implied_std_dev(
    option: OptionType,
    strike: Real,
    forward: Real,
    price: Real,
    discount: Real,
    accuracy: Real,
) -> Result<Real> {
    check_inputs(strike, forward, 0.0, discount)?;
    let intrinsic = discount * (option.sign() * (forward - strike)).max(0.0);
    let cap = match option {
        OptionType::Call => discount * forward,
        OptionType::Put => discount * strike,
    };
    ensure!(
        price >= intrinsic - accuracy && price < cap,
        Numerical,
        "price {price} outside the Black range [{intrinsic}, {cap})"
    );
    if price <= intrinsic {
        return Ok(0.0);
    }
    let objective = |s: Real| {
        black_formula(option, strike, forward, s, discount).unwrap_or(Real::NAN) - price
    };
    brent(objective, 0.0, MAX_STD_DEV, accuracy)
}
