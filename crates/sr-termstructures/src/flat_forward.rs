//! `FlatForward`: a yield term structure with a constant forward rate.

use crate::yield_term_structure::YieldTermStructure;
use sr_core::{ensure, Compounding, DiscountFactor, Rate, Result, Time};

/// A flat (constant) forward-rate yield term structure.
///
/// Discount factors are `P(t) = exp(-r t)` where `r` is the
/// continuously-compounded equivalent of the supplied rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatForward {
    rate: Rate,
}

impl FlatForward {
    /// Create a flat-forward curve from a rate quoted under `compounding`.
    ///
    /// The rate is converted once to its continuous equivalent over one year.
    pub fn new(rate: Rate, compounding: Compounding) -> Result<Self> {
        ensure!(rate.is_finite(), InvalidParameter, "flat rate must be finite, got {rate}");
        let continuous = compounding.to_continuous(rate, 1.0);
        ensure!(
            continuous.is_finite(),
            InvalidParameter,
            "rate {rate} has no continuous equivalent under {compounding:?}"
        );
        Ok(Self { rate: continuous })
    }

    /// Create a flat-forward curve assuming continuous compounding.
    pub fn continuous(rate: Rate) -> Self {
        Self { rate }
    }

    /// The continuously-compounded flat rate.
    pub fn rate(&self) -> Rate {
        self.rate
    }
}

impl YieldTermStructure for FlatForward {
    fn discount_impl(&self, t: Time) -> DiscountFactor {
        (-self.rate * t).exp()
    }

    fn forward_rate_impl(&self, _t: Time) -> Rate {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn continuous_discounts() {
        let curve = FlatForward::continuous(0.035);
        assert_abs_diff_eq!(curve.discount(5.0), (-0.175_f64).exp(), epsilon = 1e-15);
        assert_abs_diff_eq!(curve.instantaneous_forward(2.3), 0.035);
        assert_abs_diff_eq!(
            curve.zero_rate(4.0, Compounding::Continuous),
            0.035,
            epsilon = 1e-14
        );
    }

    #[test]
    fn annual_quote_is_converted() {
        let curve = FlatForward::new(0.05, Compounding::Compounded { per_year: 1 }).unwrap();
        assert_abs_diff_eq!(curve.rate(), 1.05_f64.ln(), epsilon = 1e-15);
        assert_abs_diff_eq!(curve.discount(2.0), 1.0 / 1.05_f64.powi(2), epsilon = 1e-14);
    }

    #[test]
    fn rejects_nan() {
        assert!(FlatForward::new(f64::NAN, Compounding::Continuous).is_err());
    }
}
