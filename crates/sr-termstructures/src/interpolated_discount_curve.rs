//! `InterpolatedDiscountCurve`: a yield term structure built from discount
//! factors at pillar times.
//!
//! Interpolation is linear in `ln P(t)`, which gives piecewise-constant
//! instantaneous forwards. Beyond the last pillar the last forward is held
//! flat.

use crate::yield_term_structure::YieldTermStructure;
use sr_core::{ensure, DiscountFactor, Rate, Result, Time};

/// A yield curve defined by discount factors at known times.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedDiscountCurve {
    times: Vec<Time>,
    discounts: Vec<DiscountFactor>,
    log_discounts: Vec<f64>,
}

impl InterpolatedDiscountCurve {
    /// Build a curve from pillar times and discount factors.
    ///
    /// The first pillar must be `t = 0` with `P = 1`; times must be strictly
    /// increasing and discount factors positive.
    pub fn new(times: &[Time], discounts: &[DiscountFactor]) -> Result<Self> {
        ensure!(
            times.len() >= 2,
            InvalidParameter,
            "need at least 2 pillars (reference + 1), got {}",
            times.len()
        );
        ensure!(
            times.len() == discounts.len(),
            InvalidParameter,
            "{} times but {} discount factors",
            times.len(),
            discounts.len()
        );
        ensure!(times[0] == 0.0, InvalidParameter, "first pillar must be t = 0, got {}", times[0]);
        ensure!(
            (discounts[0] - 1.0).abs() < 1e-12,
            InvalidParameter,
            "first discount factor must be 1.0, got {}",
            discounts[0]
        );
        for w in times.windows(2) {
            ensure!(
                w[1] > w[0],
                InvalidParameter,
                "pillar times must be strictly increasing: {} then {}",
                w[0],
                w[1]
            );
        }
        for &p in discounts {
            ensure!(
                p > 0.0 && p.is_finite(),
                InvalidParameter,
                "discount factors must be positive, got {p}"
            );
        }
        Ok(Self {
            times: times.to_vec(),
            discounts: discounts.to_vec(),
            log_discounts: discounts.iter().map(|p| p.ln()).collect(),
        })
    }

    /// Return the pillar times.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Return the pillar discount factors.
    pub fn discounts(&self) -> &[DiscountFactor] {
        &self.discounts
    }

    /// Index `i` of the segment `[t_i, t_{i+1}]` used for time `t`.
    fn segment(&self, t: Time) -> usize {
        let last = self.times.len() - 2;
        match self.times.partition_point(|&ti| ti <= t) {
            0 => 0,
            k => (k - 1).min(last),
        }
    }

    fn segment_forward(&self, i: usize) -> Rate {
        (self.log_discounts[i] - self.log_discounts[i + 1]) / (self.times[i + 1] - self.times[i])
    }
}

impl YieldTermStructure for InterpolatedDiscountCurve {
    fn discount_impl(&self, t: Time) -> DiscountFactor {
        let i = self.segment(t);
        (self.log_discounts[i] - self.segment_forward(i) * (t - self.times[i])).exp()
    }

    fn forward_rate_impl(&self, t: Time) -> Rate {
        self.segment_forward(self.segment(t))
    }

    fn max_time(&self) -> Time {
        self.times[self.times.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn curve() -> InterpolatedDiscountCurve {
        InterpolatedDiscountCurve::new(&[0.0, 1.0, 2.0, 5.0], &[1.0, 0.97, 0.935, 0.84]).unwrap()
    }

    #[test]
    fn reproduces_pillars() {
        let c = curve();
        for (&t, &p) in c.times().iter().zip(c.discounts()) {
            assert_abs_diff_eq!(c.discount(t), p, epsilon = 1e-15);
        }
    }

    #[test]
    fn log_linear_between_pillars() {
        let c = curve();
        assert_abs_diff_eq!(c.discount(1.5), (0.97_f64 * 0.935).sqrt(), epsilon = 1e-15);
        assert_abs_diff_eq!(c.instantaneous_forward(1.5), (0.97_f64 / 0.935).ln(), epsilon = 1e-14);
    }

    #[test]
    fn flat_forward_extrapolation() {
        let c = curve();
        let f = (0.935_f64 / 0.84).ln() / 3.0;
        assert_abs_diff_eq!(c.discount(7.0), 0.84 * (-2.0 * f).exp(), epsilon = 1e-14);
        assert_eq!(c.max_time(), 5.0);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(InterpolatedDiscountCurve::new(&[0.0], &[1.0]).is_err());
        assert!(InterpolatedDiscountCurve::new(&[0.0, 1.0], &[0.99, 0.95]).is_err());
        assert!(InterpolatedDiscountCurve::new(&[0.0, 2.0, 1.0], &[1.0, 0.9, 0.95]).is_err());
        assert!(InterpolatedDiscountCurve::new(&[0.0, 1.0], &[1.0, -0.5]).is_err());
        assert!(InterpolatedDiscountCurve::new(&[0.0, 1.0], &[1.0]).is_err());
    }

    proptest::proptest! {
        #[test]
        fn discount_decreases_with_positive_forwards(t in 0.0f64..10.0, dt in 1e-6f64..1.0) {
            let c = curve();
            proptest::prop_assert!(c.discount(t + dt) < c.discount(t));
        }
    }
}
