//! `YieldTermStructure`: yield / interest-rate term structures.
//!
//! Implementors provide the discount factor `P(0, t)`; zero rates and
//! forward rates follow from it.

use sr_core::{Compounding, DiscountFactor, Rate, Real, Time};
use std::fmt::Debug;

/// Small time step used for instantaneous forward rate computations.
const DT: Real = 1.0e-4;

/// A yield (interest-rate) term structure in time coordinates.
///
/// Curves are immutable once built and are shared between models and
/// engines behind an `Arc<dyn YieldTermStructure>`.
pub trait YieldTermStructure: Debug + Send + Sync {
    /// Return the discount factor for time `t >= 0`.
    fn discount_impl(&self, t: Time) -> DiscountFactor;

    /// Return the instantaneous forward rate at time `t`.
    ///
    /// Default: central difference of `-ln P`.
    fn forward_rate_impl(&self, t: Time) -> Rate {
        let t1 = (t - DT / 2.0).max(0.0);
        let t2 = t1 + DT;
        (self.discount_impl(t1).ln() - self.discount_impl(t2).ln()) / DT
    }

    /// Latest time for which the curve is meaningful.
    fn max_time(&self) -> Time {
        Time::INFINITY
    }

    // ── Public interface ─────────────────────────────────────────────────

    /// Discount factor for a time.
    fn discount(&self, t: Time) -> DiscountFactor {
        if t <= 0.0 {
            return 1.0;
        }
        self.discount_impl(t)
    }

    /// Zero rate for time `t` under the given compounding.
    fn zero_rate(&self, t: Time, compounding: Compounding) -> Rate {
        let t = t.max(DT);
        implied_rate(1.0 / self.discount(t), compounding, t)
    }

    /// Forward rate between `t1` and `t2` under the given compounding.
    ///
    /// For `t2 == t1` this is the instantaneous forward, converted.
    fn forward_rate(&self, t1: Time, t2: Time, compounding: Compounding) -> Rate {
        if t2 <= t1 {
            let f = self.forward_rate_impl(t1);
            return match compounding {
                Compounding::Continuous => f,
                _ => {
                    let growth = (f * DT).exp();
                    implied_rate(growth, compounding, DT)
                }
            };
        }
        let growth = self.discount(t1) / self.discount(t2);
        implied_rate(growth, compounding, t2 - t1)
    }

    /// Instantaneous forward rate `f(0, t)`.
    fn instantaneous_forward(&self, t: Time) -> Rate {
        self.forward_rate_impl(t.max(0.0))
    }
}

fn implied_rate(growth: Real, compounding: Compounding, t: Time) -> Rate {
    match compounding {
        Compounding::Continuous => growth.ln() / t,
        Compounding::Simple => (growth - 1.0) / t,
        Compounding::Compounded { per_year } => {
            let n = Real::from(per_year.max(1));
            n * (growth.powf(1.0 / (n * t)) - 1.0)
        }
    }
}
