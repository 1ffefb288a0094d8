//! Discounting swap pricing engine.
//!
//! Prices fixed-for-floating swaps by discounting every coupon on the
//! curve, with floating coupons paying the curve's simply-compounded
//! forward over their accrual period.

use std::sync::Arc;

use sr_core::{ensure, Rate, Real, Result, Time};
use sr_instruments::{Coupon, CouponKind, PricingEngine, PricingResults, VanillaSwap};
use sr_termstructures::YieldTermStructure;

/// Present values of the two legs of a swap, per the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapLegValues {
    /// Value of the fixed coupons.
    pub fixed: Real,
    /// Value of the floating coupons, spread included.
    pub floating: Real,
    /// Value of the fixed leg per unit of fixed rate, `Σ N τ P(T)`.
    pub annuity: Real,
}

impl SwapLegValues {
    /// Fixed rate that gives the swap zero value.
    pub fn fair_rate(&self) -> Result<Rate> {
        ensure!(
            self.annuity > 0.0,
            InvalidInstrument,
            "swap has no fixed coupons left to fix a rate on"
        );
        Ok(self.floating / self.annuity)
    }
}

/// Discounting swap pricing engine.
///
/// The NPV of a vanilla swap is
///
/// $$\text{NPV} = \phi \left(\sum_j N (F_j + s) \tau_j P(T_j) -
///   \sum_i N K \tau_i P(T_i)\right)$$
///
/// where $\phi = +1$ for a payer swap and $-1$ for a receiver, and
/// $F_j = (P(S_j)/P(E_j) - 1)/\tau_j$ is the curve forward.
#[derive(Debug, Clone)]
pub struct DiscountingSwapEngine {
    discount_curve: Arc<dyn YieldTermStructure>,
}

impl DiscountingSwapEngine {
    /// Create a new engine with the given discount curve.
    pub fn new(discount_curve: Arc<dyn YieldTermStructure>) -> Self {
        Self { discount_curve }
    }

    /// The discount curve.
    pub fn discount_curve(&self) -> &Arc<dyn YieldTermStructure> {
        &self.discount_curve
    }

    fn coupon_npv(&self, coupon: &Coupon) -> Real {
        let df = self.discount_curve.discount(coupon.payment_time);
        let forward = match coupon.kind {
            CouponKind::Fixed { .. } => 0.0,
            CouponKind::Floating { .. } => {
                let growth = self.discount_curve.discount(coupon.accrual_start)
                    / self.discount_curve.discount(coupon.accrual_end);
                (growth - 1.0) / coupon.accrual_fraction
            }
        };
        coupon.amount(forward) * df
    }

    /// Leg values over the coupons whose accrual starts at or after `from`
    /// and which are still to be paid.
    pub fn leg_values(&self, swap: &VanillaSwap, from: Time) -> SwapLegValues {
        let alive = |c: &&Coupon| c.accrual_start >= from - 1e-12 && c.payment_time > 0.0;
        let mut values = SwapLegValues {
            fixed: 0.0,
            floating: 0.0,
            annuity: 0.0,
        };
        for coupon in swap.fixed_leg().iter().filter(alive) {
            values.fixed += self.coupon_npv(coupon);
            values.annuity += coupon.nominal
                * coupon.accrual_fraction
                * self.discount_curve.discount(coupon.payment_time);
        }
        for coupon in swap.floating_leg().iter().filter(alive) {
            values.floating += self.coupon_npv(coupon);
        }
        values
    }

    /// NPV of the swap to its holder.
    pub fn npv(&self, swap: &VanillaSwap) -> Real {
        let legs = self.leg_values(swap, Time::NEG_INFINITY);
        swap.swap_type().sign() * (legs.floating - legs.fixed)
    }

    /// Fixed rate at which the swap is worth zero.
    pub fn fair_rate(&self, swap: &VanillaSwap) -> Result<Rate> {
        self.leg_values(swap, Time::NEG_INFINITY).fair_rate()
    }

    /// Fixed-leg annuity `Σ N τ P(T)`.
    pub fn annuity(&self, swap: &VanillaSwap) -> Real {
        self.leg_values(swap, Time::NEG_INFINITY).annuity
    }
}

impl PricingEngine<VanillaSwap> for DiscountingSwapEngine {
    fn calculate(&self, swap: &VanillaSwap) -> Result<PricingResults> {
        let legs = self.leg_values(swap, Time::NEG_INFINITY);
        let npv = swap.swap_type().sign() * (legs.floating - legs.fixed);
        Ok(PricingResults::from_npv(npv)
            .with_result("fixed_leg_npv", legs.fixed)
            .with_result("floating_leg_npv", legs.floating)
            .with_result("annuity", legs.annuity)
            .with_result("fair_rate", legs.fair_rate()?))
    }
}
