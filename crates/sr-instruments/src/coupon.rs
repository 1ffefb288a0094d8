//! Fixed and floating coupons and the builders of their legs.

use crate::schedule::Schedule;
use sr_core::{Rate, Real, Spread, Time};

/// What a coupon pays per unit of nominal and accrual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CouponKind {
    /// A fixed rate.
    Fixed {
        /// Coupon rate.
        rate: Rate,
    },
    /// The simply-compounded forward over the accrual period plus a spread.
    Floating {
        /// Spread over the forward.
        spread: Spread,
    },
}

/// A coupon accruing over `[accrual_start, accrual_end]`, paid at
/// `payment_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupon {
    /// Accrual start (the reset time of a floating coupon).
    pub accrual_start: Time,
    /// Accrual end.
    pub accrual_end: Time,
    /// Payment time.
    pub payment_time: Time,
    /// Accrual fraction `τ`.
    pub accrual_fraction: Real,
    /// Nominal.
    pub nominal: Real,
    /// Fixed or floating.
    pub kind: CouponKind,
}

impl Coupon {
    /// Whether the coupon pays a fixed rate.
    pub fn is_fixed(&self) -> bool {
        matches!(self.kind, CouponKind::Fixed { .. })
    }

    /// Amount paid given the forward rate over the accrual period; fixed
    /// coupons ignore `forward`.
    pub fn amount(&self, forward: Rate) -> Real {
        let rate = match self.kind {
            CouponKind::Fixed { rate } => rate,
            CouponKind::Floating { spread } => forward + spread,
        };
        self.nominal * rate * self.accrual_fraction
    }
}

/// A sequence of coupons ordered by accrual start.
pub type Leg = Vec<Coupon>;

fn leg(schedule: &Schedule, nominal: Real, kind: CouponKind) -> Leg {
    schedule
        .periods()
        .map(|(start, end)| Coupon {
            accrual_start: start,
            accrual_end: end,
            payment_time: end,
            accrual_fraction: end - start,
            nominal,
            kind,
        })
        .collect()
}

/// Builder for a fixed-rate leg.
#[derive(Debug)]
pub struct FixedRateLegBuilder<'a> {
    schedule: &'a Schedule,
    nominal: Real,
    rate: Rate,
}

impl<'a> FixedRateLegBuilder<'a> {
    /// Start a leg on `schedule` with unit nominal and zero rate.
    pub fn new(schedule: &'a Schedule) -> Self {
        Self {
            schedule,
            nominal: 1.0,
            rate: 0.0,
        }
    }

    /// Set the nominal.
    pub fn with_nominal(mut self, nominal: Real) -> Self {
        self.nominal = nominal;
        self
    }

    /// Set the coupon rate.
    pub fn with_coupon_rate(mut self, rate: Rate) -> Self {
        self.rate = rate;
        self
    }

    /// Build the leg.
    pub fn build(self) -> Leg {
        leg(self.schedule, self.nominal, CouponKind::Fixed { rate: self.rate })
    }
}

/// Builder for a floating-rate leg.
#[derive(Debug)]
pub struct FloatingRateLegBuilder<'a> {
    schedule: &'a Schedule,
    nominal: Real,
    spread: Spread,
}

impl<'a> FloatingRateLegBuilder<'a> {
    /// Start a leg on `schedule` with unit nominal and zero spread.
    pub fn new(schedule: &'a Schedule) -> Self {
        Self {
            schedule,
            nominal: 1.0,
            spread: 0.0,
        }
    }

    /// Set the nominal.
    pub fn with_nominal(mut self, nominal: Real) -> Self {
        self.nominal = nominal;
        self
    }

    /// Set the spread over the forward.
    pub fn with_spread(mut self, spread: Spread) -> Self {
        self.spread = spread;
        self
    }

    /// Build the leg.
    pub fn build(self) -> Leg {
        leg(self.schedule, self.nominal, CouponKind::Floating { spread: self.spread })
    }
}
