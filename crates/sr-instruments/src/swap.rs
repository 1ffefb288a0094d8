//! Fixed-for-floating interest-rate swaps.

use crate::coupon::{Coupon, CouponKind, FixedRateLegBuilder, FloatingRateLegBuilder, Leg};
use crate::instrument::Instrument;
use crate::schedule::{Frequency, Schedule};
use serde::{Deserialize, Serialize};
use sr_core::{ensure, Rate, Real, Result, Spread, Time};
use std::fmt;

/// Swap type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapType {
    /// Pay fixed, receive floating.
    Payer,
    /// Receive fixed, pay floating.
    Receiver,
}

impl SwapType {
    /// +1 for Payer, −1 for Receiver.
    pub fn sign(self) -> Real {
        match self {
            SwapType::Payer => 1.0,
            SwapType::Receiver => -1.0,
        }
    }
}

impl fmt::Display for SwapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapType::Payer => write!(f, "Payer"),
            SwapType::Receiver => write!(f, "Receiver"),
        }
    }
}

/// A fixed-for-floating swap with constant nominal.
#[derive(Debug, Clone, PartialEq)]
pub struct VanillaSwap {
    swap_type: SwapType,
    nominal: Real,
    fixed_rate: Rate,
    spread: Spread,
    fixed_leg: Leg,
    floating_leg: Leg,
}

impl VanillaSwap {
    /// Create a swap from its two schedules.
    pub fn new(
        swap_type: SwapType,
        nominal: Real,
        fixed_schedule: &Schedule,
        fixed_rate: Rate,
        floating_schedule: &Schedule,
        spread: Spread,
    ) -> Result<Self> {
        ensure!(
            nominal.is_finite() && nominal > 0.0,
            InvalidInstrument,
            "swap nominal must be positive, got {nominal}"
        );
        ensure!(
            fixed_rate.is_finite() && spread.is_finite(),
            InvalidInstrument,
            "swap rate and spread must be finite"
        );
        Ok(Self {
            swap_type,
            nominal,
            fixed_rate,
            spread,
            fixed_leg: FixedRateLegBuilder::new(fixed_schedule)
                .with_nominal(nominal)
                .with_coupon_rate(fixed_rate)
                .build(),
            floating_leg: FloatingRateLegBuilder::new(floating_schedule)
                .with_nominal(nominal)
                .with_spread(spread)
                .build(),
        })
    }

    /// Payer or receiver.
    pub fn swap_type(&self) -> SwapType {
        self.swap_type
    }

    /// Nominal.
    pub fn nominal(&self) -> Real {
        self.nominal
    }

    /// Fixed rate.
    pub fn fixed_rate(&self) -> Rate {
        self.fixed_rate
    }

    /// Spread on the floating leg.
    pub fn spread(&self) -> Spread {
        self.spread
    }

    /// The fixed coupons.
    pub fn fixed_leg(&self) -> &Leg {
        &self.fixed_leg
    }

    /// The floating coupons.
    pub fn floating_leg(&self) -> &Leg {
        &self.floating_leg
    }

    /// All coupons of both legs ordered by accrual start.
    pub fn coupons(&self) -> Vec<Coupon> {
        let mut all: Vec<Coupon> = self
            .fixed_leg
            .iter()
            .chain(&self.floating_leg)
            .copied()
            .collect();
        all.sort_by(|a, b| a.accrual_start.total_cmp(&b.accrual_start));
        all
    }

    /// Earliest accrual start.
    pub fn start(&self) -> Time {
        self.fixed_leg
            .iter()
            .chain(&self.floating_leg)
            .map(|c| c.accrual_start)
            .fold(Time::INFINITY, Time::min)
    }

    /// Accrual starts of the fixed coupons.
    pub fn fixed_reset_times(&self) -> Vec<Time> {
        self.fixed_leg.iter().map(|c| c.accrual_start).collect()
    }

    /// Payment times and amounts of the fixed leg.
    pub fn fixed_cash_flows(&self) -> (Vec<Time>, Vec<Real>) {
        self.fixed_leg
            .iter()
            .map(|c| (c.payment_time, c.amount(0.0)))
            .unzip()
    }

    /// The same swap with another fixed rate.
    pub fn with_fixed_rate(&self, rate: Rate) -> Self {
        let mut swap = self.clone();
        swap.fixed_rate = rate;
        for coupon in &mut swap.fixed_leg {
            coupon.kind = CouponKind::Fixed { rate };
        }
        swap
    }
}

impl Instrument for VanillaSwap {
    fn maturity(&self) -> Time {
        self.fixed_leg
            .iter()
            .chain(&self.floating_leg)
            .map(|c| c.payment_time)
            .fold(0.0, Time::max)
    }
}

/// Default nominal of built swaps.
pub const DEFAULT_NOMINAL: Real = 1000.0;
/// Default forward start in years.
pub const DEFAULT_FORWARD_START: Time = 1.0;
/// Default tenor in years.
pub const DEFAULT_TENOR: Time = 5.0;

/// Builder for forward-starting vanilla swaps.
///
/// Defaults: payer, nominal 1000, starting in 1 year, 5-year tenor, annual
/// fixed leg, semiannual floating leg, no spread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VanillaSwapBuilder {
    swap_type: SwapType,
    nominal: Real,
    start: Time,
    tenor: Time,
    fixed_frequency: Frequency,
    floating_frequency: Frequency,
    spread: Spread,
}

impl Default for VanillaSwapBuilder {
    fn default() -> Self {
        Self {
            swap_type: SwapType::Payer,
            nominal: DEFAULT_NOMINAL,
            start: DEFAULT_FORWARD_START,
            tenor: DEFAULT_TENOR,
            fixed_frequency: Frequency::Annual,
            floating_frequency: Frequency::Semiannual,
            spread: 0.0,
        }
    }
}

impl VanillaSwapBuilder {
    /// A builder with the default conventions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set payer or receiver.
    pub fn with_swap_type(mut self, swap_type: SwapType) -> Self {
        self.swap_type = swap_type;
        self
    }

    /// Set the nominal.
    pub fn with_nominal(mut self, nominal: Real) -> Self {
        self.nominal = nominal;
        self
    }

    /// Set the start time.
    pub fn with_start(mut self, start: Time) -> Self {
        self.start = start;
        self
    }

    /// Set the tenor.
    pub fn with_tenor(mut self, tenor: Time) -> Self {
        self.tenor = tenor;
        self
    }

    /// Set the fixed-leg frequency.
    pub fn with_fixed_frequency(mut self, frequency: Frequency) -> Self {
        self.fixed_frequency = frequency;
        self
    }

    /// Set the floating-leg frequency.
    pub fn with_floating_frequency(mut self, frequency: Frequency) -> Self {
        self.floating_frequency = frequency;
        self
    }

    /// Set the floating spread.
    pub fn with_spread(mut self, spread: Spread) -> Self {
        self.spread = spread;
        self
    }

    /// Fixed-leg schedule.
    pub fn fixed_schedule(&self) -> Result<Schedule> {
        Schedule::new(self.start, self.start + self.tenor, self.fixed_frequency)
    }

    /// Floating-leg schedule.
    pub fn floating_schedule(&self) -> Result<Schedule> {
        Schedule::new(self.start, self.start + self.tenor, self.floating_frequency)
    }

    /// Build the swap paying `fixed_rate`.
    pub fn build(&self, fixed_rate: Rate) -> Result<VanillaSwap> {
        VanillaSwap::new(
            self.swap_type,
            self.nominal,
            &self.fixed_schedule()?,
            fixed_rate,
            &self.floating_schedule()?,
            self.spread,
        )
    }
}
