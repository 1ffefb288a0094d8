//! Options to enter a vanilla swap.

use crate::exercise::Exercise;
use crate::instrument::Instrument;
use crate::swap::VanillaSwap;
use sr_core::{ensure, Result, Time};

/// An option to enter `swap` at one of the exercise times.
///
/// Exercising at `t` enters the coupons whose accrual starts at or after
/// `t`. Settlement is physical.
#[derive(Debug, Clone, PartialEq)]
pub struct Swaption {
    swap: VanillaSwap,
    exercise: Exercise,
}

impl Swaption {
    /// Create a swaption; every exercise time must lie in
    /// `[0, last payment]` of the swap.
    pub fn new(swap: VanillaSwap, exercise: Exercise) -> Result<Self> {
        let swaption = Self { swap, exercise };
        swaption.validate()?;
        Ok(swaption)
    }

    /// A Bermudan swaption exercisable on every fixed-coupon accrual start.
    pub fn bermudan_on_fixed_resets(swap: VanillaSwap) -> Result<Self> {
        let exercise = Exercise::bermudan(swap.fixed_reset_times())?;
        Self::new(swap, exercise)
    }

    /// A European swaption exercisable at the swap start.
    pub fn european_at_start(swap: VanillaSwap) -> Result<Self> {
        let exercise = Exercise::european(swap.start())?;
        Self::new(swap, exercise)
    }

    /// Checks the exercise times against the swap's payments.
    pub fn validate(&self) -> Result<()> {
        let last_payment = self.swap.maturity();
        for &t in self.exercise.times() {
            ensure!(
                (0.0..=last_payment).contains(&t),
                InvalidInstrument,
                "exercise time {t} outside [0, {last_payment}]"
            );
        }
        Ok(())
    }

    /// The underlying swap.
    pub fn swap(&self) -> &VanillaSwap {
        &self.swap
    }

    /// The exercise schedule.
    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }
}

impl Instrument for Swaption {
    fn maturity(&self) -> Time {
        self.swap.maturity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap::VanillaSwapBuilder;
    use sr_core::Error;

    #[test]
    fn bermudan_on_fixed_resets() {
        let swap = VanillaSwapBuilder::new().build(0.035).unwrap();
        let swaption = Swaption::bermudan_on_fixed_resets(swap).unwrap();
        assert_eq!(swaption.exercise().times(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(swaption.maturity(), 6.0);
    }

    #[test]
    fn exercise_after_last_payment_is_rejected() {
        let swap = VanillaSwapBuilder::new().build(0.035).unwrap();
        let exercise = Exercise::bermudan(vec![1.0, 7.0]).unwrap();
        assert!(matches!(Swaption::new(swap, exercise), Err(Error::InvalidInstrument(_))));
    }

    #[test]
    fn european_at_start() {
        let swap = VanillaSwapBuilder::new().with_start(2.0).build(0.035).unwrap();
        let swaption = Swaption::european_at_start(swap).unwrap();
        assert_eq!(swaption.exercise().times(), &[2.0]);
    }
}
