//! Black swaption engine.
//!
//! Prices European swaptions with a lognormal volatility on the forward
//! swap rate. This is the market convention that quotes the calibration
//! basket.

use std::sync::Arc;

use sr_core::{ensure, OptionType, Real, Result, Time, Volatility};
use sr_instruments::{PricingEngine, PricingResults, SwapType, Swaption};
use sr_termstructures::YieldTermStructure;

use crate::black_formula::{black_formula, black_formula_std_dev_derivative};
use crate::discounting_swap_engine::DiscountingSwapEngine;

/// European swaption engine using Black's formula.
///
/// $$V = A(0)\,\text{Black}(\omega, K, S(0), \sigma\sqrt{T}, 1)$$
///
/// where $A$ is the annuity of the fixed coupons entered at expiry $T$,
/// $S$ the forward swap rate over those coupons, and $\omega$ is a call on
/// the rate for a payer swaption.
#[derive(Debug, Clone)]
pub struct BlackSwaptionEngine {
    swap_engine: DiscountingSwapEngine,
    volatility: Volatility,
}

impl BlackSwaptionEngine {
    /// Create an engine with a flat lognormal volatility.
    pub fn new(discount_curve: Arc<dyn YieldTermStructure>, volatility: Volatility) -> Result<Self> {
        ensure!(
            volatility.is_finite() && volatility >= 0.0,
            InvalidParameter,
            "Black volatility must be finite and non-negative, got {volatility}"
        );
        Ok(Self {
            swap_engine: DiscountingSwapEngine::new(discount_curve),
            volatility,
        })
    }

    /// The volatility.
    pub fn volatility(&self) -> Volatility {
        self.volatility
    }

    /// Price of `swaption`.
    pub fn price(&self, swaption: &Swaption) -> Result<Real> {
        Ok(self.calculate(swaption)?.npv)
    }
}

/// The exercise time of a European swaption.
pub(crate) fn single_expiry(swaption: &Swaption) -> Result<Time> {
    let times = swaption.exercise().times();
    ensure!(
        times.len() == 1,
        InvalidInstrument,
        "closed-form swaption engines need a single exercise date, got {}",
        times.len()
    );
    Ok(times[0])
}

/// Option type on the swap rate for the holder of the swaption.
fn rate_option(swap_type: SwapType) -> OptionType {
    match swap_type {
        SwapType::Payer => OptionType::Call,
        SwapType::Receiver => OptionType::Put,
    }
}

impl PricingEngine<Swaption> for BlackSwaptionEngine {
    fn calculate(&self, swaption: &Swaption) -> Result<PricingResults> {
        let expiry = single_expiry(swaption)?;
        let swap = swaption.swap();
        let legs = self.swap_engine.leg_values(swap, expiry);
        let forward = legs.fair_rate()?;
        let std_dev = self.volatility * expiry.sqrt();
        let option = rate_option(swap.swap_type());
        let npv = legs.annuity * black_formula(option, swap.fixed_rate(), forward, std_dev, 1.0)?;
        let vega = legs.annuity
            * expiry.sqrt()
            * black_formula_std_dev_derivative(swap.fixed_rate(), forward, std_dev, 1.0)?;
        Ok(PricingResults::from_npv(npv)
            .with_result("annuity", legs.annuity)
            .with_result("forward_rate", forward)
            .with_result("std_dev", std_dev)
            .with_result("vega", vega))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sr_core::Error;
    use sr_instruments::{Exercise, VanillaSwapBuilder};
    use sr_termstructures::FlatForward;

    fn curve() -> Arc<dyn YieldTermStructure> {
        Arc::new(FlatForward::continuous(0.035))
    }

    #[test]
    fn atm_payer_equals_atm_receiver() {
        let swap_engine = DiscountingSwapEngine::new(curve());
        let builder = VanillaSwapBuilder::new().with_start(2.0).with_tenor(4.0);
        let atm = swap_engine.fair_rate(&builder.build(0.03).unwrap()).unwrap();
        let engine = BlackSwaptionEngine::new(curve(), 0.158).unwrap();
        let payer = Swaption::european_at_start(builder.build(atm).unwrap()).unwrap();
        let receiver = Swaption::european_at_start(
            builder
                .with_swap_type(SwapType::Receiver)
                .build(atm)
                .unwrap(),
        )
        .unwrap();
        let (p, r) = (engine.price(&payer).unwrap(), engine.price(&receiver).unwrap());
        assert!(p > 0.0);
        assert_abs_diff_eq!(p, r, epsilon = 1e-10);
    }

    #[test]
    fn zero_volatility_gives_discounted_intrinsic() {
        let swap = VanillaSwapBuilder::new().build(0.02).unwrap();
        let swap_npv = DiscountingSwapEngine::new(curve()).npv(&swap);
        let swaption = Swaption::european_at_start(swap).unwrap();
        let engine = BlackSwaptionEngine::new(curve(), 0.0).unwrap();
        assert_abs_diff_eq!(engine.price(&swaption).unwrap(), swap_npv, epsilon = 1e-10);
    }

    #[test]
    fn reports_vega() {
        let swap = VanillaSwapBuilder::new().build(0.0356).unwrap();
        let swaption = Swaption::european_at_start(swap).unwrap();
        let h = 1e-6;
        let up = BlackSwaptionEngine::new(curve(), 0.16 + h).unwrap();
        let down = BlackSwaptionEngine::new(curve(), 0.16 - h).unwrap();
        let results = BlackSwaptionEngine::new(curve(), 0.16)
            .unwrap()
            .calculate(&swaption)
            .unwrap();
        let fd = (up.price(&swaption).unwrap() - down.price(&swaption).unwrap()) / (2.0 * h);
        assert_abs_diff_eq!(results.result("vega").unwrap(), fd, epsilon = 1e-6);
    }

    #[test]
    fn bermudan_exercise_is_rejected() {
        let swap = VanillaSwapBuilder::new().build(0.03).unwrap();
        let swaption = Swaption::new(swap, Exercise::bermudan(vec![1.0, 2.0]).unwrap()).unwrap();
        let engine = BlackSwaptionEngine::new(curve(), 0.16).unwrap();
        assert!(matches!(
            engine.price(&swaption),
            Err(Error::InvalidInstrument(_))
        ));
        assert!(BlackSwaptionEngine::new(curve(), -0.1).is_err());
    }
}
