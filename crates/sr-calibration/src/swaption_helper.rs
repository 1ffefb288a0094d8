//! Calibration instruments: at-the-money European swaptions quoted by
//! Black volatility.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sr_core::{ensure, OptionType, Real, Result, Time, Volatility};
use sr_instruments::{Frequency, PricingEngine, Swaption, VanillaSwapBuilder};
use sr_models::ShortRateModel;
use sr_pricingengines::{
    black_implied_std_dev, BlackSwaptionEngine, DiscountingSwapEngine, EngineConfig, EnginePolicy,
};
use sr_termstructures::YieldTermStructure;

/// How a helper turns a model price into a residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// `(model − market) / market`.
    #[default]
    RelativePrice,
    /// `model − market`.
    PriceError,
    /// Black volatility implied by the model price minus the market
    /// volatility.
    ImpliedVolError,
}

/// A market quote for one calibration swaption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwaptionQuote {
    /// Option expiry, which is also the swap start.
    pub expiry: Time,
    /// Length of the underlying swap.
    pub tenor: Time,
    /// Black volatility of the forward swap rate.
    pub volatility: Volatility,
}

/// Accuracy of implied volatilities reported for helpers.
pub const IMPLIED_VOL_ACCURACY: Real = 1e-10;
/// Lowest implied volatility searched for.
pub const MIN_IMPLIED_VOL: Volatility = 1e-4;
/// Highest implied volatility searched for.
pub const MAX_IMPLIED_VOL: Volatility = 4.0;

/// An at-the-money co-terminal payer swaption used to calibrate a model.
///
/// The underlying swap starts at `expiry` and runs for `tenor` years with
/// an annual fixed leg and a semiannual floating leg on unit nominal; its
/// fixed rate is the curve's forward swap rate.
#[derive(Debug, Clone)]
pub struct SwaptionHelper {
    curve: Arc<dyn YieldTermStructure>,
    quote: SwaptionQuote,
    weight: Real,
    swaption: Swaption,
    market_price: Real,
    market_vega: Real,
}

impl SwaptionHelper {
    /// Build the helper and its Black market price.
    pub fn new(curve: Arc<dyn YieldTermStructure>, quote: SwaptionQuote) -> Result<Self> {
        ensure!(
            quote.expiry > 0.0 && quote.tenor > 0.0,
            InvalidInstrument,
            "swaption helper needs positive expiry and tenor, got {}x{}",
            quote.expiry,
            quote.tenor
        );
        ensure!(
            quote.volatility > 0.0 && quote.volatility.is_finite(),
            InvalidParameter,
            "swaption helper volatility must be positive, got {}",
            quote.volatility
        );
        let builder = VanillaSwapBuilder::new()
            .with_nominal(1.0)
            .with_start(quote.expiry)
            .with_tenor(quote.tenor)
            .with_fixed_frequency(Frequency::Annual)
            .with_floating_frequency(Frequency::Semiannual);
        let atm_rate = DiscountingSwapEngine::new(Arc::clone(&curve)).fair_rate(&builder.build(0.0)?)?;
        let swaption = Swaption::european_at_start(builder.build(atm_rate)?)?;
        let results =
            BlackSwaptionEngine::new(Arc::clone(&curve), quote.volatility)?.calculate(&swaption)?;
        Ok(Self {
            curve,
            quote,
            weight: 1.0,
            swaption,
            market_price: results.npv,
            market_vega: results.result("vega").unwrap_or(0.0),
        })
    }

    /// The same instrument quoted at another volatility.
    pub fn with_volatility(&self, volatility: Volatility) -> Result<Self> {
        let quote = SwaptionQuote {
            volatility,
            ..self.quote
        };
        Ok(Self::new(Arc::clone(&self.curve), quote)?.with_weight(self.weight))
    }

    /// Set the weight of this helper's squared residual.
    pub fn with_weight(mut self, weight: Real) -> Self {
        self.weight = weight;
        self
    }

    /// The market quote.
    pub fn quote(&self) -> &SwaptionQuote {
        &self.quote
    }

    /// Expiry in years.
    pub fn expiry(&self) -> Time {
        self.quote.expiry
    }

    /// Swap length in years.
    pub fn tenor(&self) -> Time {
        self.quote.tenor
    }

    /// Market volatility.
    pub fn market_volatility(&self) -> Volatility {
        self.quote.volatility
    }

    /// Residual weight.
    pub fn weight(&self) -> Real {
        self.weight
    }

    /// The calibration swaption.
    pub fn swaption(&self) -> &Swaption {
        &self.swaption
    }

    /// Black price at the market volatility.
    pub fn market_price(&self) -> Real {
        self.market_price
    }

    /// Black price at `volatility`.
    pub fn black_price(&self, volatility: Volatility) -> Result<Real> {
        BlackSwaptionEngine::new(Arc::clone(&self.curve), volatility)?.price(&self.swaption)
    }

    /// Price of the swaption under `model`.
    pub fn model_price(
        &self,
        model: &dyn ShortRateModel,
        policy: EnginePolicy,
        config: &EngineConfig,
    ) -> Result<Real> {
        policy.price(model, &self.swaption, config)
    }

    /// Black volatility reproducing `price`.
    ///
    /// Fails with `Numerical` when the price is outside what Black's
    /// formula can produce or the volatility falls outside
    /// `[min_vol, max_vol]`.
    pub fn implied_volatility(
        &self,
        price: Real,
        accuracy: Real,
        min_vol: Volatility,
        max_vol: Volatility,
    ) -> Result<Volatility> {
        let legs = DiscountingSwapEngine::new(Arc::clone(&self.curve))
            .leg_values(self.swaption.swap(), self.expiry());
        let sqrt_t = self.expiry().sqrt();
        let std_dev = black_implied_std_dev(
            OptionType::Call,
            self.swaption.swap().fixed_rate(),
            legs.fair_rate()?,
            price / legs.annuity,
            1.0,
            accuracy * sqrt_t,
        )?;
        let vol = std_dev / sqrt_t;
        ensure!(
            (min_vol..=max_vol).contains(&vol),
            Numerical,
            "implied volatility {vol} outside [{min_vol}, {max_vol}]"
        );
        Ok(vol)
    }

    /// Residual of `model_price` against the market, before weighting.
    pub fn calibration_error(&self, model_price: Real, error_type: ErrorType) -> Result<Real> {
        Ok(match error_type {
            ErrorType::RelativePrice => (model_price - self.market_price) / self.market_price,
            ErrorType::PriceError => model_price - self.market_price,
            ErrorType::ImpliedVolError => {
                match self.implied_volatility(
                    model_price,
                    IMPLIED_VOL_ACCURACY,
                    MIN_IMPLIED_VOL,
                    MAX_IMPLIED_VOL,
                ) {
                    Ok(vol) => vol - self.quote.volatility,
                    // Linearized around the market volatility.
                    Err(_) => {
                        ensure!(
                            self.market_vega > 0.0,
                            Calibration,
                            "no implied volatility and no vega for the {}x{} swaption",
                            self.expiry(),
                            self.tenor()
                        );
                        (model_price - self.market_price) / self.market_vega
                    }
                }
            }
        })
    }
}
