//! Closed-form European swaption engine for short-rate models.
//!
//! At a reset date $T_0$ a payer swap with unit nominal and no spread is
//! worth $1 - B(T_0)$, where $B$ is the bond paying the fixed coupons
//! $K\tau_i$ and the nominal at maturity. The payer swaption is therefore a
//! put on $B$ struck at 1, and the receiver swaption a call, which
//! Hull–White (Jamshidian) and G2 (integral formula) price exactly.

use std::sync::Arc;

use sr_core::{fail, OptionType, Real, Result, Time};
use sr_instruments::{Coupon, PricingEngine, PricingResults, SwapType, Swaption};
use sr_models::ShortRateModel;

use crate::black_swaption_engine::single_expiry;

/// Times may differ from the exercise time by this much and still count
/// as the same date.
const DATE_TOLERANCE: Time = 1e-10;

/// European swaption engine using the model's coupon-bond option formula.
#[derive(Debug, Clone)]
pub struct AnalyticSwaptionEngine {
    model: Arc<dyn ShortRateModel>,
}

/// Coupon bond equivalent to the swap entered at exercise.
struct UnderlyingBond {
    expiry: Time,
    times: Vec<Time>,
    amounts: Vec<Real>,
    option: OptionType,
}

fn remaining(leg: &[Coupon], expiry: Time) -> Vec<&Coupon> {
    leg.iter()
        .filter(|c| c.accrual_start >= expiry - DATE_TOLERANCE)
        .collect()
}

/// The bond and option type, or `None` when the swaption does not reduce
/// to a single coupon-bond option.
fn underlying_bond(swaption: &Swaption) -> Option<UnderlyingBond> {
    let expiry = single_expiry(swaption).ok()?;
    let swap = swaption.swap();
    if swap.spread() != 0.0 {
        return None;
    }
    let fixed = remaining(swap.fixed_leg(), expiry);
    let floating = remaining(swap.floating_leg(), expiry);
    let (first_fixed, last_fixed) = (fixed.first()?, fixed.last()?);
    let (first_float, last_float) = (floating.first()?, floating.last()?);
    let starts_at_expiry = (first_fixed.accrual_start - expiry).abs() <= DATE_TOLERANCE
        && (first_float.accrual_start - expiry).abs() <= DATE_TOLERANCE;
    let same_end = (last_fixed.payment_time - last_float.accrual_end).abs() <= DATE_TOLERANCE
        && floating
            .iter()
            .all(|c| (c.payment_time - c.accrual_end).abs() <= DATE_TOLERANCE);
    if !(starts_at_expiry && same_end) {
        return None;
    }

    let nominal = swap.nominal();
    let times: Vec<Time> = fixed.iter().map(|c| c.payment_time).collect();
    let mut amounts: Vec<Real> = fixed.iter().map(|c| c.amount(0.0) / nominal).collect();
    if let Some(last) = amounts.last_mut() {
        *last += 1.0;
    }
    let option = match swap.swap_type() {
        SwapType::Payer => OptionType::Put,
        SwapType::Receiver => OptionType::Call,
    };
    Some(UnderlyingBond {
        expiry,
        times,
        amounts,
        option,
    })
}

impl AnalyticSwaptionEngine {
    /// Create an engine on `model`.
    pub fn new(model: Arc<dyn ShortRateModel>) -> Self {
        Self { model }
    }

    /// The model.
    pub fn model(&self) -> &Arc<dyn ShortRateModel> {
        &self.model
    }

    /// Price of `swaption`, or `None` if either the model has no closed
    /// form or the swaption is not a European option on a spot-starting
    /// swap without spread.
    pub fn try_price(&self, swaption: &Swaption) -> Option<Result<Real>> {
        closed_form_price(self.model.as_ref(), swaption)
    }
}

/// Closed-form price of `swaption` under a borrowed model, as
/// [`AnalyticSwaptionEngine::try_price`].
pub fn closed_form_price(model: &dyn ShortRateModel, swaption: &Swaption) -> Option<Result<Real>> {
    let bond = underlying_bond(swaption)?;
    let price = model.coupon_bond_option(
        bond.option,
        1.0,
        bond.expiry,
        &bond.times,
        &bond.amounts,
    )?;
    Some(price.map(|p| swaption.swap().nominal() * p))
}

impl PricingEngine<Swaption> for AnalyticSwaptionEngine {
    fn calculate(&self, swaption: &Swaption) -> Result<PricingResults> {
        match self.try_price(swaption) {
            Some(price) => Ok(PricingResults::from_npv(price?)),
            None => fail!(
                InvalidInstrument,
                "{} has no closed-form price for this swaption",
                self.model.name()
            ),
        }
    }
}
