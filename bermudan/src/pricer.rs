//! One-call pricing of the standard Bermudan payer swaption.
//!
//! The deal is a 5y payer swap starting in one year on a flat
//! continuously-compounded curve (nominal 1000, annual fixed leg,
//! semiannual floating leg), struck at a multiple of its fair rate and
//! exercisable on every fixed accrual start.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sr_core::{ensure, Rate, Real, Result};
use sr_instruments::{Swaption, VanillaSwapBuilder};
use sr_methods::{LatticeKind, DEFAULT_TREE_STEPS};
use sr_models::ModelKind;
use sr_pricingengines::{price_on_lattice, DiscountingSwapEngine, EngineConfig};
use sr_termstructures::{FlatForward, YieldTermStructure};
use tracing::{debug, warn};

/// Inputs of [`price_bermudan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRequest {
    /// Flat continuously-compounded zero rate, e.g. `0.035`.
    pub flat_rate: Rate,
    /// `"g2"`, `"hw"` or `"bk"`.
    pub model: String,
    /// `"tree"` or `"fdm"`.
    pub engine: String,
    /// Strike over the fair swap rate: 1 is at the money, 1.2 out of the
    /// money, 0.8 in the money.
    pub strike_multiplier: Real,
}

impl PriceRequest {
    /// Price the request.
    pub fn price(&self) -> Result<Real> {
        price_bermudan(self.flat_rate, &self.model, &self.engine, self.strike_multiplier)
    }
}

/// The Bermudan swaption on the standard swap struck at
/// `strike_multiplier` times the fair rate on `curve`.
pub fn standard_swaption(
    curve: &Arc<dyn YieldTermStructure>,
    strike_multiplier: Real,
) -> Result<Swaption> {
    ensure!(
        strike_multiplier > 0.0 && strike_multiplier.is_finite(),
        InvalidParameter,
        "strike multiplier must be positive, got {strike_multiplier}"
    );
    let builder = VanillaSwapBuilder::new();
    let atm = DiscountingSwapEngine::new(Arc::clone(curve)).fair_rate(&builder.build(0.0)?)?;
    Swaption::bermudan_on_fixed_resets(builder.build(atm * strike_multiplier)?)
}

/// Engine settings for `engine` under `model`.
///
/// Finite differences are used for Hull–White and G2; any other model
/// requested on `fdm` is priced on a 50-step tree instead.
pub fn engine_config(model: ModelKind, engine: LatticeKind) -> EngineConfig {
    match (engine, model) {
        (LatticeKind::FiniteDifferences { .. }, ModelKind::Hw | ModelKind::G2) => {
            EngineConfig::default().with_kind(engine)
        }
        (LatticeKind::FiniteDifferences { .. }, _) => {
            warn!(%model, "no finite-difference engine for this model, using a tree");
            EngineConfig::tree(DEFAULT_TREE_STEPS)
        }
        (LatticeKind::Tree { .. }, _) => EngineConfig::default().with_kind(engine),
    }
}

/// Price the standard Bermudan payer swaption.
///
/// `model` is one of `g2`, `hw`, `bk` with default parameters; `engine` is
/// `tree` (50 steps) or `fdm` (100 × 100 mesh).
pub fn price_bermudan(
    flat_rate: Rate,
    model: &str,
    engine: &str,
    strike_multiplier: Real,
) -> Result<Real> {
    ensure!(
        flat_rate.is_finite(),
        InvalidParameter,
        "flat rate must be finite, got {flat_rate}"
    );
    let kind: ModelKind = model.parse()?;
    let lattice: LatticeKind = engine.parse()?;
    let curve: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::continuous(flat_rate));
    let swaption = standard_swaption(&curve, strike_multiplier)?;
    let model = kind.build(curve)?;
    let config = engine_config(kind, lattice);
    let npv = price_on_lattice(model.as_ref(), &config, &swaption)?.npv;
    debug!(%kind, ?lattice, strike_multiplier, npv, "bermudan swaption priced");
    Ok(npv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_core::Error;

    #[test]
    fn standard_deal() {
        let curve: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::continuous(0.035));
        let swaption = standard_swaption(&curve, 1.0).unwrap();
        assert_eq!(swaption.exercise().times(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(swaption.swap().nominal(), 1000.0);
        let npv = DiscountingSwapEngine::new(curve).npv(swaption.swap());
        assert!(npv.abs() < 1e-9);
    }

    #[test]
    fn engine_mapping() {
        let fdm: LatticeKind = "fdm".parse().unwrap();
        assert_eq!(engine_config(ModelKind::Hw, fdm).lattice.kind, fdm);
        assert_eq!(engine_config(ModelKind::G2, fdm).lattice.kind, fdm);
        assert_eq!(
            engine_config(ModelKind::Bk, fdm).lattice.kind,
            LatticeKind::tree(DEFAULT_TREE_STEPS)
        );
        let tree: LatticeKind = "tree".parse().unwrap();
        assert_eq!(engine_config(ModelKind::G2, tree).lattice.kind, tree);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            price_bermudan(0.035, "cir", "tree", 1.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            price_bermudan(0.035, "hw", "mc", 1.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            price_bermudan(0.035, "hw", "tree", 0.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            price_bermudan(f64::NAN, "hw", "tree", 1.0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn bk_on_fdm_matches_the_tree() {
        let fdm = price_bermudan(0.035, "bk", "fdm", 1.0).unwrap();
        let tree = price_bermudan(0.035, "bk", "tree", 1.0).unwrap();
        assert_eq!(fdm, tree);
        assert!(tree > 0.0);
    }

    #[test]
    fn request_round_trip() {
        let request = PriceRequest {
            flat_rate: 0.035,
            model: "hw".into(),
            engine: "tree".into(),
            strike_multiplier: 1.2,
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: PriceRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.price().unwrap(), price_bermudan(0.035, "hw", "tree", 1.2).unwrap());
    }
}
