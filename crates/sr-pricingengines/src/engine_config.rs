//! Engine configuration and selection.

use serde::{Deserialize, Serialize};
use sr_core::{Real, Result};
use sr_instruments::Swaption;
use sr_methods::{FdScheme, LatticeConfig, LatticeKind};
use sr_models::ShortRateModel;

use crate::analytic_swaption_engine::closed_form_price;
use crate::lattice_swaption_engine::price_on_lattice;

/// How exercise diagnostics count nodes where exercising and continuing
/// are worth the same. The option value is `max(continuation, exercise)`
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseTieBreak {
    /// Count ties as exercised.
    #[default]
    Exercise,
    /// Count ties as continued.
    Continue,
}

/// Configuration of the lattice swaption engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lattice kind and resolution.
    pub lattice: LatticeConfig,
    /// Tie-break for exercise diagnostics.
    pub tie_break: ExerciseTieBreak,
}

impl EngineConfig {
    /// Trinomial tree with `steps` time steps.
    pub fn tree(steps: usize) -> Self {
        Self::default().with_lattice(LatticeConfig::tree(steps))
    }

    /// Finite-difference mesh with the default scheme.
    pub fn finite_differences(time_steps: usize, space_steps: usize) -> Self {
        Self::default().with_lattice(LatticeConfig::finite_differences(time_steps, space_steps))
    }

    /// Replace the lattice configuration.
    pub fn with_lattice(mut self, lattice: LatticeConfig) -> Self {
        self.lattice = lattice;
        self
    }

    /// Replace the lattice kind, keeping the other lattice settings.
    pub fn with_kind(mut self, kind: LatticeKind) -> Self {
        self.lattice = self.lattice.with_kind(kind);
        self
    }

    /// Set the finite-difference scheme.
    pub fn with_scheme(mut self, scheme: FdScheme) -> Self {
        self.lattice = self.lattice.with_scheme(scheme);
        self
    }

    /// Set the mesh half-width in standard deviations.
    pub fn with_std_devs(mut self, std_devs: Real) -> Self {
        self.lattice = self.lattice.with_std_devs(std_devs);
        self
    }

    /// Set the exercise tie-break.
    pub fn with_tie_break(mut self, tie_break: ExerciseTieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}

/// Which engine prices a swaption when more than one could.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePolicy {
    /// The model's closed form where it has one, the lattice otherwise.
    #[default]
    PreferAnalytic,
    /// Always the lattice.
    LatticeOnly,
}

impl EnginePolicy {
    /// Price `swaption` on `model` under this policy.
    pub fn price(
        self,
        model: &dyn ShortRateModel,
        swaption: &Swaption,
        config: &EngineConfig,
    ) -> Result<Real> {
        if self == EnginePolicy::PreferAnalytic {
            if let Some(price) = closed_form_price(model, swaption) {
                return price;
            }
        }
        Ok(price_on_lattice(model, config, swaption)?.npv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use sr_instruments::VanillaSwapBuilder;
    use sr_models::{BlackKarasinski, HullWhite};
    use sr_termstructures::{FlatForward, YieldTermStructure};

    fn curve() -> Arc<dyn YieldTermStructure> {
        Arc::new(FlatForward::continuous(0.035))
    }

    #[test]
    fn config_serde_round_trip() {
        let config = EngineConfig::finite_differences(80, 60)
            .with_scheme(FdScheme::CrankNicolson { damping_steps: 2 })
            .with_tie_break(ExerciseTieBreak::Continue);
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let defaults: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, EngineConfig::default());
        assert_eq!(defaults.lattice.kind, LatticeKind::tree(50));
        assert_eq!(defaults.tie_break, ExerciseTieBreak::Exercise);
    }

    #[test]
    fn policy_names() {
        assert_eq!(
            serde_json::to_string(&EnginePolicy::LatticeOnly).unwrap(),
            "\"lattice_only\""
        );
        assert_eq!(EnginePolicy::default(), EnginePolicy::PreferAnalytic);
    }

    #[test]
    fn policies_agree_on_hull_white() {
        let model = HullWhite::new(curve(), 0.1, 0.01).unwrap();
        let swap = VanillaSwapBuilder::new().build(0.0356).unwrap();
        let swaption = Swaption::european_at_start(swap).unwrap();
        let config = EngineConfig::tree(200);
        let analytic = EnginePolicy::PreferAnalytic
            .price(&model, &swaption, &config)
            .unwrap();
        let lattice = EnginePolicy::LatticeOnly
            .price(&model, &swaption, &config)
            .unwrap();
        assert_relative_eq!(analytic, lattice, max_relative = 5e-3);
    }

    #[test]
    fn analytic_preference_falls_back_to_the_lattice() {
        let model = BlackKarasinski::new(curve(), 0.1, 0.1).unwrap();
        let swap = VanillaSwapBuilder::new().build(0.0356).unwrap();
        let swaption = Swaption::european_at_start(swap).unwrap();
        let config = EngineConfig::tree(40);
        let preferred = EnginePolicy::PreferAnalytic
            .price(&model, &swaption, &config)
            .unwrap();
        let lattice = EnginePolicy::LatticeOnly
            .price(&model, &swaption, &config)
            .unwrap();
        assert_eq!(preferred, lattice);
    }
}
