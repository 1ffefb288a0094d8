//! Lattice configuration and construction.
//!
//! [`LatticeBuilder`] turns a [`LatticeConfig`] and a model into a fitted
//! [`Lattice`], dispatching on the lattice kind and the model's number of
//! factors.

use serde::{Deserialize, Serialize};
use sr_core::{fail, Error, Real, Result, Time};
use sr_models::ShortRateModel;
use std::str::FromStr;
use tracing::debug;

use crate::finite_differences::{FdScheme, FdShortRateMesh1d, FdShortRateMesh2d};
use crate::lattice::{Lattice, OneFactorTreeLattice, TimeGrid, TwoFactorTreeLattice};

/// Default half-width of finite-difference meshes, in standard deviations.
pub const DEFAULT_STD_DEVS: Real = 4.0;

/// Default number of tree steps.
pub const DEFAULT_TREE_STEPS: usize = 50;

/// Default finite-difference resolution `(time steps, space steps)`.
pub const DEFAULT_FD_STEPS: (usize, usize) = (100, 100);

/// Discretization used to value claims on a short-rate model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeKind {
    /// Recombining trinomial tree, nine-branch tree for two factors.
    Tree {
        /// Approximate number of time steps.
        steps: usize,
    },
    /// Finite-difference mesh.
    FiniteDifferences {
        /// Approximate number of time steps.
        time_steps: usize,
        /// Space steps per factor.
        space_steps: usize,
        /// Time-stepping scheme.
        #[serde(default)]
        scheme: FdScheme,
    },
}

impl Default for LatticeKind {
    fn default() -> Self {
        LatticeKind::Tree {
            steps: DEFAULT_TREE_STEPS,
        }
    }
}

impl LatticeKind {
    /// A tree with `steps` time steps.
    pub fn tree(steps: usize) -> Self {
        LatticeKind::Tree { steps }
    }

    /// A mesh with the default scheme.
    pub fn finite_differences(time_steps: usize, space_steps: usize) -> Self {
        LatticeKind::FiniteDifferences {
            time_steps,
            space_steps,
            scheme: FdScheme::default(),
        }
    }

    /// Approximate number of time steps.
    pub fn time_steps(&self) -> usize {
        match *self {
            LatticeKind::Tree { steps } => steps,
            LatticeKind::FiniteDifferences { time_steps, .. } => time_steps,
        }
    }

    /// Whether this is a finite-difference mesh.
    pub fn is_finite_differences(&self) -> bool {
        matches!(self, LatticeKind::FiniteDifferences { .. })
    }
}

/// Parses the engine names `"tree"` and `"fdm"` into the default
/// resolution of each kind.
impl FromStr for LatticeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree" => Ok(LatticeKind::tree(DEFAULT_TREE_STEPS)),
            "fdm" | "fd" => Ok(LatticeKind::finite_differences(
                DEFAULT_FD_STEPS.0,
                DEFAULT_FD_STEPS.1,
            )),
            other => Err(Error::InvalidParameter(format!(
                "unknown lattice engine '{other}', expected 'tree' or 'fdm'"
            ))),
        }
    }
}

/// Configuration of a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Discretization kind and resolution.
    pub kind: LatticeKind,
    /// Half-width of finite-difference meshes in standard deviations of
    /// each factor at the grid end. Unused by trees.
    pub std_devs: Real,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            kind: LatticeKind::default(),
            std_devs: DEFAULT_STD_DEVS,
        }
    }
}

impl LatticeConfig {
    /// A tree configuration.
    pub fn tree(steps: usize) -> Self {
        Self::default().with_kind(LatticeKind::tree(steps))
    }

    /// A finite-difference configuration with the default scheme.
    pub fn finite_differences(time_steps: usize, space_steps: usize) -> Self {
        Self::default().with_kind(LatticeKind::finite_differences(time_steps, space_steps))
    }

    /// Replace the lattice kind.
    pub fn with_kind(mut self, kind: LatticeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the finite-difference scheme; no effect on trees.
    pub fn with_scheme(mut self, new_scheme: FdScheme) -> Self {
        if let LatticeKind::FiniteDifferences { scheme, .. } = &mut self.kind {
            *scheme = new_scheme;
        }
        self
    }

    /// Set the mesh half-width in standard deviations.
    pub fn with_std_devs(mut self, std_devs: Real) -> Self {
        self.std_devs = std_devs;
        self
    }
}

/// Builds fitted lattices for short-rate models.
#[derive(Debug, Clone, Default)]
pub struct LatticeBuilder {
    config: LatticeConfig,
}

impl LatticeBuilder {
    /// Create a builder.
    pub fn new(config: LatticeConfig) -> Self {
        Self { config }
    }

    /// The builder's configuration.
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    /// Build a lattice of `model` whose time grid contains every time in
    /// `mandatory_times` (and 0).
    pub fn build(
        &self,
        model: &dyn ShortRateModel,
        mandatory_times: &[Time],
    ) -> Result<Box<dyn Lattice>> {
        let grid = TimeGrid::new(mandatory_times, self.config.kind.time_steps())?;
        let dimension = model.dimension();
        let lattice: Box<dyn Lattice> = match (self.config.kind, dimension) {
            (LatticeKind::Tree { .. }, 1) => Box::new(OneFactorTreeLattice::new(model, &grid)?),
            (LatticeKind::Tree { .. }, 2) => Box::new(TwoFactorTreeLattice::new(model, &grid)?),
            (
                LatticeKind::FiniteDifferences {
                    space_steps,
                    scheme,
                    ..
                },
                1,
            ) => Box::new(FdShortRateMesh1d::new(
                model,
                &grid,
                space_steps,
                self.config.std_devs,
                scheme,
            )?),
            (
                LatticeKind::FiniteDifferences {
                    space_steps,
                    scheme,
                    ..
                },
                2,
            ) => Box::new(FdShortRateMesh2d::new(
                model,
                &grid,
                space_steps,
                self.config.std_devs,
                scheme,
            )?),
            (_, d) => fail!(
                InvalidParameter,
                "no lattice for {} with {d} factors",
                model.name()
            ),
        };
        debug!(
            model = model.name(),
            kind = ?self.config.kind,
            slices = grid.size(),
            root_nodes = lattice.size(0),
            final_nodes = lattice.size(grid.steps()),
            "lattice built"
        );
        Ok(lattice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sr_models::{BlackKarasinski, HullWhite, G2};
    use sr_termstructures::{FlatForward, YieldTermStructure};
    use std::sync::Arc;

    fn curve() -> Arc<dyn YieldTermStructure> {
        Arc::new(FlatForward::continuous(0.035))
    }

    #[test]
    fn builds_every_kind() {
        let hw = HullWhite::new(curve(), 0.1, 0.01).unwrap();
        let bk = BlackKarasinski::new(curve(), 0.1, 0.1).unwrap();
        let g2 = G2::new(curve(), 0.1, 0.01, 0.1, 0.01, -0.75).unwrap();
        let models: [&dyn ShortRateModel; 3] = [&hw, &bk, &g2];
        let configs = [LatticeConfig::tree(30), LatticeConfig::finite_differences(30, 30)];
        for model in models {
            for config in configs {
                let lattice = LatticeBuilder::new(config).build(model, &[1.0, 3.0]).unwrap();
                let grid = lattice.time_grid();
                let i = grid.index(3.0).unwrap();
                let tolerance = if model.dimension() == 2 && config.kind.is_finite_differences() {
                    1e-4
                } else {
                    1e-9
                };
                assert_abs_diff_eq!(
                    lattice.discount_bond(i).unwrap(),
                    curve().discount(3.0),
                    epsilon = tolerance
                );
            }
        }
    }

    #[test]
    fn zero_time_steps_are_rejected() {
        let g2 = G2::new(curve(), 0.1, 0.01, 0.1, 0.01, -0.75).unwrap();
        let r = LatticeBuilder::new(LatticeConfig::finite_differences(0, 10)).build(&g2, &[1.0]);
        assert!(matches!(r, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn engine_names_parse() {
        assert_eq!("tree".parse::<LatticeKind>().unwrap(), LatticeKind::tree(50));
        assert!("FDM".parse::<LatticeKind>().unwrap().is_finite_differences());
        assert!("mc".parse::<LatticeKind>().is_err());
    }

    #[test]
    fn config_serde_round_trip() {
        let config = LatticeConfig::finite_differences(80, 60)
            .with_scheme(FdScheme::CrankNicolson { damping_steps: 3 })
            .with_std_devs(5.0);
        let json = serde_json::to_string(&config).unwrap();
        let back: LatticeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        let partial: LatticeConfig = serde_json::from_str(r#"{"kind":{"tree":{"steps":20}}}"#).unwrap();
        assert_eq!(partial, LatticeConfig::tree(20));
        assert_eq!(LatticeConfig::tree(20).with_scheme(FdScheme::Implicit), LatticeConfig::tree(20));
    }
}
