//! Model selection by name.

use crate::{BlackKarasinski, HullWhite, ShortRateModel, G2};
use serde::{Deserialize, Serialize};
use sr_core::{Error, Result};
use sr_termstructures::YieldTermStructure;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The supported short-rate models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// One-factor Gaussian.
    #[serde(alias = "hullwhite")]
    Hw,
    /// One-factor log-normal.
    #[serde(alias = "blackkarasinski")]
    Bk,
    /// Two-factor Gaussian.
    G2,
}

impl ModelKind {
    /// Build the model with its default parameters on `curve`.
    pub fn build(self, curve: Arc<dyn YieldTermStructure>) -> Result<Box<dyn ShortRateModel>> {
        Ok(match self {
            Self::Hw => Box::new(HullWhite::new(curve, HullWhite::DEFAULT_A, HullWhite::DEFAULT_SIGMA)?),
            Self::Bk => Box::new(BlackKarasinski::new(
                curve,
                BlackKarasinski::DEFAULT_A,
                BlackKarasinski::DEFAULT_SIGMA,
            )?),
            Self::G2 => Box::new(G2::new(
                curve,
                G2::DEFAULT_A,
                G2::DEFAULT_SIGMA,
                G2::DEFAULT_B,
                G2::DEFAULT_ETA,
                G2::DEFAULT_RHO,
            )?),
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hw => "hw",
            Self::Bk => "bk",
            Self::G2 => "g2",
        })
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hw" | "hullwhite" => Ok(Self::Hw),
            "bk" | "blackkarasinski" => Ok(Self::Bk),
            "g2" | "g2++" => Ok(Self::G2),
            other => Err(Error::InvalidParameter(format!(
                "unknown model '{other}', expected hw, bk or g2"
            ))),
        }
    }
}
