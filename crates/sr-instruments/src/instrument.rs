//! `Instrument` and `PricingEngine` traits.
//!
//! Instruments are plain data. Engines hold the model and numerical
//! settings and compute [`PricingResults`] for one instrument type.

use sr_core::{Real, Result, Time};
use std::collections::BTreeMap;
use std::fmt;

/// Results of pricing an instrument.
///
/// Contains the NPV and additional named results (e.g. the underlying
/// swap's value on the lattice).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingResults {
    /// Net present value.
    pub npv: Real,
    /// Additional named results.
    pub additional_results: BTreeMap<String, Real>,
}

impl PricingResults {
    /// Create pricing results with just an NPV.
    pub fn from_npv(npv: Real) -> Self {
        Self {
            npv,
            additional_results: BTreeMap::new(),
        }
    }

    /// Add a named result.
    pub fn with_result(mut self, key: impl Into<String>, value: Real) -> Self {
        self.additional_results.insert(key.into(), value);
        self
    }

    /// A named result, if present.
    pub fn result(&self, key: &str) -> Option<Real> {
        self.additional_results.get(key).copied()
    }
}

/// A pricing engine for instruments of type `I`.
pub trait PricingEngine<I>: fmt::Debug + Send + Sync {
    /// Price `instrument`.
    fn calculate(&self, instrument: &I) -> Result<PricingResults>;
}

/// A priceable instrument.
pub trait Instrument: fmt::Debug + Send + Sync {
    /// The last time at which the instrument pays.
    fn maturity(&self) -> Time;

    /// NPV under `engine`.
    fn npv(&self, engine: &dyn PricingEngine<Self>) -> Result<Real>
    where
        Self: Sized,
    {
        Ok(engine.calculate(self)?.npv)
    }
}
