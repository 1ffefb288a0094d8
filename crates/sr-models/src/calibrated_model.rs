//! Calibrated-model infrastructure: `Parameter` and the `CalibratedModel`
//! trait.
//!
//! A model exposes its parameters as an ordered slice. The optimizer works
//! on the flat vector of values; `set_params` validates every value against
//! its constraint before anything is written, so a rejected update leaves
//! the model untouched.

use sr_core::{ensure, fail, Real, Result};
use std::fmt;

/// Smallest value a strictly positive parameter is projected onto during
/// calibration.
pub const POSITIVE_FLOOR: Real = 1e-8;

// ────────────────────────────────────────────────────────────────────────────
// Parameter
// ────────────────────────────────────────────────────────────────────────────

/// The admissible range of a scalar parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterConstraint {
    /// Any finite value.
    Free,
    /// `x >= 0`.
    NonNegative,
    /// `x > 0`.
    Positive,
    /// `lower <= x <= upper`.
    Boundary {
        /// Lower bound (inclusive).
        lower: Real,
        /// Upper bound (inclusive).
        upper: Real,
    },
}

impl ParameterConstraint {
    /// Whether `value` satisfies this constraint.
    pub fn test(&self, value: Real) -> bool {
        value.is_finite()
            && match *self {
                Self::Free => true,
                Self::NonNegative => value >= 0.0,
                Self::Positive => value > 0.0,
                Self::Boundary { lower, upper } => (lower..=upper).contains(&value),
            }
    }

    /// Closed bounds used to project optimizer iterates back into the
    /// admissible range.
    pub fn bounds(&self) -> (Real, Real) {
        match *self {
            Self::Free => (Real::NEG_INFINITY, Real::INFINITY),
            Self::NonNegative => (0.0, Real::INFINITY),
            Self::Positive => (POSITIVE_FLOOR, Real::INFINITY),
            Self::Boundary { lower, upper } => (lower, upper),
        }
    }
}

impl fmt::Display for ParameterConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("finite"),
            Self::NonNegative => f.write_str(">= 0"),
            Self::Positive => f.write_str("> 0"),
            Self::Boundary { lower, upper } => write!(f, "in [{lower}, {upper}]"),
        }
    }
}

/// A named model parameter that can be calibrated or held fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: &'static str,
    value: Real,
    constraint: ParameterConstraint,
    fixed: bool,
}

impl Parameter {
    /// Create a parameter, checking the initial value.
    pub fn new(name: &'static str, value: Real, constraint: ParameterConstraint) -> Result<Self> {
        let p = Self {
            name,
            value,
            constraint,
            fixed: false,
        };
        p.check(value)?;
        Ok(p)
    }

    /// Parameter name, e.g. `"sigma"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current value.
    pub fn value(&self) -> Real {
        self.value
    }

    /// The constraint on this parameter.
    pub fn constraint(&self) -> ParameterConstraint {
        self.constraint
    }

    /// Whether calibration leaves this parameter alone.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Check a candidate value against the constraint.
    pub fn check(&self, value: Real) -> Result<()> {
        ensure!(
            self.constraint.test(value),
            InvalidParameter,
            "{} = {value} violates constraint {}",
            self.name,
            self.constraint
        );
        Ok(())
    }

    pub(crate) fn set_unchecked(&mut self, value: Real) {
        self.value = value;
    }

    pub(crate) fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CalibratedModel trait
// ────────────────────────────────────────────────────────────────────────────

/// A model whose parameters can be fitted to market data.
pub trait CalibratedModel: fmt::Debug + Send + Sync {
    /// Short model name used in records and logs.
    fn name(&self) -> &'static str;

    /// The model's parameters, in a fixed order.
    fn params(&self) -> &[Parameter];

    /// Mutable access for the provided methods below.
    fn params_mut(&mut self) -> &mut [Parameter];

    /// Current parameter values, in `params()` order.
    fn param_values(&self) -> Vec<Real> {
        self.params().iter().map(Parameter::value).collect()
    }

    /// Replace all parameter values.
    ///
    /// Fails with `InvalidParameter` on a length mismatch or if any value
    /// violates its constraint; nothing is written in that case.
    fn set_params(&mut self, values: &[Real]) -> Result<()> {
        let params = self.params();
        ensure!(
            values.len() == params.len(),
            InvalidParameter,
            "{} takes {} parameters, got {}",
            self.name(),
            params.len(),
            values.len()
        );
        for (p, &v) in params.iter().zip(values) {
            p.check(v)?;
        }
        for (p, &v) in self.params_mut().iter_mut().zip(values) {
            p.set_unchecked(v);
        }
        Ok(())
    }

    /// Set one parameter by name.
    fn set_param(&mut self, name: &str, value: Real) -> Result<()> {
        let Some(p) = self.params_mut().iter_mut().find(|p| p.name() == name) else {
            fail!(InvalidParameter, "unknown parameter '{name}'");
        };
        p.check(value)?;
        p.set_unchecked(value);
        Ok(())
    }

    /// Exclude a parameter from calibration.
    fn fix_parameter(&mut self, name: &str) -> Result<()> {
        let model = self.name();
        let Some(p) = self.params_mut().iter_mut().find(|p| p.name() == name) else {
            fail!(InvalidParameter, "{model} has no parameter '{name}'");
        };
        p.set_fixed(true);
        Ok(())
    }

    /// Make every parameter calibratable again.
    fn free_all_parameters(&mut self) {
        for p in self.params_mut() {
            p.set_fixed(false);
        }
    }

    /// Re-check every parameter against its constraint.
    fn check(&self) -> Result<()> {
        self.params().iter().try_for_each(|p| p.check(p.value()))
    }
}
