//! Least-squares optimization framework.
//!
//! Provides the cost-function and constraint seams, end criteria, and the
//! Levenberg–Marquardt optimizer used by model calibration.

mod levenberg_marquardt;

pub use levenberg_marquardt::LevenbergMarquardt;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use sr_core::{ensure, Error, Real, Result};
use std::fmt;
use std::str::FromStr;

// ── Cost function trait ───────────────────────────────────────────────────────

/// A vector of residuals to be driven towards zero in the least-squares
/// sense.
///
/// `values` takes `&mut self` because evaluating a calibration objective
/// means pushing the trial parameters into a model before repricing.
pub trait CostFunction {
    /// Residuals at `x`.
    fn values(&mut self, x: &DVector<Real>) -> Result<DVector<Real>>;

    /// The scalar objective `0.5 * Σ r²(x)`.
    fn value(&mut self, x: &DVector<Real>) -> Result<Real> {
        Ok(0.5 * self.values(x)?.norm_squared())
    }
}

// ── Constraints ───────────────────────────────────────────────────────────────

/// A constraint on the parameter space.
pub trait Constraint {
    /// Return `true` if `x` satisfies the constraint.
    fn test(&self, x: &DVector<Real>) -> bool;

    /// The feasible point closest to `x`.
    fn project(&self, x: &DVector<Real>) -> DVector<Real> {
        x.clone()
    }
}

/// No constraint: every parameter vector is feasible.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConstraint;

impl Constraint for NoConstraint {
    fn test(&self, _x: &DVector<Real>) -> bool {
        true
    }
}

/// Independent closed bounds `lower[i] <= x[i] <= upper[i]`; infinite
/// bounds are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxConstraint {
    lower: DVector<Real>,
    upper: DVector<Real>,
}

impl BoxConstraint {
    /// Create a box constraint from per-component bounds.
    pub fn new(lower: Vec<Real>, upper: Vec<Real>) -> Result<Self> {
        ensure!(
            lower.len() == upper.len(),
            InvalidParameter,
            "box constraint: {} lower bounds but {} upper bounds",
            lower.len(),
            upper.len()
        );
        for (i, (lo, hi)) in lower.iter().zip(&upper).enumerate() {
            ensure!(
                lo <= hi,
                InvalidParameter,
                "box constraint: component {i} has empty range [{lo}, {hi}]"
            );
        }
        Ok(Self {
            lower: DVector::from_vec(lower),
            upper: DVector::from_vec(upper),
        })
    }

    /// Number of constrained components.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Return `true` if the box has no components.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }
}

impl Constraint for BoxConstraint {
    fn test(&self, x: &DVector<Real>) -> bool {
        x.len() == self.lower.len()
            && x
                .iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }

    fn project(&self, x: &DVector<Real>) -> DVector<Real> {
        DVector::from_iterator(
            x.len(),
            x.iter().enumerate().map(|(i, &v)| match (self.lower.get(i), self.upper.get(i)) {
                (Some(&lo), Some(&hi)) => v.clamp(lo, hi),
                _ => v,
            }),
        )
    }
}

// ── End criteria ──────────────────────────────────────────────────────────────

/// Criteria to stop an optimization.
///
/// The default is `(400, 100, 1e-8, 1e-8, 1e-8)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Maximum number of consecutive rejected trial steps within one
    /// iteration before the current point is declared stationary.
    pub max_stationary_state_iterations: usize,
    /// Step-size tolerance, relative to the parameter norm.
    pub root_epsilon: Real,
    /// Relative objective reduction below which an accepted step counts as
    /// stationary.
    pub function_epsilon: Real,
    /// Gradient (max-norm) tolerance.
    pub gradient_norm_epsilon: Real,
    /// Optional cap on residual-vector evaluations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_evaluations: Option<usize>,
}

impl EndCriteria {
    /// Create new end criteria.
    pub fn new(
        max_iterations: usize,
        max_stationary_state_iterations: usize,
        root_epsilon: Real,
        function_epsilon: Real,
        gradient_norm_epsilon: Real,
    ) -> Self {
        Self {
            max_iterations,
            max_stationary_state_iterations,
            root_epsilon,
            function_epsilon,
            gradient_norm_epsilon,
            max_evaluations: None,
        }
    }

    /// Cap the number of residual evaluations.
    pub fn with_max_evaluations(mut self, n: usize) -> Self {
        self.max_evaluations = Some(n);
        self
    }
}

impl Default for EndCriteria {
    fn default() -> Self {
        Self::new(400, 100, 1e-8, 1e-8, 1e-8)
    }
}

/// The reason an optimization terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndCriteriaType {
    /// Maximum iterations reached.
    MaxIterations,
    /// Residual evaluation budget exhausted.
    MaxEvaluations,
    /// No admissible step moves the parameters any more.
    StationaryPoint,
    /// The objective stopped decreasing (or reached zero).
    StationaryFunctionValue,
    /// The gradient vanished.
    StationaryGradient,
    /// The step could not be computed.
    Unknown,
}

impl EndCriteriaType {
    /// Name used in flat key-value records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxIterations => "MaxIterations",
            Self::MaxEvaluations => "MaxEvaluations",
            Self::StationaryPoint => "StationaryPoint",
            Self::StationaryFunctionValue => "StationaryFunctionValue",
            Self::StationaryGradient => "StationaryGradient",
            Self::Unknown => "Unknown",
        }
    }

    /// Return `true` for the terminations that indicate convergence rather
    /// than an exhausted budget.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            Self::StationaryPoint | Self::StationaryFunctionValue | Self::StationaryGradient
        )
    }
}

impl fmt::Display for EndCriteriaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndCriteriaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "MaxIterations" => Self::MaxIterations,
            "MaxEvaluations" => Self::MaxEvaluations,
            "StationaryPoint" => Self::StationaryPoint,
            "StationaryFunctionValue" => Self::StationaryFunctionValue,
            "StationaryGradient" => Self::StationaryGradient,
            "Unknown" => Self::Unknown,
            other => {
                return Err(Error::InvalidParameter(format!(
                    "unknown end criteria type '{other}'"
                )))
            }
        })
    }
}

/// Result of an optimization.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Final parameter values.
    pub x: DVector<Real>,
    /// Final objective `0.5 * Σ r²`.
    pub value: Real,
    /// Final residuals.
    pub residuals: DVector<Real>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of residual-vector evaluations, Jacobian columns included.
    pub evaluations: usize,
    /// Max-norm of the last computed gradient.
    pub gradient_norm: Real,
    /// Reason for termination.
    pub end_type: EndCriteriaType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_constraint_projects_and_tests() {
        let c = BoxConstraint::new(vec![0.0, -1.0], vec![Real::INFINITY, 1.0]).unwrap();
        let x = DVector::from_vec(vec![-0.5, 1.7]);
        assert!(!c.test(&x));
        let p = c.project(&x);
        assert_eq!(p.as_slice(), &[0.0, 1.0]);
        assert!(c.test(&p));
    }

    #[test]
    fn box_constraint_rejects_empty_range() {
        assert!(BoxConstraint::new(vec![1.0], vec![0.0]).is_err());
        assert!(BoxConstraint::new(vec![1.0], vec![]).is_err());
    }

    #[test]
    fn default_end_criteria() {
        let ec = EndCriteria::default();
        assert_eq!(ec.max_iterations, 400);
        assert_eq!(ec.max_stationary_state_iterations, 100);
        assert_eq!(ec.function_epsilon, 1e-8);
        assert_eq!(ec.max_evaluations, None);
    }

    #[test]
    fn end_criteria_from_json_without_budget() {
        let ec: EndCriteria = serde_json::from_str(
            r#"{"max_iterations":50,"max_stationary_state_iterations":10,
                "root_epsilon":1e-6,"function_epsilon":1e-6,"gradient_norm_epsilon":1e-6}"#,
        )
        .unwrap();
        assert_eq!(ec.max_iterations, 50);
        assert_eq!(ec.max_evaluations, None);
    }

    #[test]
    fn end_type_names_parse_back() {
        for t in [
            EndCriteriaType::MaxIterations,
            EndCriteriaType::StationaryGradient,
            EndCriteriaType::Unknown,
        ] {
            assert_eq!(t.to_string().parse::<EndCriteriaType>().unwrap(), t);
        }
        assert!("Converged".parse::<EndCriteriaType>().is_err());
    }
}
