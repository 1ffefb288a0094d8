//! Least-squares calibration of short-rate models to swaption baskets.
//!
//! [`Calibrator::calibrate`] wraps the model and basket in a
//! [`CalibrationRun`], which is the cost function handed to
//! Levenberg–Marquardt: each evaluation writes the trial parameters into
//! the model, reprices every helper and returns the weighted residuals.
//! Fixed parameters are left out of the optimization vector and the free
//! ones are boxed by their constraints.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use sr_core::{ensure, Error, Real, Result};
use sr_math::{BoxConstraint, CostFunction, EndCriteria, LevenbergMarquardt};
use sr_models::{CalibratedModel, ShortRateModel};
use sr_pricingengines::{EngineConfig, EnginePolicy};
use tracing::{debug, info, warn};

use crate::result::{CalibrationDiagnostics, CalibrationResult, FittedParameter, HelperDiagnostics};
use crate::swaption_helper::{
    ErrorType, SwaptionHelper, IMPLIED_VOL_ACCURACY, MAX_IMPLIED_VOL, MIN_IMPLIED_VOL,
};

/// Optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Levenberg–Marquardt settings.
    pub method: LevenbergMarquardt,
    /// Stopping rules; `(400, 100, 1e-8, 1e-8, 1e-8)` by default.
    pub end_criteria: EndCriteria,
}

impl OptimizerConfig {
    /// Replace the stopping rules.
    pub fn with_end_criteria(mut self, end_criteria: EndCriteria) -> Self {
        self.end_criteria = end_criteria;
        self
    }

    /// Replace the optimizer settings.
    pub fn with_method(mut self, method: LevenbergMarquardt) -> Self {
        self.method = method;
        self
    }
}

/// Everything that decides how a basket is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Residual definition.
    pub error_type: ErrorType,
    /// Closed form or lattice for the helpers.
    pub policy: EnginePolicy,
    /// Lattice used when the policy or the model requires one.
    pub engine: EngineConfig,
    /// Optimizer settings.
    pub optimizer: OptimizerConfig,
}

impl CalibrationConfig {
    /// Set the residual definition.
    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    /// Set the engine policy.
    pub fn with_policy(mut self, policy: EnginePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the lattice configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set the optimizer settings.
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }
}

/// State of one calibration: the model being fitted, the basket, and the
/// positions of the free parameters.
pub struct CalibrationRun<'a> {
    model: &'a mut dyn ShortRateModel,
    basket: &'a [SwaptionHelper],
    config: &'a CalibrationConfig,
    values: Vec<Real>,
    free: Vec<usize>,
}

impl<'a> CalibrationRun<'a> {
    /// Start a run on `model`.
    pub fn new(
        model: &'a mut dyn ShortRateModel,
        basket: &'a [SwaptionHelper],
        config: &'a CalibrationConfig,
    ) -> Result<Self> {
        ensure!(!basket.is_empty(), Calibration, "calibration basket is empty");
        model.check()?;
        let values = model.param_values();
        let free = model
            .params()
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_fixed())
            .map(|(i, _)| i)
            .collect();
        Ok(Self {
            model,
            basket,
            config,
            values,
            free,
        })
    }

    /// The free parameters' current values.
    pub fn initial(&self) -> DVector<Real> {
        DVector::from_iterator(self.free.len(), self.free.iter().map(|&i| self.values[i]))
    }

    /// Bounds of the free parameters.
    pub fn constraint(&self) -> Result<BoxConstraint> {
        let (lower, upper) = self
            .free
            .iter()
            .map(|&i| self.model.params()[i].constraint().bounds())
            .unzip();
        BoxConstraint::new(lower, upper)
    }

    fn set_free(&mut self, x: &DVector<Real>) -> Result<()> {
        for (&i, &v) in self.free.iter().zip(x.iter()) {
            self.values[i] = v;
        }
        self.model.set_params(&self.values).map_err(Error::into_calibration)
    }

    /// Put the model back at `values`, a full parameter vector.
    fn restore(&mut self, values: Vec<Real>) -> Result<()> {
        self.values = values;
        self.model.set_params(&self.values).map_err(Error::into_calibration)
    }

    fn model_prices(&self) -> Result<Vec<Real>> {
        self.basket
            .iter()
            .map(|h| {
                h.model_price(&*self.model, self.config.policy, &self.config.engine)
                    .map_err(Error::into_calibration)
            })
            .collect()
    }

    fn residual(&self, helper: &SwaptionHelper, model_price: Real) -> Result<Real> {
        let error = helper
            .calibration_error(model_price, self.config.error_type)
            .map_err(Error::into_calibration)?;
        let r = error * helper.weight().sqrt();
        ensure!(
            r.is_finite(),
            Calibration,
            "non-finite residual for the {}x{} swaption at {:?}",
            helper.expiry(),
            helper.tenor(),
            self.values
        );
        Ok(r)
    }

    /// Per-helper diagnostics at the model's current parameters.
    pub fn helper_diagnostics(&self) -> Result<Vec<HelperDiagnostics>> {
        let prices = self.model_prices()?;
        self.basket
            .iter()
            .zip(prices)
            .map(|(h, model_price)| {
                Ok(HelperDiagnostics {
                    expiry: h.expiry(),
                    tenor: h.tenor(),
                    market_volatility: h.market_volatility(),
                    market_price: h.market_price(),
                    model_price,
                    error: self.residual(h, model_price)?,
                    implied_volatility: h
                        .implied_volatility(
                            model_price,
                            IMPLIED_VOL_ACCURACY,
                            MIN_IMPLIED_VOL,
                            MAX_IMPLIED_VOL,
                        )
                        .ok(),
                })
            })
            .collect()
    }
}

impl CostFunction for CalibrationRun<'_> {
    fn values(&mut self, x: &DVector<Real>) -> Result<DVector<Real>> {
        self.set_free(x)?;
        let prices = self.model_prices()?;
        let residuals = self
            .basket
            .iter()
            .zip(prices)
            .map(|(h, p)| self.residual(h, p))
            .collect::<Result<Vec<_>>>()?;
        Ok(DVector::from_vec(residuals))
    }
}

/// Fits short-rate models to swaption baskets.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    config: CalibrationConfig,
}

impl Calibrator {
    /// Create a calibrator.
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Fit the free parameters of `model` to `basket`.
    ///
    /// On success the model holds the fitted parameters. Fails with
    /// `Calibration` for an empty basket, a model with every parameter
    /// fixed, or a residual that cannot be computed; on failure the model
    /// keeps the parameters it came in with.
    pub fn calibrate(
        &self,
        model: &mut dyn ShortRateModel,
        basket: &[SwaptionHelper],
    ) -> Result<CalibrationResult> {
        let name = model.name();
        let mut run = CalibrationRun::new(model, basket, &self.config)?;
        let start = run.values.clone();
        debug!(
            model = name,
            instruments = basket.len(),
            free_parameters = run.free.len(),
            error_type = ?self.config.error_type,
            policy = ?self.config.policy,
            "calibration started"
        );

        let fitted = self.fit(&mut run, name);
        if let Err(e) = &fitted {
            warn!(model = name, error = %e, "calibration failed, parameters restored");
            run.restore(start)?;
        }
        fitted
    }

    fn fit(&self, run: &mut CalibrationRun<'_>, name: &str) -> Result<CalibrationResult> {
        let initial = run.initial();
        let constraint = run.constraint()?;
        let optimizer = &self.config.optimizer;
        let outcome = optimizer
            .method
            .minimize(run, &constraint, &initial, &optimizer.end_criteria)
            .map_err(Error::into_calibration)?;
        // Leave the model at the optimum, not at the last trial point.
        run.set_free(&outcome.x)?;
        let helpers = run.helper_diagnostics()?;

        let params = run
            .model
            .params()
            .iter()
            .map(|p| FittedParameter {
                name: p.name().to_string(),
                value: p.value(),
            })
            .collect::<Vec<_>>();
        info!(
            model = name,
            end_type = %outcome.end_type,
            iterations = outcome.iterations,
            evaluations = outcome.evaluations,
            objective = outcome.value,
            params = ?params.iter().map(|p| (p.name.as_str(), p.value)).collect::<Vec<_>>(),
            "calibration finished"
        );
        Ok(CalibrationResult {
            model: name.to_string(),
            params,
            diagnostics: CalibrationDiagnostics {
                iterations: outcome.iterations,
                evaluations: outcome.evaluations,
                objective: outcome.value,
                end_type: outcome.end_type,
                helpers,
            },
        })
    }
}
