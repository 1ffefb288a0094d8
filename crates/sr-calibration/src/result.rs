//! Calibration results and their flat key-value record.
//!
//! A record is a `BTreeMap<String, String>` with keys
//!
//! ```text
//! model                      "HullWhite"
//! param.<name>               fitted value
//! iterations, evaluations    optimizer counters
//! objective                  final 0.5·Σ r²
//! end_type                   EndCriteriaType name
//! helper.<i>.<field>         per-instrument diagnostics
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sr_core::{ensure, fail, Error, Real, Result, Time, Volatility};
use sr_math::EndCriteriaType;
use sr_models::{CalibratedModel, ShortRateModel};

/// A fitted parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParameter {
    /// Parameter name.
    pub name: String,
    /// Fitted value.
    pub value: Real,
}

/// How one basket instrument is matched after calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HelperDiagnostics {
    /// Option expiry.
    pub expiry: Time,
    /// Swap length.
    pub tenor: Time,
    /// Quoted volatility.
    pub market_volatility: Volatility,
    /// Black price at the quoted volatility.
    pub market_price: Real,
    /// Model price.
    pub model_price: Real,
    /// Weighted residual.
    pub error: Real,
    /// Black volatility implied by the model price, when there is one.
    pub implied_volatility: Option<Volatility>,
}

/// Optimizer outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationDiagnostics {
    /// Optimizer iterations.
    pub iterations: usize,
    /// Residual-vector evaluations.
    pub evaluations: usize,
    /// Final objective `0.5 Σ r²`.
    pub objective: Real,
    /// Why the optimizer stopped.
    pub end_type: EndCriteriaType,
    /// One entry per basket instrument, in basket order.
    pub helpers: Vec<HelperDiagnostics>,
}

/// Fitted parameters with diagnostics. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Name of the calibrated model.
    pub model: String,
    /// Every model parameter, fixed ones included, in model order.
    pub params: Vec<FittedParameter>,
    /// Optimizer outcome.
    pub diagnostics: CalibrationDiagnostics,
}

const HELPER_FIELDS: [&str; 7] = [
    "expiry",
    "tenor",
    "market_volatility",
    "market_price",
    "model_price",
    "error",
    "implied_volatility",
];

fn parse<T: FromStr>(record: &BTreeMap<String, String>, key: &str) -> Result<T> {
    let Some(raw) = record.get(key) else {
        fail!(InvalidParameter, "calibration record has no '{key}'");
    };
    raw.parse()
        .map_err(|_| Error::InvalidParameter(format!("calibration record: bad {key} = '{raw}'")))
}

impl CalibrationResult {
    /// Value of the parameter called `name`.
    pub fn param(&self, name: &str) -> Option<Real> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value)
    }

    /// Whether the optimizer stopped on a convergence criterion.
    pub fn is_converged(&self) -> bool {
        self.diagnostics.end_type.is_converged()
    }

    /// Largest absolute gap between implied and quoted volatility, over
    /// the helpers that have an implied volatility.
    pub fn max_volatility_error(&self) -> Option<Volatility> {
        self.diagnostics
            .helpers
            .iter()
            .filter_map(|h| h.implied_volatility.map(|v| (v - h.market_volatility).abs()))
            .reduce(Real::max)
    }

    /// Write the fitted parameters into `model`, matching by name.
    pub fn apply_to(&self, model: &mut dyn ShortRateModel) -> Result<()> {
        ensure!(
            self.model == model.name(),
            InvalidParameter,
            "result was calibrated on {}, not {}",
            self.model,
            model.name()
        );
        for p in &self.params {
            model.set_param(&p.name, p.value)?;
        }
        Ok(())
    }

    /// Flatten into a key-value record.
    pub fn to_record(&self) -> BTreeMap<String, String> {
        let mut record = BTreeMap::new();
        record.insert("model".to_string(), self.model.clone());
        for p in &self.params {
            record.insert(format!("param.{}", p.name), p.value.to_string());
        }
        let d = &self.diagnostics;
        record.insert("iterations".to_string(), d.iterations.to_string());
        record.insert("evaluations".to_string(), d.evaluations.to_string());
        record.insert("objective".to_string(), d.objective.to_string());
        record.insert("end_type".to_string(), d.end_type.to_string());
        record.insert("helpers".to_string(), d.helpers.len().to_string());
        for (i, h) in d.helpers.iter().enumerate() {
            let values = [
                Some(h.expiry),
                Some(h.tenor),
                Some(h.market_volatility),
                Some(h.market_price),
                Some(h.model_price),
                Some(h.error),
                h.implied_volatility,
            ];
            for (field, value) in HELPER_FIELDS.iter().zip(values) {
                if let Some(v) = value {
                    record.insert(format!("helper.{i}.{field}"), v.to_string());
                }
            }
        }
        record
    }

    /// Rebuild a result from [`to_record`](Self::to_record) output.
    ///
    /// Parameters come back in key order.
    pub fn from_record(record: &BTreeMap<String, String>) -> Result<Self> {
        let model: String = parse(record, "model")?;
        let params = record
            .iter()
            .filter_map(|(k, _)| k.strip_prefix("param."))
            .map(|name| {
                Ok(FittedParameter {
                    name: name.to_string(),
                    value: parse(record, &format!("param.{name}"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let count: usize = parse(record, "helpers")?;
        let helpers = (0..count)
            .map(|i| {
                let key = |field: &str| format!("helper.{i}.{field}");
                Ok(HelperDiagnostics {
                    expiry: parse(record, &key("expiry"))?,
                    tenor: parse(record, &key("tenor"))?,
                    market_volatility: parse(record, &key("market_volatility"))?,
                    market_price: parse(record, &key("market_price"))?,
                    model_price: parse(record, &key("model_price"))?,
                    error: parse(record, &key("error"))?,
                    implied_volatility: match record.get(&key("implied_volatility")) {
                        Some(_) => Some(parse(record, &key("implied_volatility"))?),
                        None => None,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            model,
            params,
            diagnostics: CalibrationDiagnostics {
                iterations: parse(record, "iterations")?,
                evaluations: parse(record, "evaluations")?,
                objective: parse(record, "objective")?,
                end_type: parse(record, "end_type")?,
                helpers,
            },
        })
    }
}
