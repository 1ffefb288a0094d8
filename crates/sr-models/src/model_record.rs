//! Flat key-value snapshot of a model's parameters.
//!
//! ```text
//! model           "HullWhite" | "BlackKarasinski" | "G2"
//! param.<name>    value
//! fixed           comma-separated names of fixed parameters
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sr_core::{fail, Error, Real, Result};
use sr_termstructures::YieldTermStructure;

use crate::{CalibratedModel, ModelKind, ShortRateModel};

/// Parameter snapshot of a short-rate model, without its curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Which model the parameters belong to.
    pub kind: ModelKind,
    /// Parameter values by name.
    pub params: BTreeMap<String, Real>,
    /// Names of parameters excluded from calibration.
    pub fixed: Vec<String>,
}

impl ModelRecord {
    /// Snapshot `model`.
    pub fn capture(model: &dyn ShortRateModel) -> Result<Self> {
        Ok(Self {
            kind: model.name().parse()?,
            params: model
                .params()
                .iter()
                .map(|p| (p.name().to_string(), p.value()))
                .collect(),
            fixed: model
                .params()
                .iter()
                .filter(|p| p.is_fixed())
                .map(|p| p.name().to_string())
                .collect(),
        })
    }

    /// Build the model on `curve` with the recorded parameters.
    ///
    /// Parameters the record does not name keep their defaults.
    pub fn restore(&self, curve: Arc<dyn YieldTermStructure>) -> Result<Box<dyn ShortRateModel>> {
        let mut model = self.kind.build(curve)?;
        self.apply_to(model.as_mut())?;
        Ok(model)
    }

    /// Write the recorded parameters and fixings into `model`.
    pub fn apply_to(&self, model: &mut dyn ShortRateModel) -> Result<()> {
        let kind: ModelKind = model.name().parse()?;
        if kind != self.kind {
            fail!(InvalidParameter, "record is for {}, model is {}", self.kind, kind);
        }
        let mut values = model.param_values();
        for (name, &value) in &self.params {
            let Some(i) = model.params().iter().position(|p| p.name() == name) else {
                fail!(InvalidParameter, "{} has no parameter '{name}'", model.name());
            };
            values[i] = value;
        }
        // All at once, so that nothing is written if one value is invalid.
        model.set_params(&values)?;
        model.free_all_parameters();
        for name in &self.fixed {
            model.fix_parameter(name)?;
        }
        Ok(())
    }

    /// Flatten into a key-value record.
    pub fn to_record(&self) -> BTreeMap<String, String> {
        let mut record = BTreeMap::new();
        record.insert("model".to_string(), self.kind.to_string());
        for (name, value) in &self.params {
            record.insert(format!("param.{name}"), value.to_string());
        }
        record.insert("fixed".to_string(), self.fixed.join(","));
        record
    }

    /// Parse [`to_record`](Self::to_record) output.
    pub fn from_record(record: &BTreeMap<String, String>) -> Result<Self> {
        let Some(kind) = record.get("model") else {
            fail!(InvalidParameter, "model record has no 'model'");
        };
        let params = record
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("param.").map(|name| (name, v)))
            .map(|(name, raw)| {
                let value = raw.parse::<Real>().map_err(|_| {
                    Error::InvalidParameter(format!("model record: bad {name} = '{raw}'"))
                })?;
                Ok((name.to_string(), value))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        let fixed = record
            .get("fixed")
            .map(|s| {
                s.split(',')
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            kind: kind.parse()?,
            params,
            fixed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HullWhite, G2};
    use sr_termstructures::FlatForward;

    fn curve() -> Arc<dyn YieldTermStructure> {
        Arc::new(FlatForward::continuous(0.035))
    }

    #[test]
    fn capture_and_restore() {
        let mut g2 = G2::new(curve(), 0.07, 0.012, 0.5, 0.009, -0.6).unwrap();
        g2.fix_parameter("rho").unwrap();
        let record = ModelRecord::capture(&g2).unwrap();
        assert_eq!(record.kind, ModelKind::G2);
        assert_eq!(record.fixed, vec!["rho".to_string()]);

        let flat = record.to_record();
        assert_eq!(flat["model"], "g2");
        assert_eq!(flat["param.eta"], "0.009");
        let parsed = ModelRecord::from_record(&flat).unwrap();
        assert_eq!(parsed, record);

        let restored = parsed.restore(curve()).unwrap();
        assert_eq!(restored.param_values(), g2.param_values());
        assert!(restored.params()[4].is_fixed());
        assert!(!restored.params()[0].is_fixed());
    }

    #[test]
    fn rejects_mismatches() {
        let hw = HullWhite::new(curve(), 0.05, 0.008).unwrap();
        let record = ModelRecord::capture(&hw).unwrap();
        let mut g2 = G2::new(curve(), 0.1, 0.01, 0.1, 0.01, -0.75).unwrap();
        assert!(record.apply_to(&mut g2).is_err());

        let mut flat = record.to_record();
        flat.insert("param.sigma".into(), "-1".into());
        let bad = ModelRecord::from_record(&flat).unwrap();
        let mut target = HullWhite::new(curve(), 0.1, 0.01).unwrap();
        assert!(bad.apply_to(&mut target).is_err());
        // Nothing was written.
        assert_eq!(target.param_values(), vec![0.1, 0.01]);

        flat.insert("param.sigma".into(), "abc".into());
        assert!(ModelRecord::from_record(&flat).is_err());
        flat.remove("model");
        assert!(ModelRecord::from_record(&flat).is_err());
    }

    #[test]
    fn serde_round_trip() {
        let hw = HullWhite::new(curve(), 0.05, 0.008).unwrap();
        let record = ModelRecord::capture(&hw).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"hw\""));
        let back: ModelRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
