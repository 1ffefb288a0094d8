//! Calibration of the short-rate models to the co-terminal diagonal of the
//! swaption volatility grid, and round trips through synthetic quotes.
//!
//! Set `RUST_LOG=debug` to follow the optimizer.

use std::sync::Arc;

use bermudan::calibration::{
    diagonal_basket, CalibrationConfig, CalibrationResult, Calibrator, ErrorType, SwaptionHelper,
    MAX_IMPLIED_VOL, MIN_IMPLIED_VOL,
};
use bermudan::models::{BlackKarasinski, CalibratedModel, HullWhite, ModelRecord, ShortRateModel, G2};
use bermudan::pricingengines::{EngineConfig, EnginePolicy};
use bermudan::termstructures::{FlatForward, YieldTermStructure};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn curve() -> Arc<dyn YieldTermStructure> {
    Arc::new(FlatForward::continuous(0.035))
}

/// Largest and mean absolute gap between implied and quoted volatilities.
fn volatility_errors(result: &CalibrationResult) -> (f64, f64) {
    let gaps: Vec<f64> = result
        .diagnostics
        .helpers
        .iter()
        .map(|h| {
            let implied = h
                .implied_volatility
                .unwrap_or_else(|| panic!("no implied vol for {}x{}", h.expiry, h.tenor));
            (implied - h.market_volatility).abs()
        })
        .collect();
    let max = gaps.iter().copied().fold(0.0, f64::max);
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    (max, mean)
}

fn calibrate(
    model: &mut dyn ShortRateModel,
    config: CalibrationConfig,
    max_error: f64,
    mean_error: f64,
) -> CalibrationResult {
    init_tracing();
    let basket = diagonal_basket(&curve()).unwrap();
    let result = Calibrator::new(config).calibrate(model, &basket).unwrap();
    model.check().unwrap();
    let (max, mean) = volatility_errors(&result);
    assert!(
        max <= max_error && mean <= mean_error,
        "{}: max {max}, mean {mean}, params {:?}",
        result.model,
        result.params
    );
    result
}

/// Re-quote `basket` at the volatilities `model` implies.
fn synthetic(
    basket: &[SwaptionHelper],
    model: &dyn ShortRateModel,
    policy: EnginePolicy,
    engine: &EngineConfig,
) -> Vec<SwaptionHelper> {
    basket
        .iter()
        .map(|h| {
            let price = h.model_price(model, policy, engine).unwrap();
            let vol = h
                .implied_volatility(price, 1e-12, MIN_IMPLIED_VOL, MAX_IMPLIED_VOL)
                .unwrap();
            h.with_volatility(vol).unwrap()
        })
        .collect()
}

// ─── Market diagonal ─────────────────────────────────────────────────────────

#[test]
fn test_g2_analytic_calibration() {
    let mut model = G2::new(curve(), 0.1, 0.01, 0.1, 0.01, -0.75).unwrap();
    let result = calibrate(&mut model, CalibrationConfig::default(), 0.015, 0.010);
    assert_eq!(result.params.len(), 5);
    assert!(model.rho().abs() <= 1.0);
}

#[test]
fn test_hull_white_analytic_calibration() {
    let mut model = HullWhite::new(curve(), 0.1, 0.01).unwrap();
    let result = calibrate(&mut model, CalibrationConfig::default(), 0.010, 0.006);
    assert!(result.diagnostics.iterations > 0);
    assert_eq!(result.param("a"), Some(model.a()));
}

#[test]
fn test_hull_white_tree_calibration() {
    let mut model = HullWhite::new(curve(), 0.1, 0.01).unwrap();
    let config = CalibrationConfig::default()
        .with_policy(EnginePolicy::LatticeOnly)
        .with_engine(EngineConfig::tree(30));
    calibrate(&mut model, config, 0.015, 0.010);
}

#[test]
fn test_black_karasinski_tree_calibration() {
    let mut model = BlackKarasinski::new(curve(), 0.1, 0.1).unwrap();
    let config = CalibrationConfig::default().with_engine(EngineConfig::tree(30));
    calibrate(&mut model, config, 0.015, 0.010);
}

// ─── Round trips ─────────────────────────────────────────────────────────────

#[test]
fn test_recovers_hull_white_parameters_on_a_tree() {
    init_tracing();
    let engine = EngineConfig::tree(40);
    let policy = EnginePolicy::LatticeOnly;
    let truth = HullWhite::new(curve(), 0.06, 0.009).unwrap();
    let basket = synthetic(&diagonal_basket(&curve()).unwrap(), &truth, policy, &engine);

    let mut model = HullWhite::new(curve(), 0.1, 0.01).unwrap();
    let config = CalibrationConfig::default()
        .with_policy(policy)
        .with_engine(engine)
        .with_error_type(ErrorType::ImpliedVolError);
    let result = Calibrator::new(config).calibrate(&mut model, &basket).unwrap();

    assert!(result.diagnostics.objective < 1e-8, "{result:?}");
    assert!((model.a() - 0.06).abs() < 0.06 * 0.01, "a = {}", model.a());
    assert!((model.sigma() - 0.009).abs() < 0.009 * 0.01, "sigma = {}", model.sigma());
}

#[test]
fn test_result_and_model_records() {
    let mut model = HullWhite::new(curve(), 0.1, 0.01).unwrap();
    let result = calibrate(&mut model, CalibrationConfig::default(), 0.010, 0.006);

    let record = result.to_record();
    assert_eq!(CalibrationResult::from_record(&record).unwrap(), result);

    let mut fresh = HullWhite::new(curve(), 0.1, 0.01).unwrap();
    result.apply_to(&mut fresh).unwrap();
    assert_eq!(fresh.param_values(), model.param_values());

    let snapshot = ModelRecord::capture(&model).unwrap();
    let restored = ModelRecord::from_record(&snapshot.to_record())
        .unwrap()
        .restore(curve())
        .unwrap();
    assert_eq!(restored.param_values(), model.param_values());
}
