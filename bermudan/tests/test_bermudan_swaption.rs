//! End-to-end pricing of the standard Bermudan payer swaption.
//!
//! Flat 3.5 % curve, 1y-forward 5y payer swap on 1000 nominal, exercisable
//! on every fixed accrual start.

use std::sync::Arc;

use bermudan::instruments::{Exercise, Swaption};
use bermudan::methods::{Lattice, LatticeBuilder, LatticeConfig, LatticeKind, DEFAULT_TREE_STEPS};
use bermudan::models::{ModelKind, ShortRateModel, G2};
use bermudan::pricingengines::{closed_form_price, price_on_lattice, EngineConfig};
use bermudan::termstructures::{FlatForward, YieldTermStructure};
use bermudan::{price_bermudan, standard_swaption};
use proptest::prelude::*;

const NOTIONAL: f64 = 1000.0;

fn curve() -> Arc<dyn YieldTermStructure> {
    Arc::new(FlatForward::continuous(0.035))
}

fn model(kind: ModelKind) -> Box<dyn ShortRateModel> {
    kind.build(curve()).unwrap()
}

fn price(kind: ModelKind, config: &EngineConfig, strike_multiplier: f64) -> f64 {
    let swaption = standard_swaption(&curve(), strike_multiplier).unwrap();
    price_on_lattice(model(kind).as_ref(), config, &swaption)
        .unwrap()
        .npv
}

/// The standard swaption cut down to its first exercise date.
fn european(strike_multiplier: f64) -> Swaption {
    let bermudan = standard_swaption(&curve(), strike_multiplier).unwrap();
    Swaption::new(bermudan.swap().clone(), Exercise::european(1.0).unwrap()).unwrap()
}

// ─── Scenario ────────────────────────────────────────────────────────────────

#[test]
fn test_hull_white_tree_scenario() {
    let atm = price_bermudan(0.035, "hw", "tree", 1.0).unwrap();
    let double = price_bermudan(0.035, "hw", "tree", 2.0).unwrap();
    assert!(atm > 0.0, "atm = {atm}");
    assert!(double >= 0.0, "2K = {double}");
    assert!(double < atm, "2K = {double}, atm = {atm}");

    let otm = price_bermudan(0.035, "hw", "tree", 1.2).unwrap();
    let itm = price_bermudan(0.035, "hw", "tree", 0.8).unwrap();
    assert!(itm > atm && atm > otm && otm > double);
}

#[test]
fn test_every_model_and_engine_prices() {
    for model in ["g2", "hw", "bk"] {
        for engine in ["tree", "fdm"] {
            let npv = price_bermudan(0.035, model, engine, 1.0).unwrap();
            assert!(npv > 0.0 && npv < NOTIONAL, "{model}/{engine}: {npv}");
        }
    }
}

// ─── Static properties ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_price_is_non_negative_and_falls_with_strike(
        low in 0.3f64..2.5,
        bump in 0.01f64..1.0,
    ) {
        let config = EngineConfig::tree(50);
        let cheap = price(ModelKind::Hw, &config, low + bump);
        let rich = price(ModelKind::Hw, &config, low);
        prop_assert!(cheap >= -1e-10, "price {cheap}");
        prop_assert!(rich >= cheap - 1e-10, "{rich} < {cheap}");
    }
}

#[test]
fn test_monotonic_in_moneyness_for_every_model() {
    let multipliers = [0.5, 0.8, 1.0, 1.2, 1.5, 2.0, 3.0];
    for kind in [ModelKind::Hw, ModelKind::Bk, ModelKind::G2] {
        let config = EngineConfig::tree(30);
        let prices: Vec<f64> = multipliers.iter().map(|&m| price(kind, &config, m)).collect();
        for pair in prices.windows(2) {
            assert!(pair[0] >= pair[1] - 1e-10, "{kind}: {prices:?}");
        }
        assert!(prices.iter().all(|&p| p >= -1e-10), "{kind}: {prices:?}");
    }
}

// ─── Convergence ─────────────────────────────────────────────────────────────

#[test]
fn test_tree_converges() {
    for kind in [ModelKind::Hw, ModelKind::Bk] {
        let coarse = price(kind, &EngineConfig::tree(100), 1.0);
        let fine = price(kind, &EngineConfig::tree(200), 1.0);
        assert!(
            (coarse - fine).abs() < 1e-3 * NOTIONAL,
            "{kind}: {coarse} vs {fine}"
        );
    }
}

#[test]
fn test_two_factor_tree_converges() {
    let coarse = price(ModelKind::G2, &EngineConfig::tree(100), 1.0);
    let fine = price(ModelKind::G2, &EngineConfig::tree(200), 1.0);
    assert!((coarse - fine).abs() < 3e-3 * fine, "{coarse} vs {fine}");

    let fd = price(ModelKind::G2, &EngineConfig::finite_differences(200, 200), 1.0);
    assert!((fine - fd).abs() < 2e-2 * fine, "tree {fine}, fd {fd}");

    let model = model(ModelKind::G2);
    let swaption = european(1.0);
    let exact = closed_form_price(model.as_ref(), &swaption).unwrap().unwrap();
    let tree = price_on_lattice(model.as_ref(), &EngineConfig::tree(200), &swaption)
        .unwrap()
        .npv;
    assert!((tree - exact).abs() < 5e-3 * exact, "tree {tree}, exact {exact}");
}

#[test]
fn test_finite_differences_converge() {
    let coarse = price(ModelKind::Hw, &EngineConfig::finite_differences(100, 100), 1.0);
    let fine = price(ModelKind::Hw, &EngineConfig::finite_differences(200, 200), 1.0);
    assert!((coarse - fine).abs() < 1e-3 * NOTIONAL, "{coarse} vs {fine}");
}

#[test]
fn test_tree_and_finite_differences_agree() {
    let tree = price(ModelKind::Hw, &EngineConfig::tree(200), 1.0);
    let fd = price(ModelKind::Hw, &EngineConfig::finite_differences(200, 200), 1.0);
    assert!((tree - fd).abs() < 1e-2 * tree, "hw: tree {tree}, fd {fd}");
}

// ─── Lattice against closed forms ────────────────────────────────────────────

#[test]
fn test_european_matches_closed_form() {
    for kind in [ModelKind::Hw, ModelKind::G2] {
        let model = model(kind);
        for multiplier in [0.8, 1.0, 1.2] {
            let swaption = european(multiplier);
            let exact = closed_form_price(model.as_ref(), &swaption)
                .unwrap()
                .unwrap();
            let tree = price_on_lattice(model.as_ref(), &EngineConfig::tree(100), &swaption)
                .unwrap()
                .npv;
            assert!(
                (tree - exact).abs() < 2e-2 * exact + 1e-4 * NOTIONAL,
                "{kind} x{multiplier}: tree {tree}, exact {exact}"
            );
        }
    }
}

#[test]
fn test_two_factor_tree_keeps_the_correlation() {
    let config = EngineConfig::tree(DEFAULT_TREE_STEPS);
    let swaption = european(1.0);
    for rho in [0.0, -0.3, -0.75] {
        let model = G2::new(curve(), 0.1, 0.01, 0.1, 0.01, rho).unwrap();
        let exact = closed_form_price(&model, &swaption).unwrap().unwrap();
        let tree = price_on_lattice(&model, &config, &swaption).unwrap().npv;
        assert!(
            (tree - exact).abs() < 1e-2 * exact,
            "rho {rho}: tree {tree}, exact {exact}"
        );
    }
}

#[test]
fn test_bermudan_dominates_european() {
    for kind in [ModelKind::Hw, ModelKind::Bk, ModelKind::G2] {
        let model = model(kind);
        let config = EngineConfig::tree(50);
        let bermudan = price(kind, &config, 1.0);
        let european = price_on_lattice(model.as_ref(), &config, &european(1.0))
            .unwrap()
            .npv;
        assert!(bermudan >= european, "{kind}: {bermudan} < {european}");
    }
}

// ─── Curve consistency ───────────────────────────────────────────────────────

fn assert_reprices_curve(lattice: &dyn Lattice, tolerance: f64, label: &str) {
    let curve = curve();
    let grid = lattice.time_grid();
    for i in 0..grid.size() {
        let t = grid.time(i);
        let bond = lattice.discount_bond(i).unwrap();
        let expected = curve.discount(t);
        assert!(
            ((bond - expected) / expected).abs() < tolerance,
            "{label}: P(0, {t}) = {bond}, curve {expected}"
        );
    }
}

#[test]
fn test_lattices_reprice_the_curve() {
    let dates = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    for kind in [ModelKind::Hw, ModelKind::Bk, ModelKind::G2] {
        let model = model(kind);
        let tree = LatticeBuilder::new(LatticeConfig::tree(50))
            .build(model.as_ref(), &dates)
            .unwrap();
        assert_reprices_curve(tree.as_ref(), 1e-6, &format!("{kind} tree"));
    }
    for kind in [ModelKind::Hw, ModelKind::Bk] {
        let model = model(kind);
        let mesh = LatticeBuilder::new(LatticeConfig::finite_differences(60, 100))
            .build(model.as_ref(), &dates)
            .unwrap();
        assert_reprices_curve(mesh.as_ref(), 1e-6, &format!("{kind} fd"));
    }
    let g2 = model(ModelKind::G2);
    let mesh = LatticeBuilder::new(LatticeConfig::finite_differences(60, 60))
        .build(g2.as_ref(), &dates)
        .unwrap();
    assert_reprices_curve(mesh.as_ref(), 1e-6, "g2 fd");
}

#[test]
fn test_lattice_kind_names() {
    assert!(matches!("tree".parse::<LatticeKind>(), Ok(LatticeKind::Tree { steps: 50 })));
    assert!(matches!(
        "fdm".parse::<LatticeKind>(),
        Ok(LatticeKind::FiniteDifferences {
            time_steps: 100,
            space_steps: 100,
            ..
        })
    ));
}
