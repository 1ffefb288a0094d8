//! Bermudan swaption engine on short-rate lattices.
//!
//! The underlying swap is valued on the lattice itself. Walking the slices
//! backwards, each coupon enters the running swap value at its reset slice,
//! priced with a unit bond rolled back from its payment slice:
//!
//! * fixed: `N K τ P(t, T_pay)`
//! * floating: `N (1/P(t, T_end) − 1) P(t, T_pay) + N s τ P(t, T_pay)`,
//!   which is `N (1 − P) + N s τ P` when payment falls on the accrual end.
//!
//! At exercise slices the option becomes `max(continuation, swap)`, where
//! the swap value holds exactly the coupons accruing from that date on.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sr_core::{Real, Result, Time};
use sr_instruments::{Coupon, CouponKind, PricingEngine, PricingResults, Swaption};
use sr_methods::{Lattice, LatticeBuilder};
use sr_models::ShortRateModel;
use tracing::debug;

use crate::engine_config::{EngineConfig, ExerciseTieBreak};

/// Relative size under which exercise and continuation values tie.
const TIE_TOLERANCE: Real = 1e-12;

/// Exercise statistics at one exercise date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDiagnostics {
    /// Exercise time.
    pub time: Time,
    /// Nodes where exercising is optimal, ties counted per the engine's
    /// tie-break.
    pub exercised_nodes: usize,
    /// Nodes where exercise and continuation tie.
    pub tied_nodes: usize,
    /// Nodes in the slice.
    pub nodes: usize,
}

/// Lattice price of a swaption with its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeSwaptionResults {
    /// Swaption value.
    pub npv: Real,
    /// Value of the underlying swap on the same lattice.
    pub swap_npv: Real,
    /// One entry per exercise date, in time order.
    pub exercise: Vec<ExerciseDiagnostics>,
}

/// A coupon with the slices where it resets, ends accruing and pays.
struct SlicedCoupon<'a> {
    coupon: &'a Coupon,
    end: usize,
    payment: usize,
}

/// Prices European and Bermudan swaptions by backward induction on a
/// lattice of the model.
#[derive(Debug, Clone)]
pub struct LatticeSwaptionEngine {
    model: Arc<dyn ShortRateModel>,
    config: EngineConfig,
}

impl LatticeSwaptionEngine {
    /// Create an engine.
    pub fn new(model: Arc<dyn ShortRateModel>, config: EngineConfig) -> Self {
        Self { model, config }
    }

    /// The model.
    pub fn model(&self) -> &Arc<dyn ShortRateModel> {
        &self.model
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Price of `swaption`.
    pub fn price(&self, swaption: &Swaption) -> Result<Real> {
        Ok(self.price_with_details(swaption)?.npv)
    }

    /// Price of `swaption` with the lattice swap value and exercise counts.
    pub fn price_with_details(&self, swaption: &Swaption) -> Result<LatticeSwaptionResults> {
        price_on_lattice(self.model.as_ref(), &self.config, swaption)
    }
}

/// Prices `swaption` on a lattice of a borrowed model.
///
/// This is what [`LatticeSwaptionEngine`] runs; calibration calls it
/// directly on the model it is fitting.
pub fn price_on_lattice(
    model: &dyn ShortRateModel,
    config: &EngineConfig,
    swaption: &Swaption,
) -> Result<LatticeSwaptionResults> {
    swaption.validate()?;
    let swap = swaption.swap();
    let coupons = swap.coupons();
    let exercise_times = swaption.exercise().times();

    let mut mandatory = exercise_times.to_vec();
    for c in &coupons {
        mandatory.extend([c.accrual_start, c.accrual_end, c.payment_time]);
    }
    let lattice = LatticeBuilder::new(config.lattice).build(model, &mandatory)?;
    let grid = lattice.time_grid();

    let mut resets: BTreeMap<usize, Vec<SlicedCoupon<'_>>> = BTreeMap::new();
    for coupon in &coupons {
        resets
            .entry(grid.index(coupon.accrual_start)?)
            .or_default()
            .push(SlicedCoupon {
                coupon,
                end: grid.index(coupon.accrual_end)?,
                payment: grid.index(coupon.payment_time)?,
            });
    }
    let mut exercises: BTreeMap<usize, Time> = BTreeMap::new();
    for &t in exercise_times {
        exercises.insert(grid.index(t)?, t);
    }

    let sign = swap.swap_type().sign();
    let last = grid.steps();
    let mut option = vec![0.0; lattice.size(last)];
    let mut swap_values = vec![0.0; lattice.size(last)];
    let mut diagnostics = Vec::with_capacity(exercises.len());

    for i in (0..=last).rev() {
        if i < last {
            option = lattice.step_back(i, &option)?;
            swap_values = lattice.step_back(i, &swap_values)?;
        }
        if let Some(entering) = resets.get(&i) {
            for sliced in entering {
                let values = coupon_values(lattice.as_ref(), i, sliced)?;
                for (s, v) in swap_values.iter_mut().zip(values) {
                    *s += sign * v;
                }
            }
        }
        if let Some(&time) = exercises.get(&i) {
            diagnostics.push(exercise(time, config.tie_break, &mut option, &swap_values));
        }
    }
    diagnostics.reverse();

    let results = LatticeSwaptionResults {
        npv: lattice.root_value(&option),
        swap_npv: lattice.root_value(&swap_values),
        exercise: diagnostics,
    };
    debug!(
        model = model.name(),
        kind = ?config.lattice.kind,
        npv = results.npv,
        swap_npv = results.swap_npv,
        exercised = ?results.exercise.iter().map(|d| d.exercised_nodes).collect::<Vec<_>>(),
        "swaption priced on lattice"
    );
    Ok(results)
}

/// Applies the exercise decision in place and counts the nodes that
/// exercise.
fn exercise(
    time: Time,
    tie_break: ExerciseTieBreak,
    option: &mut [Real],
    swap: &[Real],
) -> ExerciseDiagnostics {
    let mut exercised_nodes = 0;
    let mut tied_nodes = 0;
    for (value, &exercise) in option.iter_mut().zip(swap) {
        let continuation = *value;
        let tie = exercise > 0.0
            && (exercise - continuation).abs() <= TIE_TOLERANCE * continuation.abs().max(1.0);
        if tie {
            tied_nodes += 1;
            if tie_break == ExerciseTieBreak::Exercise {
                exercised_nodes += 1;
            }
        } else if exercise > continuation {
            exercised_nodes += 1;
        }
        *value = continuation.max(exercise);
    }
    ExerciseDiagnostics {
        time,
        exercised_nodes,
        tied_nodes,
        nodes: option.len(),
    }
}

/// Value at every node of slice `reset` of a coupon resetting there, seen
/// from the payer side (fixed coupons negative).
fn coupon_values(lattice: &dyn Lattice, reset: usize, sliced: &SlicedCoupon<'_>) -> Result<Vec<Real>> {
    let coupon = sliced.coupon;
    let unit_bond = |maturity: usize| lattice.rollback(vec![1.0; lattice.size(maturity)], maturity, reset);
    let to_payment = unit_bond(sliced.payment)?;
    let tau = coupon.accrual_fraction;
    let n = coupon.nominal;
    Ok(match coupon.kind {
        CouponKind::Fixed { rate } => to_payment.iter().map(|p| -n * rate * tau * p).collect(),
        CouponKind::Floating { spread } => {
            if sliced.end == sliced.payment {
                to_payment
                    .iter()
                    .map(|p| n * (1.0 - p) + n * spread * tau * p)
                    .collect()
            } else {
                let to_end = unit_bond(sliced.end)?;
                to_payment
                    .iter()
                    .zip(&to_end)
                    .map(|(p, e)| n * (1.0 / e - 1.0) * p + n * spread * tau * p)
                    .collect()
            }
        }
    })
}

impl PricingEngine<Swaption> for LatticeSwaptionEngine {
    fn calculate(&self, swaption: &Swaption) -> Result<PricingResults> {
        let details = self.price_with_details(swaption)?;
        let mut results =
            PricingResults::from_npv(details.npv).with_result("swap_npv", details.swap_npv);
        for d in &details.exercise {
            results = results.with_result(
                format!("exercised_nodes@{}", d.time),
                d.exercised_nodes as Real,
            );
        }
        Ok(results)
    }
}
