//! Levenberg–Marquardt least-squares optimizer.

use super::{Constraint, CostFunction, EndCriteria, EndCriteriaType, OptimizationResult};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use sr_core::{ensure, Real, Result};
use tracing::{debug, trace};

const MIN_DAMPING: Real = 1e-12;
const MAX_DAMPING: Real = 1e16;

/// Levenberg–Marquardt with Marquardt's diagonal scaling.
///
/// Each iteration builds a forward-difference Jacobian `J`, then solves
/// `(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr` by Cholesky. Trial points are projected
/// onto the constraint before evaluation. Accepted steps shrink `λ` by ten,
/// rejected steps grow it by ten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevenbergMarquardt {
    /// Relative precision of the residuals; the finite-difference step is
    /// `sqrt(epsfcn) * |x|`.
    pub epsfcn: Real,
    /// Initial damping `λ`.
    pub initial_damping: Real,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            epsfcn: 1e-8,
            initial_damping: 1e-3,
        }
    }
}

impl LevenbergMarquardt {
    /// Create a new optimizer.
    pub fn new(epsfcn: Real, initial_damping: Real) -> Self {
        Self {
            epsfcn,
            initial_damping,
        }
    }

    /// Minimize `0.5 * |cost(x)|²` starting from `initial`.
    ///
    /// Fails with `Calibration` when there is nothing to fit or when a
    /// residual evaluates to a non-finite number; cost-function errors are
    /// propagated unchanged.
    pub fn minimize<C, K>(
        &self,
        cost: &mut C,
        constraint: &K,
        initial: &DVector<Real>,
        end: &EndCriteria,
    ) -> Result<OptimizationResult>
    where
        C: CostFunction + ?Sized,
        K: Constraint + ?Sized,
    {
        let n = initial.len();
        ensure!(n > 0, Calibration, "levenberg-marquardt: no free parameters");
        ensure!(
            self.initial_damping > 0.0,
            InvalidParameter,
            "levenberg-marquardt: initial damping must be positive"
        );
        let max_evaluations = end.max_evaluations.unwrap_or(usize::MAX);

        let mut x = constraint.project(initial);
        let mut evaluations = 0usize;
        let mut r = evaluate(cost, &x, &mut evaluations)?;
        ensure!(!r.is_empty(), Calibration, "levenberg-marquardt: no residuals");
        let mut value = 0.5 * r.norm_squared();
        let mut lambda = self.initial_damping;
        let mut gradient_norm = Real::INFINITY;
        let mut iterations = 0usize;

        let end_type = 'outer: loop {
            if value <= Real::MIN_POSITIVE {
                break EndCriteriaType::StationaryFunctionValue;
            }
            if iterations >= end.max_iterations {
                break EndCriteriaType::MaxIterations;
            }
            if evaluations.saturating_add(n + 1) > max_evaluations {
                break EndCriteriaType::MaxEvaluations;
            }
            iterations += 1;

            let jac = self.jacobian(cost, constraint, &x, &r, &mut evaluations)?;
            let jt = jac.transpose();
            let gradient = &jt * &r;
            let jtj = &jt * &jac;
            gradient_norm = gradient.amax();
            if gradient_norm <= end.gradient_norm_epsilon {
                break EndCriteriaType::StationaryGradient;
            }

            let mut rejected = 0usize;
            loop {
                let mut a = jtj.clone();
                for i in 0..n {
                    let d = jtj[(i, i)];
                    a[(i, i)] += lambda * if d > 0.0 { d } else { 1.0 };
                }
                let step = match a.cholesky() {
                    Some(ch) => ch.solve(&(-&gradient)),
                    None => {
                        lambda *= 10.0;
                        rejected += 1;
                        if lambda > MAX_DAMPING {
                            break 'outer EndCriteriaType::Unknown;
                        }
                        continue;
                    }
                };
                if step.iter().any(|s| !s.is_finite()) {
                    break 'outer EndCriteriaType::Unknown;
                }

                let candidate = constraint.project(&(&x + &step));
                let moved = (&candidate - &x).norm();
                if moved <= end.root_epsilon * (x.norm() + end.root_epsilon) {
                    break 'outer EndCriteriaType::StationaryPoint;
                }
                if evaluations >= max_evaluations {
                    break 'outer EndCriteriaType::MaxEvaluations;
                }
                let r_new = evaluate(cost, &candidate, &mut evaluations)?;
                let value_new = 0.5 * r_new.norm_squared();

                if value_new < value {
                    let reduction = (value - value_new) / value;
                    x = candidate;
                    r = r_new;
                    value = value_new;
                    lambda = (lambda / 10.0).max(MIN_DAMPING);
                    debug!(iteration = iterations, value, lambda, "levenberg-marquardt step accepted");
                    if reduction <= end.function_epsilon {
                        break 'outer EndCriteriaType::StationaryFunctionValue;
                    }
                    break;
                }

                trace!(iteration = iterations, value_new, lambda, "levenberg-marquardt step rejected");
                lambda *= 10.0;
                rejected += 1;
                if rejected >= end.max_stationary_state_iterations || lambda > MAX_DAMPING {
                    break 'outer EndCriteriaType::StationaryPoint;
                }
            }
        };

        Ok(OptimizationResult {
            x,
            value,
            residuals: r,
            iterations,
            evaluations,
            gradient_norm,
            end_type,
        })
    }

    /// Forward-difference Jacobian. A step that would leave the feasible
    /// set is taken backwards instead.
    fn jacobian<C, K>(
        &self,
        cost: &mut C,
        constraint: &K,
        x: &DVector<Real>,
        r: &DVector<Real>,
        evaluations: &mut usize,
    ) -> Result<DMatrix<Real>>
    where
        C: CostFunction + ?Sized,
        K: Constraint + ?Sized,
    {
        let eps = self.epsfcn.max(f64::EPSILON).sqrt();
        let mut jac = DMatrix::zeros(r.len(), x.len());
        for j in 0..x.len() {
            let mut h = eps * x[j].abs();
            if h == 0.0 {
                h = eps;
            }
            let mut shifted = x.clone();
            shifted[j] += h;
            if !constraint.test(&shifted) {
                h = -h;
                shifted[j] = x[j] + h;
            }
            let rp = evaluate(cost, &shifted, evaluations)?;
            ensure!(
                rp.len() == r.len(),
                Calibration,
                "levenberg-marquardt: residual count changed from {} to {}",
                r.len(),
                rp.len()
            );
            jac.set_column(j, &((rp - r) / h));
        }
        Ok(jac)
    }
}

fn evaluate<C>(cost: &mut C, x: &DVector<Real>, evaluations: &mut usize) -> Result<DVector<Real>>
where
    C: CostFunction + ?Sized,
{
    *evaluations += 1;
    let r = cost.values(x)?;
    ensure!(
        r.iter().all(|v| v.is_finite()),
        Calibration,
        "levenberg-marquardt: non-finite residual at x = {:?}",
        x.as_slice()
    );
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{BoxConstraint, NoConstraint};
    use approx::assert_abs_diff_eq;
    use sr_core::Error;

    struct Rosenbrock;
    impl CostFunction for Rosenbrock {
        fn values(&mut self, x: &DVector<Real>) -> Result<DVector<Real>> {
            Ok(DVector::from_vec(vec![1.0 - x[0], 10.0 * (x[1] - x[0] * x[0])]))
        }
    }

    struct Shifted(Real);
    impl CostFunction for Shifted {
        fn values(&mut self, x: &DVector<Real>) -> Result<DVector<Real>> {
            Ok(DVector::from_vec(vec![x[0] - self.0]))
        }
    }

    /// Exponential decay fit y = A exp(-k t), the shape of a discount curve.
    struct DecayFit {
        times: Vec<Real>,
        observed: Vec<Real>,
    }
    impl CostFunction for DecayFit {
        fn values(&mut self, x: &DVector<Real>) -> Result<DVector<Real>> {
            Ok(DVector::from_iterator(
                self.times.len(),
                self.times
                    .iter()
                    .zip(&self.observed)
                    .map(|(t, y)| x[0] * (-x[1] * t).exp() - y),
            ))
        }
    }

    #[test]
    fn rosenbrock_converges() {
        let lm = LevenbergMarquardt::default();
        let res = lm
            .minimize(
                &mut Rosenbrock,
                &NoConstraint,
                &DVector::from_vec(vec![-1.2, 1.0]),
                &EndCriteria::default(),
            )
            .unwrap();
        assert_abs_diff_eq!(res.x[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(res.x[1], 1.0, epsilon = 1e-5);
        assert!(res.end_type.is_converged(), "{:?}", res.end_type);
    }

    #[test]
    fn recovers_exact_parameters_from_clean_data() {
        let times: Vec<Real> = (1..=10).map(|i| i as Real * 0.5).collect();
        let observed = times.iter().map(|t| 0.98 * (-0.035 * t).exp()).collect();
        let mut fit = DecayFit { times, observed };
        let res = LevenbergMarquardt::default()
            .minimize(
                &mut fit,
                &NoConstraint,
                &DVector::from_vec(vec![1.0, 0.1]),
                &EndCriteria::default(),
            )
            .unwrap();
        assert_abs_diff_eq!(res.x[0], 0.98, epsilon = 1e-7);
        assert_abs_diff_eq!(res.x[1], 0.035, epsilon = 1e-7);
        assert!(res.value < 1e-14);
    }

    #[test]
    fn projection_keeps_iterates_feasible() {
        let bounds = BoxConstraint::new(vec![0.0], vec![2.0]).unwrap();
        let res = LevenbergMarquardt::default()
            .minimize(
                &mut Shifted(3.0),
                &bounds,
                &DVector::from_vec(vec![1.0]),
                &EndCriteria::default(),
            )
            .unwrap();
        assert_abs_diff_eq!(res.x[0], 2.0, epsilon = 1e-12);
        assert_eq!(res.end_type, EndCriteriaType::StationaryPoint);
    }

    #[test]
    fn iteration_budget_is_reported() {
        let res = LevenbergMarquardt::default()
            .minimize(
                &mut Rosenbrock,
                &NoConstraint,
                &DVector::from_vec(vec![-1.2, 1.0]),
                &EndCriteria::new(1, 100, 1e-8, 1e-8, 1e-8),
            )
            .unwrap();
        assert_eq!(res.iterations, 1);
        assert_eq!(res.end_type, EndCriteriaType::MaxIterations);
    }

    #[test]
    fn evaluation_budget_is_reported() {
        let res = LevenbergMarquardt::default()
            .minimize(
                &mut Rosenbrock,
                &NoConstraint,
                &DVector::from_vec(vec![-1.2, 1.0]),
                &EndCriteria::default().with_max_evaluations(10),
            )
            .unwrap();
        assert_eq!(res.end_type, EndCriteriaType::MaxEvaluations);
        assert!(res.evaluations <= 10);
    }

    #[test]
    fn non_finite_residual_fails_as_calibration() {
        struct Nan;
        impl CostFunction for Nan {
            fn values(&mut self, _x: &DVector<Real>) -> Result<DVector<Real>> {
                Ok(DVector::from_vec(vec![f64::NAN]))
            }
        }
        let err = LevenbergMarquardt::default()
            .minimize(
                &mut Nan,
                &NoConstraint,
                &DVector::from_vec(vec![0.0]),
                &EndCriteria::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Calibration(_)));
    }

    #[test]
    fn empty_parameter_vector_fails() {
        let err = LevenbergMarquardt::default()
            .minimize(
                &mut Shifted(1.0),
                &NoConstraint,
                &DVector::zeros(0),
                &EndCriteria::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Calibration(_)));
    }
}
