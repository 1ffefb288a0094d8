//! Standard normal distribution.

use sr_core::Real;
use statrs::function::erf::erfc;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Cumulative distribution function of the standard normal, `Φ(x)`.
///
/// Evaluated through `erfc` so that the lower tail keeps full relative
/// precision.
#[inline]
pub fn normal_cdf(x: Real) -> Real {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

/// Probability density function of the standard normal, `φ(x)`.
#[inline]
pub fn normal_pdf(x: Real) -> Real {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_abs_diff_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(normal_cdf(1.0), 0.841_344_746_068_542_9, epsilon = 1e-14);
        assert_abs_diff_eq!(normal_cdf(-1.959_963_984_540_054), 0.025, epsilon = 1e-13);
        assert_abs_diff_eq!(normal_pdf(0.0), 0.398_942_280_401_432_7, epsilon = 1e-15);
    }

    #[test]
    fn lower_tail_keeps_precision() {
        let p = normal_cdf(-10.0);
        assert!(p > 0.0 && p < 1e-22);
    }

    proptest! {
        #[test]
        fn cdf_symmetry(x in -8.0f64..8.0) {
            prop_assert!((normal_cdf(x) + normal_cdf(-x) - 1.0).abs() < 1e-14);
        }

        #[test]
        fn cdf_derivative_is_pdf(x in -5.0f64..5.0) {
            let h = 1e-5;
            let fd = (normal_cdf(x + h) - normal_cdf(x - h)) / (2.0 * h);
            prop_assert!((fd - normal_pdf(x)).abs() < 1e-8);
        }
    }
}
