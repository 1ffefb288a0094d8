//! Floating-point comparison.

use sr_core::Real;

/// Return `true` if `|a - b| <= epsilon`.
#[inline]
pub fn close(a: Real, b: Real, epsilon: Real) -> bool {
    (a - b).abs() <= epsilon
}

/// Return `true` if `a` and `b` agree to within `n` machine epsilons,
/// relative to the larger magnitude.
///
/// Used to match user-supplied times against lattice slice times.
#[inline]
pub fn close_enough(a: Real, b: Real, n: u32) -> bool {
    if a == b {
        return true;
    }
    let eps = a.abs().max(b.abs()).max(1.0) * f64::EPSILON * n as f64;
    (a - b).abs() <= eps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_basic() {
        assert!(close(1.0, 1.0 + 1e-11, 1e-10));
        assert!(!close(1.0, 1.0 + 1e-9, 1e-10));
    }

    #[test]
    fn close_enough_handles_accumulated_grid_error() {
        let t: Real = (0..10).map(|_| 0.1).sum();
        assert!(close_enough(t, 1.0, 42));
        assert!(!close_enough(1.0, 1.0 + 1e-9, 42));
        assert!(close_enough(0.0, 1e-17, 42));
    }
}
