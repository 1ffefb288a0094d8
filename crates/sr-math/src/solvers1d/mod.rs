//! 1D root-finding solvers.
//!
//! [`brent`] needs a bracket with a sign change; [`brent_with_guess`] first
//! grows one outward from an initial guess with [`bracket`]. The lattice
//! curve fitting and the Jamshidian/G2 critical-rate searches rely on the
//! latter since good bounds are not known in advance.

use sr_core::{ensure, fail, Real, Result};

const MAX_ITERATIONS: u32 = 100;
const MAX_BRACKET_EVALUATIONS: u32 = 100;
const GROWTH_FACTOR: Real = 1.6;
const DEFAULT_ACCURACY: Real = 1.0e-11;

// ── Brent ─────────────────────────────────────────────────────────────────────

/// Brent's method for finding a root of `f(x)` in `[x_min, x_max]`.
///
/// Combines bisection, secant, and inverse quadratic interpolation.
/// Fails with `Numerical` when `f(x_min)` and `f(x_max)` share a sign or
/// when the iteration budget is exhausted.
pub fn brent<F>(f: F, x_min: Real, x_max: Real, accuracy: Real) -> Result<Real>
where
    F: Fn(Real) -> Real,
{
    let fa = f(x_min);
    let fb = f(x_max);
    brent_bracketed(&f, (x_min, fa), (x_max, fb), accuracy)
}

fn brent_bracketed<F>(
    f: &F,
    (mut a, mut fa): (Real, Real),
    (mut b, mut fb): (Real, Real),
    accuracy: Real,
) -> Result<Real>
where
    F: Fn(Real) -> Real,
{
    let acc = if accuracy > 0.0 {
        accuracy
    } else {
        DEFAULT_ACCURACY
    };
    if !(fa.is_finite() && fb.is_finite()) {
        fail!(Numerical, "brent: non-finite function value at the bracket ends");
    }
    if fa * fb > 0.0 {
        fail!(
            Numerical,
            "brent: f({a}) = {fa} and f({b}) = {fb} must have opposite signs"
        );
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_ITERATIONS {
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }
        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * acc;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }
        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (p, q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            let (p, q) = if p > 0.0 { (p, -q) } else { (-p, q) };
            if 2.0 * p < (3.0 * xm * q - (tol * q).abs()) && 2.0 * p < (e * q).abs() {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }
        a = b;
        fa = fb;
        b += if d.abs() > tol {
            d
        } else if xm > 0.0 {
            tol
        } else {
            -tol
        };
        fb = f(b);
        if !fb.is_finite() {
            fail!(Numerical, "brent: non-finite function value at x = {b}");
        }
    }
    fail!(Numerical, "brent: maximum iterations ({MAX_ITERATIONS}) reached")
}

// ── Bracketing ────────────────────────────────────────────────────────────────

/// Grow an interval around `guess` until `f` changes sign across it.
///
/// Starts from `[guess - step, guess]` and repeatedly pushes out whichever
/// end has the smaller `|f|` by a factor of 1.6. Returns the bracket
/// together with the function values at its ends.
pub fn bracket<F>(f: &F, guess: Real, step: Real) -> Result<((Real, Real), (Real, Real))>
where
    F: Fn(Real) -> Real,
{
    ensure!(step > 0.0, Numerical, "bracket: step must be positive, got {step}");
    let mut x_max = guess;
    let mut f_max = f(x_max);
    let mut x_min = guess - step;
    let mut f_min = f(x_min);

    for _ in 0..MAX_BRACKET_EVALUATIONS {
        if !(f_min.is_finite() && f_max.is_finite()) {
            fail!(
                Numerical,
                "bracket: non-finite function value in [{x_min}, {x_max}]"
            );
        }
        if f_min * f_max <= 0.0 {
            return Ok(((x_min, f_min), (x_max, f_max)));
        }
        if f_min.abs() < f_max.abs() {
            x_min += GROWTH_FACTOR * (x_min - x_max);
            f_min = f(x_min);
        } else {
            x_max += GROWTH_FACTOR * (x_max - x_min);
            f_max = f(x_max);
        }
    }
    fail!(
        Numerical,
        "bracket: no sign change found in [{x_min}, {x_max}] from guess {guess}"
    )
}

/// Brent's method started from a guess instead of a bracket.
pub fn brent_with_guess<F>(f: F, accuracy: Real, guess: Real, step: Real) -> Result<Real>
where
    F: Fn(Real) -> Real,
{
    let (lo, hi) = bracket(&f, guess, step)?;
    brent_bracketed(&f, lo, hi, accuracy)
}
