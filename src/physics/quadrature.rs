//! Adaptive Simpson quadrature.
//!
//! The interval is first cut into a fixed number of panels, each refined recursively until
//! the two-half Simpson estimate agrees with the whole-panel estimate within its share of
//! the tolerance (with the usual Richardson correction `Δ / 15`).
//!
//! The absolute tolerance is derived from a composite-Simpson pre-estimate of the integral,
//! which makes the requested tolerance relative.

/// Number of initial panels.
const PANELS: usize = 32;

/// Recursion depth limit per panel.
const MAX_DEPTH: u32 = 48;

/// Composite Simpson rule with `n` subintervals (`n` rounded up to an even number).
pub fn composite_simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, n: usize) -> f64 {
    let n = (n.max(2) + 1) & !1;
    let h = (b - a) / n as f64;
    let inner: f64 = (1..n)
        .map(|i| {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            weight * f(a + i as f64 * h)
        })
        .sum();
    h / 3.0 * (f(a) + inner + f(b))
}

/// `∫ₐᵇ f(x) dx` to a relative tolerance `rel_tol`.
///
/// Arguments
/// -----------------
/// * `f`: Integrand, assumed smooth and finite on `[a, b]`.
/// * `a`, `b`: Finite bounds; `a > b` integrates backwards.
/// * `rel_tol`: Requested relative accuracy.
///
/// Return
/// ----------
/// * The integral estimate. When the recursion limit is hit in a panel, that panel's
///   best estimate is kept.
pub fn adaptive_simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, rel_tol: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    if a > b {
        return -adaptive_simpson(f, b, a, rel_tol);
    }

    let coarse = composite_simpson(&f, a, b, 4 * PANELS);
    let eps = (rel_tol * coarse.abs()).max(f64::MIN_POSITIVE);
    let width = (b - a) / PANELS as f64;

    (0..PANELS)
        .map(|k| {
            let lo = a + k as f64 * width;
            let hi = if k + 1 == PANELS { b } else { lo + width };
            let mid = 0.5 * (lo + hi);
            let (f_lo, f_mid, f_hi) = (f(lo), f(mid), f(hi));
            let whole = (hi - lo) / 6.0 * (f_lo + 4.0 * f_mid + f_hi);
            refine(
                &f,
                Panel {
                    a: lo,
                    m: mid,
                    b: hi,
                    fa: f_lo,
                    fm: f_mid,
                    fb: f_hi,
                    whole,
                },
                eps / PANELS as f64,
                MAX_DEPTH,
            )
        })
        .sum()
}

#[derive(Clone, Copy)]
struct Panel {
    a: f64,
    m: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
}

fn refine<F: Fn(f64) -> f64>(f: &F, p: Panel, eps: f64, depth: u32) -> f64 {
    let lm = 0.5 * (p.a + p.m);
    let rm = 0.5 * (p.m + p.b);
    let (f_lm, f_rm) = (f(lm), f(rm));
    let left = (p.m - p.a) / 6.0 * (p.fa + 4.0 * f_lm + p.fm);
    let right = (p.b - p.m) / 6.0 * (p.fm + 4.0 * f_rm + p.fb);
    let delta = left + right - p.whole;

    if depth == 0 || !delta.is_finite() || delta.abs() <= 15.0 * eps {
        return left + right + delta / 15.0;
    }

    refine(
        f,
        Panel {
            a: p.a,
            m: lm,
            b: p.m,
            fa: p.fa,
            fm: f_lm,
            fb: p.fm,
            whole: left,
        },
        eps / 2.0,
        depth - 1,
    ) + refine(
        f,
        Panel {
            a: p.m,
            m: rm,
            b: p.b,
            fa: p.fm,
            fm: f_rm,
            fb: p.fb,
            whole: right,
        },
        eps / 2.0,
        depth - 1,
    )
}

#[cfg(test)]
mod quadrature_test {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_polynomial_is_exact() {
        let v = composite_simpson(|x| x * x * x, 0.0, 2.0, 2);
        assert_relative_eq!(v, 4.0, max_relative = 1e-14);
    }

    #[test]
    fn test_sine() {
        let v = adaptive_simpson(f64::sin, 0.0, PI, 1e-12);
        assert_relative_eq!(v, 2.0, max_relative = 1e-11);
        assert_relative_eq!(adaptive_simpson(f64::sin, PI, 0.0, 1e-12), -2.0, max_relative = 1e-11);
        assert_eq!(adaptive_simpson(f64::sin, 1.0, 1.0, 1e-12), 0.0);
    }

    #[test]
    fn test_planck_kernel() {
        // ∫₀^∞ x³ / (eˣ − 1) dx = π⁴ / 15
        let kernel = |x: f64| if x == 0.0 { 0.0 } else { x.powi(3) / x.exp_m1() };
        let v = adaptive_simpson(kernel, 0.0, 700.0, 1e-10);
        assert_relative_eq!(v, PI.powi(4) / 15.0, max_relative = 1e-9);
    }
}
