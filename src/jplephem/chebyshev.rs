//! Chebyshev series evaluation and fitting
//!
//! Each [`CoefficientBlock`] holds one series per spatial axis covering one
//! sub-interval. Time is mapped onto the canonical domain [-1, 1] and every
//! axis is summed with the three-term recurrence Tₙ(τ) = 2τ·Tₙ₋₁(τ) − Tₙ₋₂(τ).

use nalgebra::Vector3;

use crate::jplephem::store::CoefficientBlock;

/// Value of the series c₀T₀(τ) + c₁T₁(τ) + … at τ
///
/// τ is not clamped to [-1, 1].
pub fn series(coefficients: &[f64], tau: f64) -> f64 {
    sum_series(coefficients.len(), |k| coefficients[k], tau)
}

/// Derivative of [`series`] with respect to τ
pub fn series_derivative(coefficients: &[f64], tau: f64) -> f64 {
    sum_series_derivative(coefficients.len(), |k| coefficients[k], tau)
}

/// One axis of a block as an owned coefficient vector
pub fn axis_coefficients(block: &CoefficientBlock<'_>, axis: usize) -> Vec<f64> {
    (0..block.n_coeffs()).map(|k| block.coefficient(axis, k)).collect()
}

/// Sum c₀T₀(τ) + … + cₙ₋₁Tₙ₋₁(τ) with the forward recurrence
fn sum_series(n: usize, coefficient: impl Fn(usize) -> f64, tau: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }

    let mut t_prev2 = 1.0; // T_0
    let mut t_prev1 = tau; // T_1
    let mut sum = coefficient(0);
    if n > 1 {
        sum += coefficient(1) * tau;
    }

    for k in 2..n {
        let t_k = 2.0 * tau * t_prev1 - t_prev2;
        sum += coefficient(k) * t_k;
        t_prev2 = t_prev1;
        t_prev1 = t_k;
    }

    sum
}

/// Sum of c_k·T′_k(τ), using T′ₙ = 2Tₙ₋₁ + 2τT′ₙ₋₁ − T′ₙ₋₂
fn sum_series_derivative(n: usize, coefficient: impl Fn(usize) -> f64, tau: f64) -> f64 {
    if n <= 1 {
        return 0.0;
    }

    let mut t_prev2 = 1.0; // T_0
    let mut t_prev1 = tau; // T_1
    let mut d_prev2 = 0.0; // T'_0
    let mut d_prev1 = 1.0; // T'_1
    let mut sum = coefficient(1);

    for k in 2..n {
        let t_k = 2.0 * tau * t_prev1 - t_prev2;
        let d_k = 2.0 * t_prev1 + 2.0 * tau * d_prev1 - d_prev2;
        sum += coefficient(k) * d_k;
        t_prev2 = t_prev1;
        t_prev1 = t_k;
        d_prev2 = d_prev1;
        d_prev1 = d_k;
    }

    sum
}

/// Map a Julian date onto [-1, 1] for a sub-interval starting at `start` of length `span`
pub fn normalize_time(jd: f64, start: f64, span: f64) -> f64 {
    2.0 * (jd - start) / span - 1.0
}

/// Evaluate the position stored in a coefficient block at `jd`
///
/// Units are those of the coefficients (km for DE-style files).
pub fn evaluate(block: &CoefficientBlock<'_>, jd: f64) -> Vector3<f64> {
    let tau = normalize_time(jd, block.start_jd(), block.span());
    let n = block.n_coeffs();
    Vector3::new(
        sum_series(n, |k| block.coefficient(0, k), tau),
        sum_series(n, |k| block.coefficient(1, k), tau),
        sum_series(n, |k| block.coefficient(2, k), tau),
    )
}

/// Evaluate position and velocity (per day) from a coefficient block at `jd`
pub fn evaluate_with_velocity(block: &CoefficientBlock<'_>, jd: f64) -> (Vector3<f64>, Vector3<f64>) {
    let tau = normalize_time(jd, block.start_jd(), block.span());
    let n = block.n_coeffs();
    // dτ/djd
    let scale = 2.0 / block.span();

    let position = evaluate(block, jd);
    let velocity = Vector3::new(
        sum_series_derivative(n, |k| block.coefficient(0, k), tau),
        sum_series_derivative(n, |k| block.coefficient(1, k), tau),
        sum_series_derivative(n, |k| block.coefficient(2, k), tau),
    ) * scale;

    (position, velocity)
}

/// The `n` Chebyshev nodes of the first kind on [-1, 1]
pub fn chebyshev_nodes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|j| (std::f64::consts::PI * (j as f64 + 0.5) / n as f64).cos())
        .collect()
}

/// Chebyshev coefficients of `f` on [-1, 1], sampled at the `n` Chebyshev nodes
///
/// The fit is exact for polynomials of degree below `n`.
pub fn fit_coefficients(n: usize, f: impl Fn(f64) -> f64) -> Vec<f64> {
    let values: Vec<f64> = chebyshev_nodes(n).into_iter().map(f).collect();
    fit_values(&values)
}

/// Chebyshev coefficients from function values sampled at [`chebyshev_nodes`]
pub fn fit_values(values: &[f64]) -> Vec<f64> {
    use std::f64::consts::PI;

    let n = values.len();
    (0..n)
        .map(|k| {
            let sum: f64 = (0..n)
                .map(|j| values[j] * (PI * k as f64 * (j as f64 + 0.5) / n as f64).cos())
                .sum();
            let c = 2.0 * sum / n as f64;
            if k == 0 {
                c / 2.0
            } else {
                c
            }
        })
        .collect()
}
