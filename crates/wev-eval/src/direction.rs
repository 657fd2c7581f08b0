// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Unsigned angle in degrees (0..=180) between two compass directions,
/// measured between their unit vectors.
pub fn angle_difference(a_deg: f64, b_deg: f64) -> f64 {
    let (a_sin, a_cos) = a_deg.to_radians().sin_cos();
    let (b_sin, b_cos) = b_deg.to_radians().sin_cos();
    let dot = a_cos * b_cos + a_sin * b_sin;
    let cross = a_cos * b_sin - a_sin * b_cos;
    cross.abs().atan2(dot).to_degrees()
}

/// Row-wise [`angle_difference`]; the result is scored against a zero baseline.
pub fn angle_difference_series(baseline: &[f64], comparison: &[f64]) -> Vec<f64> {
    baseline
        .iter()
        .zip(comparison)
        .map(|(a, b)| angle_difference(*a, *b))
        .collect()
}
