//! Numerical Sanitization
//!
//! Guards applied to internal quantities before they enter a division,
//! logarithm or exponent. Caller inputs are validated, never sanitized.

use crate::types::EPSILON;

/// Clamp a belief into the open interval `(EPSILON, 1 - EPSILON)`.
///
/// Non-finite input collapses to the nearest safe bound so a corrupted prior
/// cannot poison every subsequent update.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return EPSILON;
    }
    p.clamp(EPSILON, 1.0 - EPSILON)
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Clamp to `[lo, hi]`, mapping NaN to `lo`.
pub fn clamp_range(x: f64, lo: f64, hi: f64) -> f64 {
    if x.is_nan() {
        lo
    } else {
        x.clamp(lo, hi)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
