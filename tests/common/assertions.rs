//! Assertion helpers for floating-point results.
//!
//! Query results are either real values, compared with a tolerance, or the
//! undefined-measurement sentinel, compared exactly.

#![allow(dead_code)]

use redplanet::NANVAL;

/// Tolerance used when none is given
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Panics unless `|actual - expected| <= epsilon`
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    assert!(
        (actual - expected).abs() <= epsilon,
        "expected {} (+/- {}), got {}",
        expected,
        epsilon,
        actual
    );
}

/// Element-wise [`assert_approx_eq`] that names the first differing index
pub fn assert_array_approx_eq(actual: &[f64], expected: &[f64], epsilon: Option<f64>) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    if let Some((i, (a, e))) = actual
        .iter()
        .zip(expected)
        .enumerate()
        .find(|(_, (a, e))| (*a - *e).abs() > epsilon)
    {
        panic!("Arrays differ at index {}: {} vs {}", i, a, e);
    }
}

/// Inclusive bounds check
pub fn assert_in_range(actual: f64, min: f64, max: f64) {
    assert!(
        (min..=max).contains(&actual),
        "{} is outside [{}, {}]",
        actual,
        min,
        max
    );
}

/// The value is exactly the sentinel
pub fn assert_undefined(actual: f64) {
    assert!(actual == NANVAL, "expected the undefined sentinel, got {}", actual);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq_accepts_rounding() {
        assert_approx_eq(0.1 + 0.2, 0.3, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
    }

    #[test]
    #[should_panic(expected = "Arrays differ at index 2")]
    fn test_array_approx_eq_reports_index() {
        assert_array_approx_eq(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0], None);
    }

    #[test]
    fn test_undefined_is_exact() {
        assert_undefined(-1e10);
        assert_in_range(-1e10, NANVAL, NANVAL);
    }
}
