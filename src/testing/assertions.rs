//! Assertions for result columns.
//!
//! `NaN` is the "no data" marker, so plain `assert_eq!` on `f64` vectors is useless
//! here: these helpers treat two NaNs as equal.

/// `true` when both are NaN or both are equal.
#[inline]
pub fn same_value(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

/// Assert two result columns match exactly, NaN matching NaN.
///
/// # Panics
///
/// Panics if the lengths differ or any slot differs.
///
/// ```
/// use gridbeam::testing::assert_results_eq;
///
/// assert_results_eq(&[1.0, f64::NAN], &[1.0, f64::NAN]);
/// ```
pub fn assert_results_eq(actual: &[f64], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Result length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            same_value(*a, *e),
            "Result mismatch at slot {i}: expected {e}, got {a}\n  Expected: {expected:?}\n  Actual: {actual:?}"
        );
    }
}

/// Like [`assert_results_eq`] but finite values may differ by `tolerance`.
///
/// # Panics
///
/// Panics if the lengths differ or any slot is out of tolerance.
pub fn assert_results_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "Result length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let ok = same_value(*a, *e) || (a - e).abs() <= tolerance;
        assert!(ok, "Result mismatch at slot {i}: expected {e} ± {tolerance}, got {a}");
    }
}

/// # Panics
///
/// Panics if any slot holds a value.
pub fn assert_all_nan(actual: &[f64]) {
    if let Some(i) = actual.iter().position(|v| !v.is_nan()) {
        panic!("expected every slot to be NaN, slot {i} is {}", actual[i]);
    }
}
