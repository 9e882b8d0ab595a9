//! Assertion helpers shared by the test suites of the workspace crates.

use assert_float_eq::*;

/// Asserts that two slices agree element-wise, each pair within `epsilon` of each other in
/// relative terms. Exact matches (including zeros) always pass.
pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

/// Asserts that `value` lies in the inclusive range `[min, max]`.
pub fn assert_within(min: f64, max: f64, value: f64) {
    assert!(
        value >= min && value <= max,
        "{value} is outside of [{min}, {max}]"
    );
}

/// Asserts that the values of `items`, projected by `key`, never increase.
pub fn assert_non_increasing<T, K: PartialOrd + std::fmt::Debug>(items: &[T], key: impl Fn(&T) -> K) {
    for (index, pair) in items.windows(2).enumerate() {
        let (prev, next) = (key(&pair[0]), key(&pair[1]));
        assert!(
            prev >= next,
            "element {} ({next:?}) is greater than its predecessor ({prev:?})",
            index + 1
        );
    }
}
