//! Assertions over record streams.

use crate::record::{Record, RecordAndContext};

/// Assert that two record sequences are equal in order and content.
///
/// # Panics
/// Panics if the sequences differ in length or content.
///
/// ```
/// use ironmill::testing::{assert_records_equal, records};
///
/// let rs = records(&[&[("a", "1")]]);
/// assert_records_equal(&rs, &rs.clone());
/// ```
pub fn assert_records_equal(actual: &[Record], expected: &[Record]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Record count mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(
            a, e,
            "Record mismatch at index {i}:\n  Full expected: {expected:?}\n  Full actual: {actual:?}"
        );
    }
}

/// Assert that two record sequences hold the same records, ignoring order.
///
/// Duplicates count: `[r, r]` does not equal `[r]`.
///
/// # Panics
/// Panics if the multisets differ.
pub fn assert_records_unordered_equal(actual: &[Record], expected: &[Record]) {
    let mut a: Vec<String> = actual.iter().map(|r| format!("{r:?}")).collect();
    let mut e: Vec<String> = expected.iter().map(|r| format!("{r:?}")).collect();
    a.sort();
    e.sort();
    assert_eq!(a, e, "Record multisets differ (order ignored)");
}

/// Assert that `items` holds exactly one end of stream, and that it is last.
///
/// # Panics
/// Panics on a missing, repeated, or early end of stream.
pub fn assert_single_end_of_stream(items: &[RecordAndContext]) {
    let ends: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_end_of_stream())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(
        ends,
        vec![items.len().saturating_sub(1)],
        "expected one end of stream as the final item of {} items",
        items.len()
    );
}

/// Assert that every record satisfies `predicate`.
///
/// # Panics
/// Panics at the first record that does not.
pub fn assert_all_records<F: Fn(&Record) -> bool>(records: &[Record], predicate: F) {
    for (i, r) in records.iter().enumerate() {
        assert!(predicate(r), "Predicate failed for record at index {i}: {r:?}");
    }
}

/// Rendered values of `field`, in order; records without it are skipped.
#[must_use]
pub fn field_values(records: &[Record], field: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get(field))
        .map(ToString::to_string)
        .collect()
}
