//! Small datasets for join scenarios.
//!
//! Both sides are keyed by `id` and sorted ascending by it, so the same data
//! exercises the unsorted and the sorted join. Each side has one record
//! without an `id`, and the left side has a repeated key.

use crate::record::Record;
use crate::testing::records;

/// Left-file records: `id` and `name`.
///
/// Keys: `1`, `2` (twice), `4`, plus one unkeyed record.
#[must_use]
pub fn join_left_records() -> Vec<Record> {
    records(&[
        &[("id", "1"), ("name", "alice")],
        &[("id", "2"), ("name", "bob")],
        &[("id", "2"), ("name", "bobby")],
        &[("id", "4"), ("name", "dan")],
        &[("name", "nobody")],
    ])
}

/// Main-input records: `id` and `val`.
///
/// Keys: `1`, `2`, `3`, `5`, plus one unkeyed record.
#[must_use]
pub fn join_right_records() -> Vec<Record> {
    records(&[
        &[("id", "1"), ("val", "a")],
        &[("id", "2"), ("val", "b")],
        &[("id", "3"), ("val", "c")],
        &[("id", "5"), ("val", "e")],
        &[("val", "orphan")],
    ])
}

/// The pairs an `id` join of the two fixtures produces, in output order.
#[must_use]
pub fn join_expected_pairs() -> Vec<Record> {
    records(&[
        &[("id", "1"), ("name", "alice"), ("val", "a")],
        &[("id", "2"), ("name", "bob"), ("val", "b")],
        &[("id", "2"), ("name", "bobby"), ("val", "b")],
    ])
}
