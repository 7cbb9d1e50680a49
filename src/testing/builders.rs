//! Record builders for tests.

use crate::record::Record;
use std::ops::RangeInclusive;

/// Build one record per slice of `(key, value)` pairs.
///
/// Values go through the usual inference, so `"4"` becomes an integer.
///
/// ```
/// use ironmill::testing::records;
///
/// let rs = records(&[&[("a", "1"), ("b", "x")], &[("a", "2")]]);
/// assert_eq!(rs.len(), 2);
/// assert_eq!(rs[0].keys().collect::<Vec<_>>(), vec!["a", "b"]);
/// ```
#[must_use]
pub fn records(rows: &[&[(&str, &str)]]) -> Vec<Record> {
    rows.iter().map(|pairs| pairs.iter().copied().collect()).collect()
}

/// Fluent builder for a single record.
///
/// ```
/// use ironmill::testing::RecordBuilder;
///
/// let r = RecordBuilder::new().field("id", "7").field("n", 3_i64).build();
/// assert_eq!(r.get("n").unwrap().to_string(), "3");
/// ```
#[derive(Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: impl Into<crate::value::Value>) -> Self {
        self.record.put(key, value);
        self
    }

    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

/// Builder for a run of records that share a shape.
///
/// ```
/// use ironmill::testing::RecordSetBuilder;
///
/// let rs = RecordSetBuilder::new()
///     .add_numbered("i", 1..=3)
///     .add_repeated(&[("k", "v")], 2)
///     .build();
/// assert_eq!(rs.len(), 5);
/// ```
#[derive(Default)]
pub struct RecordSetBuilder {
    records: Vec<Record>,
}

impl RecordSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One single-field record per number in `range`.
    #[must_use]
    pub fn add_numbered(mut self, field: &str, range: RangeInclusive<i64>) -> Self {
        self.records.extend(range.map(|i| {
            let mut r = Record::new();
            r.put(field, i);
            r
        }));
        self
    }

    #[must_use]
    pub fn add_repeated(mut self, pairs: &[(&str, &str)], count: usize) -> Self {
        let record: Record = pairs.iter().copied().collect();
        self.records
            .extend(std::iter::repeat_n(record, count));
        self
    }

    #[must_use]
    pub fn add_record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<Record> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_records_keep_order() {
        let rs = RecordSetBuilder::new().add_numbered("i", 3..=5).build();
        let is: Vec<String> = rs.iter().map(|r| r.get("i").unwrap().to_string()).collect();
        assert_eq!(is, vec!["3", "4", "5"]);
    }
}
