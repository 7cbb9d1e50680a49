//! Left-side storage shared by both join strategies.

use crate::record::{Context, Record};

/// One record from the left file, with the context it was read under.
#[derive(Clone, Debug, PartialEq)]
pub struct LeftRecord {
    pub record: Record,
    pub context: Context,
}

/// Left records sharing one join key.
///
/// `was_paired` only ever goes from false to true; it decides whether the
/// bucket's records are left-unpaired at the end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoinBucket {
    /// Join-field values in left join-field order; the sorted join compares
    /// buckets by this.
    pub key: Vec<String>,
    pub records: Vec<LeftRecord>,
    was_paired: bool,
}

impl JoinBucket {
    #[must_use]
    pub const fn new(key: Vec<String>) -> Self {
        Self {
            key,
            records: Vec::new(),
            was_paired: false,
        }
    }

    pub fn mark_paired(&mut self) {
        self.was_paired = true;
    }

    #[must_use]
    pub const fn was_paired(&self) -> bool {
        self.was_paired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
