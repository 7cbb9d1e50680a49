//! The `join` verb.
//!
//! Pairs records from the main ("right") stream with records from a "left"
//! file that share join-field values. Two strategies, chosen once at
//! construction:
//!
//! - **Unsorted** (default): the whole left file is bucketed in memory on
//!   first use; right records stream past. Any input order works. See
//!   [`hash`].
//! - **Sorted** (`-s`): both sides stream in lock step and memory stays
//!   bounded, but both inputs must be sorted ascending (lexically) by join
//!   key. See [`merge`].
//!
//! Three independent flags decide what comes out: pairs (on unless `--np`),
//! left-unpaired records (`--ul`), right-unpaired records (`--ur`).
//!
//! # Pair layout
//! A pair is built from the output join-field names (values from the left
//! record), then the left record's other fields with the left prefix, then
//! the right record's other fields with the right prefix. A right field whose
//! prefixed name is already present overwrites it in place. The pair carries
//! the right record's context.

pub mod bucket;
mod hash;
mod left;
mod merge;
pub mod options;

use crate::error::UsageError;
use crate::record::{Record, RecordAndContext};
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use bucket::LeftRecord;
use hash::HashJoiner;
use merge::MergeJoiner;
pub use options::{JoinArgs, JoinOptions};

enum Strategy {
    Unsorted(HashJoiner),
    Sorted(MergeJoiner),
}

pub struct JoinVerb {
    options: JoinOptions,
    strategy: Strategy,
}

impl JoinVerb {
    /// # Errors
    /// The options break the join's configuration contract.
    pub fn new(options: JoinOptions) -> Result<Self, UsageError> {
        options.validate()?;
        let strategy = if options.sorted_input {
            Strategy::Sorted(MergeJoiner::new())
        } else {
            Strategy::Unsorted(HashJoiner::default())
        };
        Ok(Self { options, strategy })
    }

    #[must_use]
    pub const fn options(&self) -> &JoinOptions {
        &self.options
    }

    #[must_use]
    pub const fn is_sorted(&self) -> bool {
        matches!(self.strategy, Strategy::Sorted(_))
    }
}

impl Verb for JoinVerb {
    fn name(&self) -> &'static str {
        "join"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        match &mut self.strategy {
            Strategy::Unsorted(j) => j.transform(item, out, &self.options),
            Strategy::Sorted(j) => j.transform(item, out, &self.options),
        }
    }
}

/// Build the output record for one matched (left, right) pair.
#[must_use]
pub fn form_pair(left: &Record, right: &Record, options: &JoinOptions) -> Record {
    let mut pair = Record::with_capacity(left.len() + right.len());
    for (output_name, left_name) in options
        .output_join_fields
        .iter()
        .zip(&options.left_join_fields)
    {
        if let Some(v) = left.get(left_name) {
            pair.put(output_name.as_str(), v.clone());
        }
    }
    for (k, v) in left.iter() {
        if !options.left_join_fields.iter().any(|f| f == k) {
            pair.put(format!("{}{k}", options.left_prefix), v.clone());
        }
    }
    for (k, v) in right.iter() {
        if !options.right_join_fields.iter().any(|f| f == k) {
            pair.put(format!("{}{k}", options.right_prefix), v.clone());
        }
    }
    pair
}

/// Apply `--lk`: keep join fields plus the named non-join fields.
fn retain_left_fields(record: &mut Record, options: &JoinOptions) {
    let Some(keep) = &options.left_keep_fields else {
        return;
    };
    let drop: Vec<String> = record
        .keys()
        .filter(|k| {
            !options.left_join_fields.iter().any(|f| f == k) && !keep.iter().any(|f| f == k)
        })
        .map(str::to_string)
        .collect();
    for k in drop {
        record.remove(&k);
    }
}

fn emit_left_unpaireds(records: Vec<LeftRecord>, out: &mut Emitter) -> Result<()> {
    for l in records {
        out.emit_record(l.record, l.context)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn pair_layout_join_fields_then_left_then_right() {
        let mut o = JoinOptions::on_fields("l", &["id"]);
        o.right_join_fields = vec!["rid".into()];
        let left = rec(&[("x", "lx"), ("id", "1"), ("name", "a")]);
        let right = rec(&[("rid", "1"), ("val", "10")]);
        let pair = form_pair(&left, &right, &o);
        assert_eq!(pair.keys().collect::<Vec<_>>(), vec!["id", "x", "name", "val"]);
    }

    #[test]
    fn prefixes_apply_to_non_join_fields() {
        let mut o = JoinOptions::on_fields("l", &["id"]);
        o.left_prefix = "left_".into();
        o.right_prefix = "right_".into();
        let pair = form_pair(
            &rec(&[("id", "1"), ("v", "a")]),
            &rec(&[("id", "1"), ("v", "b")]),
            &o,
        );
        assert_eq!(pair, rec(&[("id", "1"), ("left_v", "a"), ("right_v", "b")]));
    }

    #[test]
    fn right_value_wins_on_collision_without_prefixes() {
        let o = JoinOptions::on_fields("l", &["id"]);
        let pair = form_pair(
            &rec(&[("id", "1"), ("v", "a"), ("w", "x")]),
            &rec(&[("id", "1"), ("v", "b")]),
            &o,
        );
        assert_eq!(pair, rec(&[("id", "1"), ("v", "b"), ("w", "x")]));
    }

    #[test]
    fn output_join_names_replace_left_names() {
        let mut o = JoinOptions::on_fields("l", &["id"]);
        o.left_join_fields = vec!["lid".into()];
        o.right_join_fields = vec!["rid".into()];
        let pair = form_pair(
            &rec(&[("lid", "7"), ("a", "1")]),
            &rec(&[("rid", "7"), ("b", "2")]),
            &o,
        );
        assert_eq!(pair, rec(&[("id", "7"), ("a", "1"), ("b", "2")]));
    }

    #[test]
    fn left_keep_drops_other_non_join_fields() {
        let mut o = JoinOptions::on_fields("l", &["id"]);
        o.left_keep_fields = Some(vec!["b".into()]);
        let mut r = rec(&[("a", "1"), ("id", "2"), ("b", "3"), ("c", "4")]);
        retain_left_fields(&mut r, &o);
        assert_eq!(r, rec(&[("id", "2"), ("b", "3")]));
    }

    #[test]
    fn construction_rejects_bad_options() {
        let mut o = JoinOptions::on_fields("l", &["id"]);
        o.emit_pairables = false;
        assert_eq!(JoinVerb::new(o).err(), Some(UsageError::NoEmission));
        let sorted = JoinOptions {
            sorted_input: true,
            ..JoinOptions::on_fields("l", &["id"])
        };
        assert!(JoinVerb::new(sorted).unwrap().is_sorted());
    }
}
