//! Doubly-streaming join over inputs sorted ascending by join key.
//!
//! The [`BucketKeeper`] walks the left file forward in step with the right
//! stream. It holds at most the current bucket (consecutive left records
//! sharing one key), one look-ahead record, and the left records it has just
//! retired as unpaired. Keys compare lexically, field by field.
//!
//! Unsorted input is not detected: matches are silently missed.

use super::bucket::{JoinBucket, LeftRecord};
use super::left::LeftFileSource;
use super::options::JoinOptions;
use super::{emit_left_unpaireds, form_pair};
use crate::record::RecordAndContext;
use crate::verb::Emitter;
use anyhow::Result;
use std::cmp::Ordering;
use tracing::trace;

/// Where the keeper stands in the left file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeeperState {
    /// Nothing read yet.
    Prefill,
    /// A current bucket and more left input behind it.
    Full,
    /// A current bucket and the left file is exhausted.
    LastBucket,
    /// No bucket and nothing left to read.
    Eof,
}

pub(crate) struct BucketKeeper {
    source: Option<LeftFileSource>,
    bucket: Option<JoinBucket>,
    /// First record of the next bucket, already read.
    peek: Option<(Vec<String>, LeftRecord)>,
    left_unpaireds: Vec<LeftRecord>,
    state: KeeperState,
}

impl BucketKeeper {
    pub(crate) const fn new() -> Self {
        Self {
            source: None,
            bucket: None,
            peek: None,
            left_unpaireds: Vec::new(),
            state: KeeperState::Prefill,
        }
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> KeeperState {
        self.state
    }

    /// Advance the left side to `right_key`; true if the current bucket matches.
    ///
    /// Buckets passed over on the way are retired to the left-unpaired list
    /// unless they were paired earlier.
    pub(crate) fn find_bucket(
        &mut self,
        right_key: &[String],
        options: &JoinOptions,
    ) -> Result<bool> {
        if self.state == KeeperState::Prefill {
            self.prefill(options)?;
        }
        let cmp = match &self.bucket {
            Some(bucket) => bucket.key.as_slice().cmp(right_key),
            None => return Ok(false),
        };
        if cmp == Ordering::Less {
            self.advance_to(right_key, options)?;
        }
        match &mut self.bucket {
            Some(bucket) if bucket.key.as_slice() == right_key => {
                bucket.mark_paired();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Records of the current bucket.
    pub(crate) fn bucket_records(&self) -> &[LeftRecord] {
        self.bucket
            .as_ref()
            .map(|b| b.records.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn take_left_unpaireds(&mut self) -> Vec<LeftRecord> {
        std::mem::take(&mut self.left_unpaireds)
    }

    /// Retire everything that remains on the left side.
    pub(crate) fn drain(&mut self, options: &JoinOptions) -> Result<Vec<LeftRecord>> {
        if self.state == KeeperState::Prefill {
            self.prefill(options)?;
        }
        self.retire_bucket();
        if let Some((_, rec)) = self.peek.take() {
            self.left_unpaireds.push(rec);
        }
        if let Some(source) = self.source.as_mut() {
            while let Some(mut rec) = source.next()? {
                super::retain_left_fields(&mut rec.record, options);
                self.left_unpaireds.push(rec);
            }
        }
        self.state = KeeperState::Eof;
        Ok(self.take_left_unpaireds())
    }

    fn prefill(&mut self, options: &JoinOptions) -> Result<()> {
        self.source = Some(LeftFileSource::spawn(options)?);
        match self.next_keyed(options)? {
            Some(first) => self.fill_bucket(first, options)?,
            None => self.state = KeeperState::Eof,
        }
        Ok(())
    }

    /// Next left record that has every join field; the rest go straight to
    /// the unpaired list.
    fn next_keyed(
        &mut self,
        options: &JoinOptions,
    ) -> Result<Option<(Vec<String>, LeftRecord)>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        while let Some(mut rec) = source.next()? {
            super::retain_left_fields(&mut rec.record, options);
            match rec.record.selected_strings(&options.left_join_fields) {
                Some(key) => return Ok(Some((key, rec))),
                None => self.left_unpaireds.push(rec),
            }
        }
        Ok(None)
    }

    /// Start a bucket at `first` and pull in every consecutive same-key record.
    fn fill_bucket(
        &mut self,
        first: (Vec<String>, LeftRecord),
        options: &JoinOptions,
    ) -> Result<()> {
        let (key, rec) = first;
        let mut bucket = JoinBucket::new(key);
        bucket.records.push(rec);
        loop {
            match self.next_keyed(options)? {
                Some((key, rec)) if key == bucket.key => bucket.records.push(rec),
                Some(next) => {
                    self.peek = Some(next);
                    self.state = KeeperState::Full;
                    break;
                }
                None => {
                    self.state = KeeperState::LastBucket;
                    break;
                }
            }
        }
        trace!(key = ?bucket.key, records = bucket.len(), "join: new left bucket");
        self.bucket = Some(bucket);
        Ok(())
    }

    /// Move past every left record keyed strictly before `right_key`.
    fn advance_to(&mut self, right_key: &[String], options: &JoinOptions) -> Result<()> {
        self.retire_bucket();
        loop {
            let next = match self.peek.take() {
                Some(next) => Some(next),
                None if self.state == KeeperState::Full => self.next_keyed(options)?,
                None => None,
            };
            let Some((key, rec)) = next else {
                self.state = KeeperState::Eof;
                return Ok(());
            };
            if key.as_slice() < right_key {
                self.left_unpaireds.push(rec);
                continue;
            }
            return self.fill_bucket((key, rec), options);
        }
    }

    fn retire_bucket(&mut self) {
        if let Some(bucket) = self.bucket.take()
            && !bucket.was_paired()
        {
            self.left_unpaireds.extend(bucket.records);
        }
    }
}

pub(crate) struct MergeJoiner {
    keeper: BucketKeeper,
}

impl MergeJoiner {
    pub(crate) const fn new() -> Self {
        Self {
            keeper: BucketKeeper::new(),
        }
    }

    pub(crate) fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        options: &JoinOptions,
    ) -> Result<()> {
        match item {
            RecordAndContext::Record { record, context } => {
                let paired = match record.selected_strings(&options.right_join_fields) {
                    Some(key) => self.keeper.find_bucket(&key, options)?,
                    None => false,
                };
                let retired = self.keeper.take_left_unpaireds();
                if options.emit_left_unpairables {
                    emit_left_unpaireds(retired, out)?;
                }
                if paired {
                    if options.emit_pairables {
                        for l in self.keeper.bucket_records() {
                            let pair = form_pair(&l.record, &record, options);
                            out.emit_record(pair, context.clone())?;
                        }
                    }
                } else if options.emit_right_unpairables {
                    out.emit_record(record, context)?;
                }
                Ok(())
            }
            RecordAndContext::EndOfStream(context) => {
                let rest = self.keeper.drain(options)?;
                if options.emit_left_unpairables {
                    emit_left_unpaireds(rest, out)?;
                }
                out.emit(RecordAndContext::end_of_stream(context))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDir;

    fn keeper_over(text: &str) -> (TestDir, JoinOptions, BucketKeeper) {
        let dir = TestDir::new().unwrap();
        let path = dir.write_text("left.dkvp", text).unwrap();
        let options = JoinOptions::on_fields(path.display().to_string(), &["k"]);
        (dir, options, BucketKeeper::new())
    }

    fn key(k: &str) -> Vec<String> {
        vec![k.to_string()]
    }

    fn names(records: &[LeftRecord]) -> Vec<String> {
        records
            .iter()
            .filter_map(|l| l.record.get("n"))
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn walks_buckets_and_retires_skipped_ones() -> Result<()> {
        let (_dir, o, mut keeper) = keeper_over("k=a,n=1\nk=a,n=2\nk=c,n=3\nk=d,n=4\n");
        assert_eq!(keeper.state(), KeeperState::Prefill);

        assert!(keeper.find_bucket(&key("a"), &o)?);
        assert_eq!(keeper.state(), KeeperState::Full);
        assert_eq!(names(keeper.bucket_records()), vec!["1", "2"]);
        assert!(keeper.take_left_unpaireds().is_empty());

        // "b" lands between buckets: nothing pairs, the paired "a" is not retired.
        assert!(!keeper.find_bucket(&key("b"), &o)?);
        assert!(keeper.take_left_unpaireds().is_empty());

        // Skipping past unpaired "c" retires it; "d" is the last bucket.
        assert!(keeper.find_bucket(&key("d"), &o)?);
        assert_eq!(keeper.state(), KeeperState::LastBucket);
        assert_eq!(names(&keeper.take_left_unpaireds()), vec!["3"]);

        assert!(!keeper.find_bucket(&key("e"), &o)?);
        assert_eq!(keeper.state(), KeeperState::Eof);
        assert!(keeper.drain(&o)?.is_empty());
        Ok(())
    }

    #[test]
    fn drain_returns_everything_unvisited() -> Result<()> {
        let (_dir, o, mut keeper) = keeper_over("k=a,n=1\nn=2\nk=b,n=3\n");
        assert!(!keeper.find_bucket(&key("0"), &o)?);
        let rest = keeper.drain(&o)?;
        assert_eq!(names(&rest), vec!["2", "1", "3"]);
        assert_eq!(keeper.state(), KeeperState::Eof);
        Ok(())
    }

    #[test]
    fn empty_left_file_goes_straight_to_eof() -> Result<()> {
        let (_dir, o, mut keeper) = keeper_over("");
        assert!(!keeper.find_bucket(&key("a"), &o)?);
        assert_eq!(keeper.state(), KeeperState::Eof);
        Ok(())
    }
}
