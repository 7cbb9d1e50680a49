//! Half-streaming join: the whole left file is bucketed in memory, the right
//! side streams past it.

use super::bucket::{JoinBucket, LeftRecord};
use super::left::LeftFileSource;
use super::options::JoinOptions;
use super::{emit_left_unpaireds, form_pair};
use crate::group_map::OrderedGroupMap;
use crate::record::{Context, GROUPING_KEY_SEPARATOR, Record, RecordAndContext};
use crate::verb::Emitter;
use anyhow::Result;
use tracing::debug;

/// The ingested left side.
#[derive(Debug, Default)]
pub(crate) struct LeftBuckets {
    pub(crate) buckets: OrderedGroupMap<JoinBucket>,
    /// Left records missing one or more join fields, in file order.
    pub(crate) unpairable: Vec<LeftRecord>,
}

impl LeftBuckets {
    /// Read every left record and bucket it by join key.
    pub(crate) fn ingest(options: &JoinOptions) -> Result<Self> {
        let mut source = LeftFileSource::spawn(options)?;
        let mut left = Self::default();
        let mut count = 0u64;
        while let Some(mut rec) = source.next()? {
            count += 1;
            super::retain_left_fields(&mut rec.record, options);
            match rec.record.selected_strings(&options.left_join_fields) {
                Some(parts) => {
                    let key = parts.join(GROUPING_KEY_SEPARATOR.to_string().as_str());
                    left.buckets
                        .get_or_insert_with(&key, || JoinBucket::new(parts))
                        .records
                        .push(rec);
                }
                None => left.unpairable.push(rec),
            }
        }
        debug!(
            records = count,
            buckets = left.buckets.len(),
            unpairable = left.unpairable.len(),
            "join: left file ingested"
        );
        Ok(left)
    }
}

#[derive(Debug, Default)]
pub(crate) struct HashJoiner {
    left: Option<LeftBuckets>,
}

impl HashJoiner {
    fn left(&mut self, options: &JoinOptions) -> Result<&mut LeftBuckets> {
        let left = match self.left.take() {
            Some(left) => left,
            None => LeftBuckets::ingest(options)?,
        };
        Ok(self.left.insert(left))
    }

    pub(crate) fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        options: &JoinOptions,
    ) -> Result<()> {
        match item {
            RecordAndContext::Record { record, context } => {
                self.process_right(record, context, out, options)
            }
            RecordAndContext::EndOfStream(context) => {
                let left = self.left(options)?;
                if options.emit_left_unpairables {
                    let buckets = std::mem::take(&mut left.buckets);
                    for (_, bucket) in buckets {
                        if !bucket.was_paired() {
                            emit_left_unpaireds(bucket.records, out)?;
                        }
                    }
                    emit_left_unpaireds(std::mem::take(&mut left.unpairable), out)?;
                }
                out.emit(RecordAndContext::end_of_stream(context))
            }
        }
    }

    fn process_right(
        &mut self,
        record: Record,
        context: Context,
        out: &mut Emitter,
        options: &JoinOptions,
    ) -> Result<()> {
        let left = self.left(options)?;
        let bucket = record
            .selected_values_joined(&options.right_join_fields)
            .and_then(|key| left.buckets.get_mut(&key));
        match bucket {
            Some(bucket) => {
                bucket.mark_paired();
                if options.emit_pairables {
                    for l in &bucket.records {
                        let pair = form_pair(&l.record, &record, options);
                        out.emit_record(pair, context.clone())?;
                    }
                }
            }
            None if options.emit_right_unpairables => out.emit_record(record, context)?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDir;

    #[test]
    fn ingest_buckets_by_key_and_keeps_key_parts() -> Result<()> {
        let dir = TestDir::new()?;
        let path = dir.write_text("left.dkvp", "a=1,b=x,n=1\na=2,b=y,n=2\nn=3\na=1,b=x,n=4\n")?;
        let options = JoinOptions::on_fields(path.display().to_string(), &["a", "b"]);
        let left = LeftBuckets::ingest(&options)?;
        assert_eq!(left.buckets.len(), 2);
        let bucket = left.buckets.get("1\u{1f}x").expect("bucket for 1,x");
        assert_eq!(bucket.key, vec!["1".to_string(), "x".to_string()]);
        assert_eq!(bucket.len(), 2);
        assert_eq!(left.unpairable.len(), 1);
        Ok(())
    }
}
