//! In-memory record source.

use super::{ReaderOutput, RecordReader};
use crate::record::{Context, Record};
use crate::verb::{Batch, DEFAULT_RECORDS_PER_BATCH};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};

/// Drives a fixed list of records through the [`RecordReader`] interface.
///
/// File names passed to `read` are ignored; every record is attributed to
/// `filename`. The list is consumed by the first `read`.
#[derive(Clone, Debug)]
pub struct VecRecordReader {
    records: Vec<Record>,
    filename: String,
    records_per_batch: usize,
}

impl VecRecordReader {
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            filename: "(memory)".to_string(),
            records_per_batch: DEFAULT_RECORDS_PER_BATCH,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    #[must_use]
    pub const fn with_records_per_batch(mut self, n: usize) -> Self {
        self.records_per_batch = n;
        self
    }
}

impl RecordReader for VecRecordReader {
    fn read(
        &mut self,
        _file_names: &[String],
        mut context: Context,
        output: &Sender<Batch>,
        downstream_done: &Receiver<()>,
    ) -> Result<()> {
        let mut out = ReaderOutput::new(output, downstream_done, self.records_per_batch);
        context.update_for_start_of_file(&self.filename);
        for record in std::mem::take(&mut self.records) {
            if out.stopped() {
                break;
            }
            context.update_for_input_record();
            out.push(record, &context)?;
        }
        out.finish(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordAndContext;
    use crossbeam_channel::{bounded, unbounded};

    #[test]
    fn numbers_records_and_terminates_once() -> Result<()> {
        let records: Vec<Record> = (0..5i64).map(|i| [("i", i)].into_iter().collect()).collect();
        let (tx, rx) = unbounded();
        let (_done_tx, done_rx) = bounded(1);
        VecRecordReader::new(records)
            .with_records_per_batch(2)
            .read(&[], Context::default(), &tx, &done_rx)?;
        drop(tx);
        let items: Vec<RecordAndContext> = rx.iter().flatten().collect();
        assert_eq!(items.len(), 6);
        assert_eq!(items[4].context().nr, 5);
        assert!(items[5].is_end_of_stream());
        assert_eq!(items.iter().filter(|i| i.is_end_of_stream()).count(), 1);
        Ok(())
    }

    #[test]
    fn stops_early_when_downstream_is_done() -> Result<()> {
        let records: Vec<Record> = (0..100i64).map(|i| [("i", i)].into_iter().collect()).collect();
        let (tx, rx) = unbounded();
        let (done_tx, done_rx) = bounded(1);
        done_tx.send(())?;
        VecRecordReader::new(records)
            .with_records_per_batch(10)
            .read(&[], Context::default(), &tx, &done_rx)?;
        drop(tx);
        let items: Vec<RecordAndContext> = rx.iter().flatten().collect();
        assert_eq!(items.len(), 11);
        assert!(items[10].is_end_of_stream());
        Ok(())
    }
}
