//! The end of a chain: where the final stage's items go.

use super::RecordWriter;
use crate::record::RecordAndContext;
use anyhow::{Context, Result};
use std::io::Write;

/// Consumes the final output stream, one item at a time, in order.
pub trait RecordSink {
    /// # Errors
    /// Write failures abort the run.
    fn accept(&mut self, item: RecordAndContext) -> Result<()>;
}

/// Renders records with a [`RecordWriter`] into any byte stream.
pub struct WriterSink<W: Write> {
    writer: Box<dyn RecordWriter>,
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: Box<dyn RecordWriter>, out: W) -> Self {
        Self { writer, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for WriterSink<W> {
    fn accept(&mut self, item: RecordAndContext) -> Result<()> {
        match item {
            RecordAndContext::Record { record, .. } => self.writer.write(&record, &mut self.out),
            RecordAndContext::EndOfStream(_) => {
                self.writer.finish(&mut self.out)?;
                self.out.flush().context("flush output")
            }
        }
    }
}

/// Keeps every item in memory; used by tests and embedding callers.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub items: Vec<RecordAndContext>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records only, in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<crate::record::Record> {
        self.items.iter().filter_map(|i| i.record().cloned()).collect()
    }
}

impl RecordSink for CollectingSink {
    fn accept(&mut self, item: RecordAndContext) -> Result<()> {
        self.items.push(item);
        Ok(())
    }
}
