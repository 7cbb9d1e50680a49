//! The verb contract: one processing stage of a chain.
//!
//! A verb receives one item at a time (a record or the end-of-stream marker)
//! and appends zero or more items to an [`Emitter`]. On end of stream it must
//! flush whatever it buffered and then emit exactly one end-of-stream marker.
//!
//! Early termination travels *upstream* through [`DoneSignals`]. Each stage
//! can poll whether the stage below it has stopped caring about input, and can
//! tell the stage above it the same. The default is a non-blocking relay;
//! verbs with an obligation to see the whole stream override
//! [`Verb::handle_downstream_done`] to absorb the signal instead.

use crate::error::ChainError;
use crate::record::{Context, Record, RecordAndContext};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};

/// Items travel between stages in batches to amortise queue traffic.
pub type Batch = Vec<RecordAndContext>;

/// Default number of items per queued batch.
pub const DEFAULT_RECORDS_PER_BATCH: usize = 500;

/// One processing stage.
pub trait Verb: Send {
    /// Verb name as typed on the command line.
    fn name(&self) -> &'static str;

    /// Consume one record or the end-of-stream marker.
    ///
    /// # Errors
    /// Any error aborts the whole run.
    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        signals: &mut DoneSignals,
    ) -> Result<()>;

    /// Called before each record. The default relays a downstream-done signal
    /// one stage further upstream.
    fn handle_downstream_done(&mut self, signals: &mut DoneSignals) {
        signals.relay_default();
    }
}

/// The pair of advisory early-termination links owned by one stage.
///
/// `downstream` is read from the next stage; `upstream` is written towards
/// the previous stage (or the record reader). Both are polled and written
/// without blocking. Once observed, a downstream-done signal stays latched.
#[derive(Debug, Default)]
pub struct DoneSignals {
    downstream: Option<Receiver<()>>,
    upstream: Option<Sender<()>>,
    downstream_done: bool,
    upstream_signaled: bool,
}

impl DoneSignals {
    #[must_use]
    pub fn new(downstream: Receiver<()>, upstream: Sender<()>) -> Self {
        Self {
            downstream: Some(downstream),
            upstream: Some(upstream),
            downstream_done: false,
            upstream_signaled: false,
        }
    }

    /// Links to nowhere; for running a verb outside a chain.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Has the next stage said it will ignore further input?
    pub fn downstream_done(&mut self) -> bool {
        if !self.downstream_done
            && let Some(rx) = &self.downstream
            && rx.try_recv().is_ok()
        {
            self.downstream_done = true;
        }
        self.downstream_done
    }

    /// Tell the previous stage we will ignore further input. Idempotent.
    pub fn signal_upstream(&mut self) {
        if self.upstream_signaled {
            return;
        }
        self.upstream_signaled = true;
        // Full means already signaled; disconnected means nobody is listening.
        if let Some(tx) = &self.upstream {
            tx.try_send(()).ok();
        }
    }

    /// Pass a downstream-done signal through to the previous stage.
    pub fn relay_default(&mut self) {
        if self.downstream_done() {
            self.signal_upstream();
        }
    }

    #[must_use]
    pub const fn upstream_signaled(&self) -> bool {
        self.upstream_signaled
    }
}

/// The caller-supplied output sequence a verb appends to.
///
/// Inside a chain it is connected to the next stage's queue and ships a batch
/// whenever `records_per_batch` items accumulate, so long-running generators
/// stream instead of buffering. Outside a chain it simply collects.
pub struct Emitter {
    buffer: Batch,
    sink: Option<Sender<Batch>>,
    records_per_batch: usize,
    label: (usize, String),
    ended: bool,
}

impl Emitter {
    /// An emitter that keeps everything in memory.
    #[must_use]
    pub fn collecting() -> Self {
        Self {
            buffer: Vec::new(),
            sink: None,
            records_per_batch: usize::MAX,
            label: (0, String::new()),
            ended: false,
        }
    }

    pub(crate) fn connected(
        sink: Sender<Batch>,
        records_per_batch: usize,
        stage: usize,
        verb: &str,
    ) -> Self {
        Self {
            buffer: Vec::with_capacity(records_per_batch.min(4096)),
            sink: Some(sink),
            records_per_batch: records_per_batch.max(1),
            label: (stage, verb.to_string()),
            ended: false,
        }
    }

    /// Append one item.
    ///
    /// # Errors
    /// Fails if anything follows the end-of-stream marker, or if the next
    /// stage has gone away.
    pub fn emit(&mut self, item: RecordAndContext) -> Result<()> {
        if self.ended {
            return Err(ChainError::Invariant(format!(
                "stage {} ({}) emitted after end of stream",
                self.label.0, self.label.1
            ))
            .into());
        }
        self.ended = item.is_end_of_stream();
        self.buffer.push(item);
        if self.buffer.len() >= self.records_per_batch {
            self.flush()?;
        }
        Ok(())
    }

    pub fn emit_record(&mut self, record: Record, context: Context) -> Result<()> {
        self.emit(RecordAndContext::new(record, context))
    }

    /// Ship buffered items to the next stage now.
    ///
    /// # Errors
    /// Fails if the next stage has gone away.
    pub fn flush(&mut self) -> Result<()> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.buffer);
        sink.send(batch).map_err(|_| ChainError::Disconnected {
            stage: self.label.0,
            verb: self.label.1.clone(),
        })?;
        Ok(())
    }

    #[must_use]
    pub const fn has_ended(&self) -> bool {
        self.ended
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Take what a collecting emitter has gathered.
    #[must_use]
    pub fn into_items(self) -> Batch {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn relay_passes_signal_upstream_once() {
        let (down_tx, down_rx) = bounded(1);
        let (up_tx, up_rx) = bounded(1);
        let mut signals = DoneSignals::new(down_rx, up_tx);

        signals.relay_default();
        assert!(up_rx.try_recv().is_err());

        down_tx.send(()).unwrap();
        signals.relay_default();
        signals.relay_default();
        assert!(up_rx.try_recv().is_ok());
        assert!(up_rx.try_recv().is_err());
        assert!(signals.downstream_done());
    }

    #[test]
    fn emitter_rejects_records_after_end_of_stream() {
        let mut out = Emitter::collecting();
        out.emit(RecordAndContext::end_of_stream(Context::default()))
            .unwrap();
        let err = out
            .emit_record(Record::new(), Context::default())
            .unwrap_err();
        assert!(err.to_string().contains("after end of stream"));
    }

    #[test]
    fn connected_emitter_ships_full_batches() {
        let (tx, rx) = bounded(8);
        let mut out = Emitter::connected(tx, 2, 1, "cat");
        for _ in 0..5 {
            out.emit_record(Record::new(), Context::default()).unwrap();
        }
        assert_eq!(rx.try_recv().unwrap().len(), 2);
        assert_eq!(rx.try_recv().unwrap().len(), 2);
        assert!(rx.try_recv().is_err());
        out.flush().unwrap();
        assert_eq!(rx.try_recv().unwrap().len(), 1);
    }
}
