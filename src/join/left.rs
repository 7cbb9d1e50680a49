//! The join's private left-file sub-pipeline.
//!
//! A dedicated record reader runs on its own thread and feeds a bounded
//! queue owned by this source alone. The join pulls records one at a time;
//! the bounded queue is what keeps the sorted join's memory flat.

use super::bucket::LeftRecord;
use super::options::JoinOptions;
use crate::error::ChainError;
use crate::io::create_record_reader;
use crate::record::{Context, RecordAndContext, Separators};
use crate::verb::Batch;
use anyhow::{Context as _, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::collections::VecDeque;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

const LEFT_QUEUE_CAPACITY: usize = 2;

pub(crate) struct LeftFileSource {
    file: String,
    input: Receiver<Batch>,
    done: Sender<()>,
    handle: Option<JoinHandle<Result<()>>>,
    pending: VecDeque<RecordAndContext>,
    exhausted: bool,
    count: u64,
}

impl LeftFileSource {
    /// Start reading the left file in the background.
    pub(crate) fn spawn(options: &JoinOptions) -> Result<Self> {
        let mut reader = create_record_reader(&options.left_reader)?;
        let file = options.left_file.clone();
        let files = vec![file.clone()];
        let context = Context::new(options.left_reader.apply_to(Separators::default()));
        let (data_tx, data_rx) = bounded(LEFT_QUEUE_CAPACITY);
        let (done_tx, done_rx) = bounded(1);
        debug!(file = %file, format = %options.left_reader.format, "join: opening left file");
        let handle = thread::Builder::new()
            .name("ironmill-join-left".to_string())
            .spawn(move || reader.read(&files, context, &data_tx, &done_rx))
            .context("spawn left-file reader thread")?;
        Ok(Self {
            file,
            input: data_rx,
            done: done_tx,
            handle: Some(handle),
            pending: VecDeque::new(),
            exhausted: false,
            count: 0,
        })
    }

    /// The next left record, or `None` once the left file is exhausted.
    pub(crate) fn next(&mut self) -> Result<Option<LeftRecord>> {
        loop {
            if self.exhausted {
                return Ok(None);
            }
            let Some(item) = self.pending.pop_front() else {
                match self.input.recv() {
                    Ok(batch) => self.pending.extend(batch),
                    Err(_) => return Err(self.reader_failure()),
                }
                continue;
            };
            match item {
                RecordAndContext::Record { record, context } => {
                    self.count += 1;
                    return Ok(Some(LeftRecord { record, context }));
                }
                RecordAndContext::EndOfStream(_) => {
                    self.exhausted = true;
                    trace!(file = %self.file, records = self.count, "join: left file exhausted");
                    self.join_reader()?;
                }
            }
        }
    }

    /// The queue closed without end of stream; fetch the reader's own error.
    fn reader_failure(&mut self) -> anyhow::Error {
        self.exhausted = true;
        match self.join_reader() {
            Err(e) => e,
            Ok(()) => ChainError::Invariant(format!(
                "left-file reader for {} stopped without end of stream",
                self.file
            ))
            .into(),
        }
    }

    fn join_reader(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(result) => result.with_context(|| format!("left file {}", self.file)),
            Err(_) => Err(anyhow!("left-file reader for {} panicked", self.file)),
        }
    }
}

impl Drop for LeftFileSource {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        self.done.try_send(()).ok();
        // Unblock the reader so it can see the signal and exit.
        while self.input.recv().is_ok() {}
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}
