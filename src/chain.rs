//! The chain driver: runs a record reader and a sequence of verbs as
//! concurrent stages.
//!
//! # Topology
//! ```text
//!  reader ──data──▶ stage 0 ──data──▶ stage 1 ── … ──data──▶ sink (caller's thread)
//!         ◀─done───         ◀─done───
//! ```
//! Every boundary carries a bounded data queue of [`Batch`]es flowing
//! downstream and a bounded(1) done queue flowing upstream. Stages run on
//! named scoped threads; the sink runs on the calling thread.
//!
//! # Termination
//! The run ends when the sink has seen the end-of-stream marker and every
//! stage has returned. If any participant fails, its queues are dropped,
//! which unblocks its neighbours with disconnect errors; the driver then
//! reports the first error that is not merely such a disconnect.

use crate::error::ChainError;
use crate::io::RecordReader;
use crate::io::sink::RecordSink;
use crate::record::{Context, RecordAndContext};
use crate::verb::{Batch, DEFAULT_RECORDS_PER_BATCH, DoneSignals, Emitter, Verb};
use anyhow::{Context as _, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use serde::{Deserialize, Serialize};
use std::thread;
use tracing::{debug, info, trace};

/// Tuning knobs for one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainOptions {
    /// Items per queued batch.
    pub records_per_batch: usize,
    /// Batches each data queue holds before its producer blocks.
    pub queue_capacity: usize,
    /// Log an `info` event every this many input records.
    pub nr_progress_mod: Option<u64>,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            records_per_batch: DEFAULT_RECORDS_PER_BATCH,
            queue_capacity: 4,
            nr_progress_mod: None,
        }
    }
}

/// What a completed run saw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records the first stage (or the sink, for an empty chain) received.
    pub records_read: u64,
    /// Records delivered to the sink.
    pub records_written: u64,
    pub end_of_stream_seen: bool,
}

/// An ordered sequence of verbs, ready to run once.
pub struct Chain {
    verbs: Vec<Box<dyn Verb>>,
    options: ChainOptions,
    context: Context,
}

impl Chain {
    /// An empty list is valid: records go straight from reader to sink.
    #[must_use]
    pub fn new(verbs: Vec<Box<dyn Verb>>) -> Self {
        Self {
            verbs,
            options: ChainOptions::default(),
            context: Context::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ChainOptions) -> Self {
        self.options = options;
        self
    }

    /// Context the reader starts from, typically carrying the separators.
    #[must_use]
    pub fn with_initial_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    #[must_use]
    pub fn verb_names(&self) -> Vec<&'static str> {
        self.verbs.iter().map(|v| v.name()).collect()
    }

    /// Run the chain to completion.
    ///
    /// # Errors
    /// The root-cause error of whichever participant failed first: reader
    /// I/O, a verb, the sink, or a broken stage invariant.
    pub fn run(
        self,
        mut reader: Box<dyn RecordReader>,
        files: &[String],
        sink: &mut dyn RecordSink,
    ) -> Result<RunSummary> {
        let Self {
            verbs,
            options,
            context,
        } = self;
        let n = verbs.len();
        let capacity = options.queue_capacity.max(1);
        debug!(
            stages = n,
            capacity,
            batch = options.records_per_batch,
            "chain: starting"
        );

        // Boundary k feeds stage k (the sink when k == n).
        let mut data_tx: Vec<Option<Sender<Batch>>> = Vec::with_capacity(n + 1);
        let mut data_rx: Vec<Option<Receiver<Batch>>> = Vec::with_capacity(n + 1);
        let mut done_tx: Vec<Option<Sender<()>>> = Vec::with_capacity(n + 1);
        let mut done_rx: Vec<Option<Receiver<()>>> = Vec::with_capacity(n + 1);
        for _ in 0..=n {
            let (tx, rx) = bounded(capacity);
            data_tx.push(Some(tx));
            data_rx.push(Some(rx));
            let (tx, rx) = bounded(1);
            done_tx.push(Some(tx));
            done_rx.push(Some(rx));
        }
        // The sink never asks for early termination.
        done_tx[n] = None;

        thread::scope(move |scope| -> Result<RunSummary> {
            let reader_out = take(&mut data_tx, 0)?;
            let reader_done = take(&mut done_rx, 0)?;
            let reader_handle = thread::Builder::new()
                .name("ironmill-reader".to_string())
                .spawn_scoped(scope, move || {
                    reader.read(files, context, &reader_out, &reader_done)
                })
                .context("spawn reader thread")?;

            let mut stage_handles = Vec::with_capacity(n);
            for (i, verb) in verbs.into_iter().enumerate() {
                let name = verb.name();
                let input = take(&mut data_rx, i)?;
                let output = take(&mut data_tx, i + 1)?;
                let signals =
                    DoneSignals::new(take(&mut done_rx, i + 1)?, take(&mut done_tx, i)?);
                let emitter = Emitter::connected(output, options.records_per_batch, i, name);
                let progress = if i == 0 { options.nr_progress_mod } else { None };
                let handle = thread::Builder::new()
                    .name(format!("ironmill-{i}-{name}"))
                    .spawn_scoped(scope, move || {
                        run_stage(i, verb, &input, emitter, signals, progress)
                    })
                    .with_context(|| format!("spawn thread for stage {i} ({name})"))?;
                stage_handles.push((i, name, handle));
            }

            let final_rx = take(&mut data_rx, n)?;
            let progress = if n == 0 { options.nr_progress_mod } else { None };
            let sink_result = drain_into_sink(&final_rx, sink, progress);
            drop(final_rx);

            let mut errors = Vec::new();
            match reader_handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e.context("record reader")),
                Err(_) => errors.push(ChainError::ReaderPanicked.into()),
            }
            let mut records_read = None;
            for (i, name, handle) in stage_handles {
                match handle.join() {
                    Ok(Ok(stats)) => {
                        debug!(
                            stage = i,
                            verb = name,
                            records_in = stats.records_in,
                            "chain: stage finished"
                        );
                        if i == 0 {
                            records_read = Some(stats.records_in);
                        }
                    }
                    Ok(Err(e)) => errors.push(e.context(name)),
                    Err(_) => errors.push(
                        ChainError::Panicked {
                            stage: i,
                            verb: name.to_string(),
                        }
                        .into(),
                    ),
                }
            }
            let summary = match sink_result {
                Ok(summary) => summary,
                Err(e) => {
                    errors.push(e.context("output"));
                    RunSummary::default()
                }
            };
            if let Some(e) = root_cause(errors) {
                return Err(e);
            }
            if !summary.end_of_stream_seen {
                return Err(ChainError::Invariant(
                    "output ended without an end-of-stream marker".into(),
                )
                .into());
            }
            let summary = RunSummary {
                records_read: records_read.unwrap_or(summary.records_written),
                ..summary
            };
            debug!(?summary, "chain: finished");
            Ok(summary)
        })
    }
}

fn take<T>(slots: &mut [Option<T>], i: usize) -> Result<T> {
    slots
        .get_mut(i)
        .and_then(Option::take)
        .ok_or_else(|| ChainError::Invariant(format!("queue endpoint {i} already taken")).into())
}

#[derive(Debug, Default)]
struct StageStats {
    records_in: u64,
}

fn run_stage(
    index: usize,
    mut verb: Box<dyn Verb>,
    input: &Receiver<Batch>,
    mut out: Emitter,
    mut signals: DoneSignals,
    progress: Option<u64>,
) -> Result<StageStats> {
    let name = verb.name();
    trace!(stage = index, verb = name, "stage: started");
    let mut stats = StageStats::default();
    loop {
        let batch = input.recv().map_err(|_| ChainError::Disconnected {
            stage: index,
            verb: name.to_string(),
        })?;
        for item in batch {
            match item {
                RecordAndContext::Record { ref context, .. } => {
                    stats.records_in += 1;
                    report_progress(context, progress);
                    verb.handle_downstream_done(&mut signals);
                    verb.transform(item, &mut out, &mut signals)?;
                }
                RecordAndContext::EndOfStream(_) => {
                    verb.transform(item, &mut out, &mut signals)?;
                    if !out.has_ended() {
                        return Err(ChainError::Invariant(format!(
                            "stage {index} ({name}) did not forward end of stream"
                        ))
                        .into());
                    }
                    out.flush()?;
                    return Ok(stats);
                }
            }
        }
        out.flush()?;
    }
}

fn drain_into_sink(
    input: &Receiver<Batch>,
    sink: &mut dyn RecordSink,
    progress: Option<u64>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for batch in input {
        for item in batch {
            if summary.end_of_stream_seen {
                return Err(
                    ChainError::Invariant("item arrived after end of stream".into()).into(),
                );
            }
            match &item {
                RecordAndContext::Record { context, .. } => {
                    summary.records_written += 1;
                    report_progress(context, progress);
                }
                RecordAndContext::EndOfStream(_) => summary.end_of_stream_seen = true,
            }
            sink.accept(item)?;
        }
    }
    Ok(summary)
}

fn report_progress(context: &Context, every: Option<u64>) {
    if let Some(every) = every
        && every > 0
        && context.nr % every == 0
    {
        info!(nr = context.nr, file = %context.filename, "progress");
    }
}

/// Prefer the first error that is not a neighbour's disconnect.
fn root_cause(errors: Vec<anyhow::Error>) -> Option<anyhow::Error> {
    let is_secondary = |e: &anyhow::Error| {
        e.downcast_ref::<ChainError>()
            .is_some_and(ChainError::is_secondary)
    };
    let primary = errors.iter().position(|e| !is_secondary(e)).unwrap_or(0);
    errors.into_iter().nth(primary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn root_cause_skips_disconnects() {
        let errors = vec![
            anyhow::Error::from(ChainError::Disconnected {
                stage: 0,
                verb: "reader".into(),
            })
            .context("record reader"),
            anyhow!("left file missing").context("join"),
        ];
        let e = root_cause(errors).unwrap();
        assert_eq!(e.to_string(), "join");
        assert_eq!(e.root_cause().to_string(), "left file missing");
    }

    #[test]
    fn root_cause_falls_back_to_first() {
        let errors = vec![anyhow::Error::from(ChainError::Disconnected {
            stage: 2,
            verb: "cat".into(),
        })];
        assert!(root_cause(errors).is_some());
        assert!(root_cause(Vec::new()).is_none());
    }
}
