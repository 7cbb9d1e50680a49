//! `seqgen`: produce a counter sequence, ignoring input.
//!
//! Generation happens when the input's end of stream arrives. Records go out
//! one at a time through the emitter, which ships full batches as it goes,
//! and the downstream-done signal is checked before each one, so
//! `seqgen --stop 1000000000 then head -n 4` finishes immediately.

use crate::error::UsageError;
use crate::record::{Context, Record, RecordAndContext};
use crate::value::Value;
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use clap::Parser;
use tracing::debug;

/// Flags for `seqgen`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "seqgen",
    about = "Emits a sequence of counter values. Input records are discarded.",
    allow_negative_numbers = true
)]
pub struct SeqgenArgs {
    /// Output field name.
    #[arg(short = 'f', default_value = "i", value_name = "NAME")]
    pub field: String,

    #[arg(long, default_value = "1", value_name = "NUMBER")]
    pub start: String,

    #[arg(long, default_value = "100", value_name = "NUMBER")]
    pub stop: String,

    #[arg(long, default_value = "1", value_name = "NUMBER")]
    pub step: String,
}

impl Default for SeqgenArgs {
    fn default() -> Self {
        Self {
            field: "i".to_string(),
            start: "1".to_string(),
            stop: "100".to_string(),
            step: "1".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Sequence {
    Int { start: i64, stop: i64, step: i64 },
    Float { start: f64, stop: f64, step: f64 },
}

pub struct Seqgen {
    field: String,
    sequence: Sequence,
}

fn number(flag: &str, text: &str) -> Result<Value, UsageError> {
    let v = Value::infer(text);
    if v.is_numeric() {
        Ok(v)
    } else {
        Err(UsageError::invalid(
            "seqgen",
            format!("{flag} must be a number, got \"{text}\""),
        ))
    }
}

impl Seqgen {
    /// # Errors
    /// Non-numeric bounds, or a zero step that would never reach `--stop`.
    pub fn new(args: SeqgenArgs) -> Result<Self, UsageError> {
        let start = number("--start", &args.start)?;
        let stop = number("--stop", &args.stop)?;
        let step = number("--step", &args.step)?;
        let sequence = match (&start, &stop, &step) {
            (Value::Int(start), Value::Int(stop), Value::Int(step)) => Sequence::Int {
                start: *start,
                stop: *stop,
                step: *step,
            },
            _ => Sequence::Float {
                start: start.as_f64().unwrap_or_default(),
                stop: stop.as_f64().unwrap_or_default(),
                step: step.as_f64().unwrap_or_default(),
            },
        };
        let never_ends = match sequence {
            Sequence::Int { start, stop, step } => step == 0 && start != stop,
            Sequence::Float { start, stop, step } => step == 0.0 && start != stop,
        };
        if never_ends {
            return Err(UsageError::invalid(
                "seqgen",
                "step must not be zero unless start equals stop",
            ));
        }
        Ok(Self {
            field: args.field,
            sequence,
        })
    }

    fn generate(
        &self,
        out: &mut Emitter,
        signals: &mut DoneSignals,
        mut context: Context,
    ) -> Result<()> {
        let mut emitted = 0u64;
        let mut emit = |value: Value, out: &mut Emitter| -> Result<bool> {
            if signals.downstream_done() {
                return Ok(false);
            }
            context.update_for_input_record();
            let mut record = Record::with_capacity(1);
            record.put(self.field.as_str(), value);
            out.emit_record(record, context.clone())?;
            emitted += 1;
            Ok(true)
        };
        match self.sequence {
            Sequence::Int { start, stop, step } => {
                let mut i = start;
                while in_range(i, stop, step) && emit(Value::Int(i), out)? {
                    if step == 0 {
                        break;
                    }
                    match i.checked_add(step) {
                        Some(next) => i = next,
                        None => break,
                    }
                }
            }
            Sequence::Float { start, stop, step } => {
                let mut x = start;
                while in_range(x, stop, step) && emit(Value::Float(x), out)? {
                    if step == 0.0 {
                        break;
                    }
                    x += step;
                }
            }
        }
        debug!(emitted, "seqgen: finished");
        Ok(())
    }
}

fn in_range<T: PartialOrd + Default>(value: T, stop: T, step: T) -> bool {
    if step >= T::default() {
        value <= stop
    } else {
        value >= stop
    }
}

impl Verb for Seqgen {
    fn name(&self) -> &'static str {
        "seqgen"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        signals: &mut DoneSignals,
    ) -> Result<()> {
        match item {
            // Input is never used, so upstream may stop right away.
            RecordAndContext::Record { .. } => {
                signals.signal_upstream();
                Ok(())
            }
            RecordAndContext::EndOfStream(context) => {
                let mut start = context.clone();
                start.nr = 0;
                start.fnr = 0;
                self.generate(out, signals, start)?;
                out.emit(RecordAndContext::end_of_stream(context))
            }
        }
    }
}
