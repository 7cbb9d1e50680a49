use crate::record::{Context, Record, RecordAndContext};
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use clap::Parser;

/// `tac` takes no flags.
#[derive(Parser, Debug, Clone)]
#[command(name = "tac", about = "Prints records in reverse order.")]
pub struct TacArgs {}

#[derive(Default)]
pub struct Tac {
    held: Vec<(Record, Context)>,
}

impl Verb for Tac {
    fn name(&self) -> &'static str {
        "tac"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        match item {
            RecordAndContext::Record { record, context } => {
                self.held.push((record, context));
                Ok(())
            }
            RecordAndContext::EndOfStream(_) => {
                while let Some((record, context)) = self.held.pop() {
                    out.emit_record(record, context)?;
                }
                out.emit(item)
            }
        }
    }
}
