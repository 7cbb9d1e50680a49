use crate::record::RecordAndContext;
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use clap::Parser;

/// `nothing` takes no flags.
#[derive(Parser, Debug, Clone)]
#[command(name = "nothing", about = "Drops all input records.")]
pub struct NothingArgs {}

/// Forwards only the end-of-stream marker.
pub struct Nothing;

impl Verb for Nothing {
    fn name(&self) -> &'static str {
        "nothing"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        if item.is_end_of_stream() {
            out.emit(item)?;
        }
        Ok(())
    }
}
