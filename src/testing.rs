//! Testing utilities for verbs and chains.
//!
//! - **Assertions**: compare record streams, check end-of-stream placement
//! - **Builders**: write records as string pairs
//! - **Fixtures**: small left/right datasets for join scenarios
//! - **Mock I/O**: temporary directories holding input files
//!
//! # Quick Start
//!
//! ```
//! use ironmill::testing::*;
//! use ironmill::verbs::head::{Head, HeadArgs};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut head = Head::new(HeadArgs { count: 1, ..HeadArgs::default() });
//! let out = run_verb(&mut head, records(&[&[("a", "1")], &[("a", "2")]]))?;
//! assert_records_equal(&out, &records(&[&[("a", "1")]]));
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mock_io;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use mock_io::*;

use crate::chain::{Chain, RunSummary};
use crate::io::memory::VecRecordReader;
use crate::io::sink::CollectingSink;
use crate::record::{Context, Record, RecordAndContext};
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;

/// Feed `input` and then one end of stream through a lone verb.
///
/// Contexts count records the way a reader would. Downstream-done signals
/// never arrive.
///
/// # Errors
/// Whatever the verb returns.
pub fn run_verb_items(verb: &mut dyn Verb, input: Vec<Record>) -> Result<Vec<RecordAndContext>> {
    let mut signals = DoneSignals::detached();
    let mut out = Emitter::collecting();
    let mut context = Context::default();
    context.update_for_start_of_file("(memory)");
    for record in input {
        context.update_for_input_record();
        verb.transform(RecordAndContext::new(record, context.clone()), &mut out, &mut signals)?;
    }
    verb.transform(RecordAndContext::end_of_stream(context), &mut out, &mut signals)?;
    Ok(out.into_items())
}

/// [`run_verb_items`], keeping only the records.
///
/// # Errors
/// Whatever the verb returns.
///
/// # Panics
/// The verb did not finish with exactly one end of stream.
pub fn run_verb(verb: &mut dyn Verb, input: Vec<Record>) -> Result<Vec<Record>> {
    let items = run_verb_items(verb, input)?;
    assert_single_end_of_stream(&items);
    Ok(items.into_iter().filter_map(RecordAndContext::into_record).collect())
}

/// Run a whole chain over in-memory records and collect what reaches the end.
///
/// # Errors
/// The chain's run error.
pub fn run_chain(
    chain: Chain,
    input: Vec<Record>,
) -> Result<(Vec<RecordAndContext>, RunSummary)> {
    let mut sink = CollectingSink::new();
    let summary = chain.run(Box::new(VecRecordReader::new(input)), &[], &mut sink)?;
    Ok((sink.items, summary))
}
