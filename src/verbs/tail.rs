use crate::group_map::OrderedGroupMap;
use crate::record::{Context, Record, RecordAndContext};
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use clap::Parser;
use std::collections::VecDeque;

/// Flags for `tail`.
#[derive(Parser, Debug, Clone)]
#[command(name = "tail", about = "Passes through the last n records.")]
pub struct TailArgs {
    /// Number of records to pass.
    #[arg(short = 'n', default_value_t = 10, value_name = "COUNT")]
    pub count: usize,

    /// Comma-separated group-by fields; the last n of each group pass.
    #[arg(short = 'g', value_delimiter = ',', value_name = "FIELDS")]
    pub group_by: Vec<String>,
}

/// Buffers the last `n` records of each group; emits groups in first-seen
/// order at end of stream.
pub struct Tail {
    count: usize,
    group_by: Vec<String>,
    groups: OrderedGroupMap<VecDeque<(Record, Context)>>,
}

impl Tail {
    #[must_use]
    pub fn new(args: TailArgs) -> Self {
        Self {
            count: args.count,
            group_by: args.group_by,
            groups: OrderedGroupMap::new(),
        }
    }
}

impl Verb for Tail {
    fn name(&self) -> &'static str {
        "tail"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        match item {
            RecordAndContext::Record { record, context } => {
                let Some(key) = record.selected_values_joined(&self.group_by) else {
                    return Ok(());
                };
                let count = self.count;
                let kept = self.groups.get_or_insert_with(&key, VecDeque::new);
                kept.push_back((record, context));
                if kept.len() > count {
                    kept.pop_front();
                }
                Ok(())
            }
            RecordAndContext::EndOfStream(_) => {
                for (_, kept) in std::mem::take(&mut self.groups) {
                    for (record, context) in kept {
                        out.emit_record(record, context)?;
                    }
                }
                out.emit(item)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::builders::records;
    use crate::testing::run_verb;

    #[test]
    fn last_n_per_group_in_first_seen_order() -> Result<()> {
        let mut tail = Tail::new(TailArgs {
            count: 1,
            group_by: vec!["a".into()],
        });
        let input = records(&[
            &[("a", "x"), ("i", "1")],
            &[("a", "y"), ("i", "2")],
            &[("a", "x"), ("i", "3")],
        ]);
        let out = run_verb(&mut tail, input)?;
        let is: Vec<String> = out.iter().map(|r| r.get("i").unwrap().to_string()).collect();
        assert_eq!(is, vec!["3", "2"]);
        Ok(())
    }
}
