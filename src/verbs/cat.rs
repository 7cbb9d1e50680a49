use crate::group_map::OrderedGroupMap;
use crate::record::RecordAndContext;
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use clap::Parser;

/// Flags for `cat`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "cat", about = "Passes records through unchanged.")]
pub struct CatArgs {
    /// Prepend a 1-based counter field.
    #[arg(short = 'n')]
    pub number: bool,

    /// Prepend a counter field with this name (implies -n).
    #[arg(short = 'N', value_name = "NAME")]
    pub counter_name: Option<String>,

    /// Comma-separated group-by fields; counters run per group and records
    /// missing any of them are dropped.
    #[arg(short = 'g', value_delimiter = ',', value_name = "FIELDS")]
    pub group_by: Vec<String>,
}

pub struct Cat {
    counter_name: Option<String>,
    group_by: Vec<String>,
    counters: OrderedGroupMap<i64>,
}

impl Cat {
    #[must_use]
    pub fn new(args: CatArgs) -> Self {
        let counter_name = args
            .counter_name
            .or_else(|| args.number.then(|| "n".to_string()));
        Self {
            counter_name,
            group_by: args.group_by,
            counters: OrderedGroupMap::new(),
        }
    }
}

impl Verb for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        let RecordAndContext::Record { mut record, context } = item else {
            return out.emit(item);
        };
        let Some(key) = record.selected_values_joined(&self.group_by) else {
            return Ok(());
        };
        if let Some(name) = &self.counter_name {
            let n = self.counters.get_or_insert_with(&key, || 0);
            *n += 1;
            record.put_at_front(name.as_str(), *n);
        }
        out.emit_record(record, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_verb;
    use crate::testing::builders::records;

    #[test]
    fn numbers_per_group() -> Result<()> {
        let mut cat = Cat::new(CatArgs {
            number: true,
            group_by: vec!["a".into()],
            ..CatArgs::default()
        });
        let input = records(&[&[("a", "x")], &[("a", "y")], &[("b", "z")], &[("a", "x")]]);
        let out = run_verb(&mut cat, input)?;
        let ns: Vec<String> = out.iter().map(|r| r.get("n").unwrap().to_string()).collect();
        assert_eq!(ns, vec!["1", "1", "2"]);
        assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["n", "a"]);
        Ok(())
    }
}
