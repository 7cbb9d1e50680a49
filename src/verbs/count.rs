use crate::group_map::OrderedGroupMap;
use crate::record::{Record, RecordAndContext};
use crate::value::Value;
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use clap::Parser;

/// Flags for `count`.
#[derive(Parser, Debug, Clone)]
#[command(name = "count", about = "Prints the number of records, optionally by group.")]
pub struct CountArgs {
    /// Comma-separated group-by fields.
    #[arg(short = 'g', value_delimiter = ',', value_name = "FIELDS")]
    pub group_by: Vec<String>,

    /// Name of the output count field.
    #[arg(short = 'o', default_value = "count", value_name = "NAME")]
    pub output_field: String,

    /// With -g, print only the number of distinct groups.
    #[arg(short = 'n')]
    pub groups_only: bool,
}

impl Default for CountArgs {
    fn default() -> Self {
        Self {
            group_by: Vec::new(),
            output_field: "count".to_string(),
            groups_only: false,
        }
    }
}

pub struct Count {
    args: CountArgs,
    total: i64,
    /// Group-by values and the running count, per group.
    groups: OrderedGroupMap<(Vec<Value>, i64)>,
}

impl Count {
    #[must_use]
    pub fn new(args: CountArgs) -> Self {
        Self {
            args,
            total: 0,
            groups: OrderedGroupMap::new(),
        }
    }

    fn results(&mut self) -> Vec<Record> {
        if self.args.group_by.is_empty() {
            let mut r = Record::new();
            r.put(self.args.output_field.as_str(), self.total);
            return vec![r];
        }
        if self.args.groups_only {
            let mut r = Record::new();
            r.put(self.args.output_field.as_str(), self.groups.len() as i64);
            return vec![r];
        }
        std::mem::take(&mut self.groups)
            .into_iter()
            .map(|(_, (values, n))| {
                let mut r: Record = self.args.group_by.iter().cloned().zip(values).collect();
                r.put(self.args.output_field.as_str(), n);
                r
            })
            .collect()
    }
}

impl Verb for Count {
    fn name(&self) -> &'static str {
        "count"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        match item {
            RecordAndContext::Record { record, .. } => {
                if self.args.group_by.is_empty() {
                    self.total += 1;
                } else if let Some(key) = record.selected_values_joined(&self.args.group_by) {
                    let group_by = &self.args.group_by;
                    let entry = self.groups.get_or_insert_with(&key, || {
                        let values = record
                            .selected_values(group_by)
                            .map(|vs| vs.into_iter().cloned().collect())
                            .unwrap_or_default();
                        (values, 0)
                    });
                    entry.1 += 1;
                }
                Ok(())
            }
            RecordAndContext::EndOfStream(ref context) => {
                for record in self.results() {
                    out.emit_record(record, context.clone())?;
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

    fn input() -> Vec<Record> {
        records(&[&[("a", "x")], &[("a", "y")], &[("b", "1")], &[("a", "x")]])
    }

    #[test]
    fn counts_all_records() -> Result<()> {
        let out = run_verb(&mut Count::new(CountArgs::default()), input())?;
        assert_eq!(out, records(&[&[("count", "4")]]));
        Ok(())
    }

    #[test]
    fn counts_per_group_in_first_seen_order() -> Result<()> {
        let mut count = Count::new(CountArgs {
            group_by: vec!["a".into()],
            output_field: "n".into(),
            ..CountArgs::default()
        });
        let out = run_verb(&mut count, input())?;
        assert_eq!(out, records(&[&[("a", "x"), ("n", "2")], &[("a", "y"), ("n", "1")]]));
        Ok(())
    }

    #[test]
    fn counts_distinct_groups() -> Result<()> {
        let mut count = Count::new(CountArgs {
            group_by: vec!["a".into()],
            groups_only: true,
            ..CountArgs::default()
        });
        assert_eq!(run_verb(&mut count, input())?, records(&[&[("count", "2")]]));
        Ok(())
    }
}
