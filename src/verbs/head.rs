use crate::group_map::OrderedGroupMap;
use crate::record::RecordAndContext;
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::Result;
use clap::Parser;
use tracing::debug;

/// Flags for `head`.
#[derive(Parser, Debug, Clone)]
#[command(name = "head", about = "Passes through the first n records.")]
pub struct HeadArgs {
    /// Number of records to pass.
    #[arg(short = 'n', default_value_t = 10, value_name = "COUNT")]
    pub count: u64,

    /// Comma-separated group-by fields; the first n of each group pass.
    #[arg(short = 'g', value_delimiter = ',', value_name = "FIELDS")]
    pub group_by: Vec<String>,
}

impl Default for HeadArgs {
    fn default() -> Self {
        Self {
            count: 10,
            group_by: Vec::new(),
        }
    }
}

/// Ungrouped, it tells upstream to stop once `n` records have passed and
/// then discards the rest. Grouped, any group may still be short of `n`, so
/// it keeps reading and never passes a downstream-done signal upstream.
pub struct Head {
    count: u64,
    group_by: Vec<String>,
    seen: u64,
    per_group: OrderedGroupMap<u64>,
}

impl Head {
    #[must_use]
    pub fn new(args: HeadArgs) -> Self {
        Self {
            count: args.count,
            group_by: args.group_by,
            seen: 0,
            per_group: OrderedGroupMap::new(),
        }
    }

    const fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }
}

impl Verb for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        signals: &mut DoneSignals,
    ) -> Result<()> {
        let RecordAndContext::Record { ref record, .. } = item else {
            return out.emit(item);
        };
        if !self.is_grouped() {
            if self.seen < self.count {
                self.seen += 1;
                out.emit(item)?;
            }
            if self.seen >= self.count && !signals.upstream_signaled() {
                debug!(count = self.count, "head: quota reached, signalling upstream");
                signals.signal_upstream();
            }
            return Ok(());
        }
        let Some(key) = record.selected_values_joined(&self.group_by) else {
            return Ok(());
        };
        let seen = self.per_group.get_or_insert_with(&key, || 0);
        if *seen < self.count {
            *seen += 1;
            out.emit(item)?;
        }
        Ok(())
    }

    fn handle_downstream_done(&mut self, signals: &mut DoneSignals) {
        if !self.is_grouped() {
            signals.relay_default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::builders::records;
    use crate::testing::run_verb;

    #[test]
    fn first_n_per_group() -> Result<()> {
        let mut head = Head::new(HeadArgs {
            count: 1,
            group_by: vec!["a".into()],
        });
        let input = records(&[
            &[("a", "x"), ("i", "1")],
            &[("a", "y"), ("i", "2")],
            &[("a", "x"), ("i", "3")],
        ]);
        let out = run_verb(&mut head, input)?;
        let is: Vec<String> = out.iter().map(|r| r.get("i").unwrap().to_string()).collect();
        assert_eq!(is, vec!["1", "2"]);
        Ok(())
    }

    #[test]
    fn ungrouped_head_signals_upstream_once_quota_is_met() -> Result<()> {
        let (up_tx, up_rx) = crossbeam_channel::bounded(1);
        let (_down_tx, down_rx) = crossbeam_channel::bounded(1);
        let mut signals = DoneSignals::new(down_rx, up_tx);
        let mut head = Head::new(HeadArgs {
            count: 2,
            ..HeadArgs::default()
        });
        let mut out = Emitter::collecting();
        for r in records(&[&[("i", "1")], &[("i", "2")], &[("i", "3")]]) {
            head.transform(
                RecordAndContext::new(r, Default::default()),
                &mut out,
                &mut signals,
            )?;
        }
        assert_eq!(out.len(), 2);
        assert!(up_rx.try_recv().is_ok());
        Ok(())
    }

    #[test]
    fn ungrouped_head_relays_downstream_done() {
        let (up_tx, up_rx) = crossbeam_channel::bounded(1);
        let (down_tx, down_rx) = crossbeam_channel::bounded(1);
        let mut signals = DoneSignals::new(down_rx, up_tx);
        let mut head = Head::new(HeadArgs::default());
        down_tx.send(()).unwrap();
        head.handle_downstream_done(&mut signals);
        assert!(up_rx.try_recv().is_ok());
    }

    #[test]
    fn grouped_head_absorbs_downstream_done() {
        let (up_tx, up_rx) = crossbeam_channel::bounded(1);
        let (down_tx, down_rx) = crossbeam_channel::bounded(1);
        let mut signals = DoneSignals::new(down_rx, up_tx);
        let mut head = Head::new(HeadArgs {
            count: 2,
            group_by: vec!["a".into()],
        });
        down_tx.send(()).unwrap();
        head.handle_downstream_done(&mut signals);
        assert!(up_rx.try_recv().is_err());
    }
}
