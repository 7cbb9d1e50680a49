// tests/chain.rs
use anyhow::Result;
use ironmill::chain::{Chain, ChainOptions};
use ironmill::error::ChainError;
use ironmill::io::memory::VecRecordReader;
use ironmill::io::sink::CollectingSink;
use ironmill::record::RecordAndContext;
use ironmill::testing::*;
use ironmill::verb::{DoneSignals, Emitter, Verb};
use ironmill::verbs::{VerbSettings, build_verb_chain};
use std::time::{Duration, Instant};

fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn chain(line: &str) -> Chain {
    Chain::new(build_verb_chain(&words(line), &VerbSettings::default()).unwrap())
}

fn small_batches() -> ChainOptions {
    ChainOptions {
        records_per_batch: 3,
        queue_capacity: 1,
        nr_progress_mod: Some(100),
    }
}

#[test]
fn identity_chain_preserves_order_across_batches() -> Result<()> {
    let input = RecordSetBuilder::new().add_numbered("i", 1..=1000).build();
    let mut sink = CollectingSink::new();
    let summary = chain("cat then cat then cat")
        .with_options(small_batches())
        .run(
            Box::new(VecRecordReader::new(input.clone()).with_records_per_batch(7)),
            &[],
            &mut sink,
        )?;
    assert_single_end_of_stream(&sink.items);
    assert_records_equal(&sink.records(), &input);
    assert_eq!(summary.records_read, 1000);
    assert_eq!(summary.records_written, 1000);
    assert!(summary.end_of_stream_seen);
    Ok(())
}

#[test]
fn empty_input_still_ends_the_stream() -> Result<()> {
    let (items, summary) = run_chain(chain("cat then tac then tail -n 2"), Vec::new())?;
    assert_eq!(items.len(), 1);
    assert_single_end_of_stream(&items);
    assert_eq!(summary.records_written, 0);
    assert!(summary.end_of_stream_seen);
    Ok(())
}

#[test]
fn zero_verb_chain_copies_reader_to_sink() -> Result<()> {
    let input = records(&[&[("a", "1")], &[("a", "2")]]);
    let (items, summary) = run_chain(Chain::new(Vec::new()), input.clone())?;
    assert_single_end_of_stream(&items);
    let out: Vec<_> = items.into_iter().filter_map(RecordAndContext::into_record).collect();
    assert_records_equal(&out, &input);
    assert_eq!(summary.records_read, 2);
    Ok(())
}

#[test]
fn contexts_number_records_from_one() -> Result<()> {
    let input = RecordSetBuilder::new().add_numbered("i", 1..=5).build();
    let (items, _) = run_chain(chain("cat"), input)?;
    let nrs: Vec<u64> = items
        .iter()
        .filter(|item| item.record().is_some())
        .map(|item| item.context().nr)
        .collect();
    assert_eq!(nrs, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn head_stops_an_unbounded_generator() -> Result<()> {
    let started = Instant::now();
    let (items, _) = run_chain(chain("seqgen --stop 1000000000 then head -n 10"), Vec::new())?;
    assert_single_end_of_stream(&items);
    let out: Vec<_> = items.into_iter().filter_map(RecordAndContext::into_record).collect();
    assert_eq!(
        field_values(&out, "i"),
        (1..=10).map(|i| i.to_string()).collect::<Vec<_>>()
    );
    assert!(started.elapsed() < Duration::from_secs(30));
    Ok(())
}

#[test]
fn head_stops_the_reader_early() -> Result<()> {
    let input = RecordSetBuilder::new().add_numbered("i", 1..=100_000).build();
    let mut sink = CollectingSink::new();
    let summary = chain("cat then head -n 5")
        .with_options(ChainOptions {
            records_per_batch: 10,
            queue_capacity: 2,
            nr_progress_mod: None,
        })
        .run(
            Box::new(VecRecordReader::new(input).with_records_per_batch(10)),
            &[],
            &mut sink,
        )?;
    assert_eq!(summary.records_written, 5);
    assert!(summary.records_read < 100_000, "read {}", summary.records_read);
    Ok(())
}

#[test]
fn grouped_head_sees_the_whole_stream() -> Result<()> {
    // A new group shows up only in the very last record.
    let mut input = RecordSetBuilder::new().add_numbered("i", 1..=20_000).build();
    for r in &mut input {
        r.put("g", "a");
    }
    input.push(records(&[&[("g", "b"), ("i", "last")]]).remove(0));
    let mut sink = CollectingSink::new();
    let summary = chain("cat then head -n 1 -g g then head -n 1")
        .with_options(ChainOptions {
            records_per_batch: 1,
            queue_capacity: 1,
            nr_progress_mod: None,
        })
        .run(
            Box::new(VecRecordReader::new(input).with_records_per_batch(1)),
            &[],
            &mut sink,
        )?;
    assert_single_end_of_stream(&sink.items);
    assert_eq!(field_values(&sink.records(), "i"), vec!["1"]);
    assert_eq!(summary.records_read, 20_001);
    Ok(())
}

/// Drops everything, including end of stream.
struct Swallow;

impl Verb for Swallow {
    fn name(&self) -> &'static str {
        "swallow"
    }

    fn transform(
        &mut self,
        _item: RecordAndContext,
        _out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        Ok(())
    }
}

/// Panics on the first record.
struct Explode;

impl Verb for Explode {
    fn name(&self) -> &'static str {
        "explode"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        if item.record().is_some() {
            panic!("boom");
        }
        out.emit(item)
    }
}

#[test]
fn missing_end_of_stream_is_an_invariant_error() {
    let err = run_chain(
        Chain::new(vec![Box::new(Swallow)]),
        records(&[&[("a", "1")]]),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChainError>(),
        Some(ChainError::Invariant(_))
    ));
}

#[test]
fn a_panicking_stage_is_reported_not_its_neighbours() {
    let input = RecordSetBuilder::new().add_numbered("i", 1..=5000).build();
    let verbs: Vec<Box<dyn Verb>> = vec![
        Box::new(ironmill::verbs::cat::Cat::new(Default::default())),
        Box::new(Explode),
        Box::new(ironmill::verbs::tac::Tac::default()),
    ];
    let err = run_chain(Chain::new(verbs).with_options(small_batches()), input).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChainError>(),
        Some(ChainError::Panicked { stage: 1, .. })
    ));
}

#[test]
fn missing_left_file_is_the_reported_cause() {
    let err = run_chain(
        chain("cat then join -j id -f /nonexistent/ironmill/left.dkvp then head -n 1"),
        records(&[&[("id", "1")]]),
    )
    .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("left file"), "{message}");
    assert!(message.contains("/nonexistent/ironmill/left.dkvp"), "{message}");
    assert!(err.downcast_ref::<ChainError>().is_none_or(|e| !e.is_secondary()));
}
