// tests/verbs.rs
use anyhow::Result;
use ironmill::chain::{Chain, ChainOptions};
use ironmill::io::memory::VecRecordReader;
use ironmill::io::sink::CollectingSink;
use ironmill::record::{Record, RecordAndContext};
use ironmill::testing::*;
use ironmill::verbs::{VerbSettings, build_verb_chain};

fn run(line: &str, input: Vec<Record>) -> Result<Vec<Record>> {
    let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let chain = Chain::new(build_verb_chain(&words, &VerbSettings::default())?);
    let (items, _) = run_chain(chain, input)?;
    assert_single_end_of_stream(&items);
    Ok(items.into_iter().filter_map(RecordAndContext::into_record).collect())
}

fn numbered(n: i64) -> Vec<Record> {
    RecordSetBuilder::new().add_numbered("i", 1..=n).build()
}

#[test]
fn tac_reverses() -> Result<()> {
    let out = run("tac", numbered(4))?;
    assert_eq!(field_values(&out, "i"), vec!["4", "3", "2", "1"]);
    Ok(())
}

#[test]
fn nothing_drops_everything() -> Result<()> {
    assert!(run("nothing", numbered(10))?.is_empty());
    Ok(())
}

#[test]
fn tail_then_head() -> Result<()> {
    let out = run("tail -n 3 then head -n 2", numbered(10))?;
    assert_eq!(field_values(&out, "i"), vec!["8", "9"]);
    Ok(())
}

#[test]
fn count_after_head() -> Result<()> {
    let out = run("head -n 7 then count", numbered(100))?;
    assert_records_equal(&out, &records(&[&[("count", "7")]]));
    Ok(())
}

#[test]
fn grouped_count_keeps_first_seen_order() -> Result<()> {
    let input = records(&[&[("k", "b")], &[("k", "a")], &[("k", "b")], &[("x", "1")]]);
    let out = run("count -g k", input)?;
    assert_records_equal(
        &out,
        &records(&[&[("k", "b"), ("count", "2")], &[("k", "a"), ("count", "1")]]),
    );
    Ok(())
}

#[test]
fn seqgen_ignores_input_records() -> Result<()> {
    let out = run("seqgen --start 5 --stop 1 --step -2 -f n", numbered(3))?;
    assert_records_equal(
        &out,
        &records(&[&[("n", "5")], &[("n", "3")], &[("n", "1")]]),
    );
    Ok(())
}

#[test]
fn tee_keeps_writing_after_head_is_satisfied() -> Result<()> {
    let dir = TestDir::new()?;
    let path = dir.join("all.dkvp");
    let line = format!("seqgen --stop 20000 then tee {} then head -n 2", path.display());
    let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let mut sink = CollectingSink::new();
    // One record per batch, so head's done signal lands while seqgen is still generating.
    Chain::new(build_verb_chain(&words, &VerbSettings::default())?)
        .with_options(ChainOptions {
            records_per_batch: 1,
            queue_capacity: 1,
            nr_progress_mod: None,
        })
        .run(Box::new(VecRecordReader::new(Vec::new())), &[], &mut sink)?;
    assert_single_end_of_stream(&sink.items);
    assert_eq!(field_values(&sink.records(), "i"), vec!["1", "2"]);
    let written = std::fs::read_to_string(&path)?;
    assert_eq!(written.lines().count(), 20000);
    assert_eq!(written.lines().last(), Some("i=20000"));
    Ok(())
}

#[test]
fn cat_numbers_across_the_stream() -> Result<()> {
    let out = run("cat -N idx", numbered(3))?;
    assert_eq!(field_values(&out, "idx"), vec!["1", "2", "3"]);
    assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["idx", "i"]);
    Ok(())
}
