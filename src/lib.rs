//! # Ironmill
//!
//! A **streaming record-processing engine**. Records (ordered maps of field
//! name to value) flow from a reader through a chain of verbs to a writer,
//! with every verb running concurrently on its own thread.
//!
//! ## Key Features
//!
//! - **Chained verbs** - `head -n 4 then join -j id -f left.csv then count`
//! - **Backpressure-aware early exit** - a satisfied `head` tells everything
//!   upstream to stop, including the reader
//! - **Two joins** - an in-memory hash join for any input order and a
//!   doubly-streaming merge join for sorted inputs
//! - **Formats** - DKVP, NIDX, CSV, and JSON Lines, with transparent
//!   gzip/zstd/bzip2/xz input
//!
//! ## Quick Start
//!
//! ```
//! use ironmill::chain::Chain;
//! use ironmill::io::memory::VecRecordReader;
//! use ironmill::io::sink::CollectingSink;
//! use ironmill::testing::records;
//! use ironmill::verbs::head::{Head, HeadArgs};
//!
//! # fn main() -> anyhow::Result<()> {
//! let input = records(&[&[("a", "1")], &[("a", "2")], &[("a", "3")]]);
//! let chain = Chain::new(vec![Box::new(Head::new(HeadArgs {
//!     count: 2,
//!     ..HeadArgs::default()
//! }))]);
//! let mut sink = CollectingSink::new();
//! let summary = chain.run(Box::new(VecRecordReader::new(input)), &[], &mut sink)?;
//! assert_eq!(summary.records_written, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Stream items
//!
//! Queues carry [`RecordAndContext`] items: a record with its
//! [`Context`](record::Context) (file name, record numbers, separators), or
//! the single end-of-stream marker that ends every stream.
//!
//! ### Verbs
//!
//! A [`Verb`] receives one item at a time and appends zero or more items to
//! an [`Emitter`](verb::Emitter). It sees the end-of-stream marker exactly
//! once and must emit exactly one in response, after all its other output.
//!
//! ### Chains
//!
//! A [`Chain`] wires a [`RecordReader`](io::RecordReader), its verbs, and a
//! [`RecordSink`](io::sink::RecordSink) together with bounded queues and runs
//! them to completion. See [`chain`] for the topology and failure handling.
//!
//! ## Module Overview
//!
//! - [`chain`] - Stage threads, queues, and the run driver
//! - [`verb`] - The verb contract and the done-signal plumbing
//! - [`verbs`] - Built-in verbs and the name registry
//! - [`join`] - The join verb and its two strategies
//! - [`io`] - Record readers, writers, and compression
//! - [`record`], [`value`], [`group_map`] - The data model
//! - [`testing`] - Builders, fixtures, and assertions for tests

pub mod chain;
pub mod cli;
pub mod error;
pub mod group_map;
pub mod io;
pub mod join;
pub mod record;
pub mod testing;
pub mod value;
pub mod verb;
pub mod verbs;

// General re-exports
pub use chain::{Chain, ChainOptions, RunSummary};
pub use error::{ChainError, UsageError};
pub use group_map::OrderedGroupMap;
pub use join::{JoinOptions, JoinVerb};
pub use record::{Context, Record, RecordAndContext};
pub use value::Value;
pub use verb::{DoneSignals, Emitter, Verb};
