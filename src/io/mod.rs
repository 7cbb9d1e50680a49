//! Record readers and writers.
//!
//! A [`RecordReader`] drives parsed records into a stage queue exactly the way
//! a verb stage would: batched, in order, ending with one end-of-stream
//! marker. The chain runs it on its own thread for the main input, and the
//! join verb runs a second one privately for its left file.
//!
//! A [`RecordWriter`] renders records to a byte sink; [`sink`] adapts writers
//! to the end of a chain.
//!
//! # Formats
//! | name    | reader | writer | notes                                   |
//! |---------|--------|--------|-----------------------------------------|
//! | `dkvp`  | yes    | yes    | `k=v,k=v`; the default                  |
//! | `nidx`  | yes    | yes    | values only, keyed `1..n` on input      |
//! | `csv`   | yes    | yes    | feature `io-csv`                        |
//! | `jsonl` | yes    | yes    | feature `io-jsonl`; one object per line |

pub mod compression;
#[cfg_attr(docsrs, doc(cfg(feature = "io-csv")))]
#[cfg(feature = "io-csv")]
pub mod csv;
pub mod dkvp;
pub mod glob;
#[cfg_attr(docsrs, doc(cfg(feature = "io-jsonl")))]
#[cfg(feature = "io-jsonl")]
pub mod jsonl;
pub mod memory;
pub mod nidx;
pub mod sink;

use crate::error::{ChainError, UsageError};
use crate::record::{Context, Record, RecordAndContext, Separators};
use crate::verb::{Batch, DEFAULT_RECORDS_PER_BATCH};
use anyhow::{Context as _, Result};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use tracing::debug;

/// Name used in contexts for records read from standard input.
pub const STDIN_NAME: &str = "(stdin)";

/// Input record format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Dkvp,
    Nidx,
    Csv,
    Jsonl,
}

/// Output record format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Dkvp,
    Nidx,
    Csv,
    Jsonl,
}

fn parse_format_name(s: &str) -> Option<OutputFormat> {
    match s {
        "dkvp" => Some(OutputFormat::Dkvp),
        "nidx" => Some(OutputFormat::Nidx),
        "csv" => Some(OutputFormat::Csv),
        "json" | "jsonl" => Some(OutputFormat::Jsonl),
        _ => None,
    }
}

impl FromStr for InputFormat {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_format_name(s) {
            Some(OutputFormat::Dkvp) => Ok(Self::Dkvp),
            Some(OutputFormat::Nidx) => Ok(Self::Nidx),
            Some(OutputFormat::Csv) => Ok(Self::Csv),
            Some(OutputFormat::Jsonl) => Ok(Self::Jsonl),
            None => Err(UsageError::UnsupportedFormat {
                direction: "input",
                format: s.to_string(),
            }),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_format_name(s).ok_or_else(|| UsageError::UnsupportedFormat {
            direction: "output",
            format: s.to_string(),
        })
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dkvp => "dkvp",
            Self::Nidx => "nidx",
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dkvp => "dkvp",
            Self::Nidx => "nidx",
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        })
    }
}

/// Reader configuration.
///
/// Separators left as `None` take the format's default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub format: InputFormat,
    pub ifs: Option<String>,
    pub ips: Option<String>,
    /// CSV: the first line is data; fields are keyed `1..n`.
    pub implicit_header: bool,
    /// CSV: short rows fill only the keys they have; long rows get positional keys.
    pub allow_ragged: bool,
    pub records_per_batch: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            format: InputFormat::default(),
            ifs: None,
            ips: None,
            implicit_header: false,
            allow_ragged: false,
            records_per_batch: DEFAULT_RECORDS_PER_BATCH,
        }
    }
}

impl ReaderOptions {
    #[must_use]
    pub fn with_format(format: InputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn field_separator(&self) -> &str {
        match (&self.ifs, self.format) {
            (Some(ifs), _) => ifs,
            (None, InputFormat::Nidx) => " ",
            (None, _) => ",",
        }
    }

    #[must_use]
    pub fn pair_separator(&self) -> &str {
        self.ips.as_deref().unwrap_or("=")
    }

    /// Fold the effective input separators into `separators`.
    #[must_use]
    pub fn apply_to(&self, mut separators: Separators) -> Separators {
        separators.ifs = self.field_separator().to_string();
        separators.ips = self.pair_separator().to_string();
        separators
    }
}

/// Writer configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    pub format: OutputFormat,
    pub ofs: Option<String>,
    pub ops: Option<String>,
}

impl WriterOptions {
    #[must_use]
    pub fn with_format(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn field_separator(&self) -> &str {
        match (&self.ofs, self.format) {
            (Some(ofs), _) => ofs,
            (None, OutputFormat::Nidx) => " ",
            (None, _) => ",",
        }
    }

    #[must_use]
    pub fn pair_separator(&self) -> &str {
        self.ops.as_deref().unwrap_or("=")
    }

    #[must_use]
    pub fn apply_to(&self, mut separators: Separators) -> Separators {
        separators.ofs = self.field_separator().to_string();
        separators.ops = self.pair_separator().to_string();
        separators
    }
}

/// Source of records for a chain or for a join's left side.
pub trait RecordReader: Send {
    /// Read `file_names` in order (standard input when empty) and push batches
    /// to `output`, ending with exactly one end-of-stream marker.
    ///
    /// A message on `downstream_done` means nobody wants more input; the
    /// reader then stops early and still sends end-of-stream.
    ///
    /// # Errors
    /// I/O and parse failures, or `output` disconnecting. No end-of-stream
    /// marker is sent after an error.
    fn read(
        &mut self,
        file_names: &[String],
        context: Context,
        output: &Sender<Batch>,
        downstream_done: &Receiver<()>,
    ) -> Result<()>;
}

/// Renders records in one output format.
pub trait RecordWriter: Send {
    /// # Errors
    /// Fails on write errors.
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> Result<()>;

    /// Called once at end of stream.
    ///
    /// # Errors
    /// Fails on write errors.
    fn finish(&mut self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }
}

/// Build the reader for `options.format`.
///
/// # Errors
/// The format's cargo feature is disabled.
pub fn create_record_reader(options: &ReaderOptions) -> Result<Box<dyn RecordReader>, UsageError> {
    match options.format {
        InputFormat::Dkvp => Ok(Box::new(LineReader::new(
            dkvp::DkvpParser::new(options),
            options.records_per_batch,
        ))),
        InputFormat::Nidx => Ok(Box::new(LineReader::new(
            nidx::NidxParser::new(options),
            options.records_per_batch,
        ))),
        #[cfg(feature = "io-csv")]
        InputFormat::Csv => Ok(Box::new(csv::CsvReader::new(options)?)),
        #[cfg(feature = "io-jsonl")]
        InputFormat::Jsonl => Ok(Box::new(LineReader::new(
            jsonl::JsonlParser,
            options.records_per_batch,
        ))),
        #[allow(unreachable_patterns)]
        other => Err(UsageError::UnsupportedFormat {
            direction: "input",
            format: other.to_string(),
        }),
    }
}

/// Build the writer for `options.format`.
///
/// # Errors
/// The format's cargo feature is disabled.
pub fn create_record_writer(options: &WriterOptions) -> Result<Box<dyn RecordWriter>, UsageError> {
    match options.format {
        OutputFormat::Dkvp => Ok(Box::new(dkvp::DkvpWriter::new(options))),
        OutputFormat::Nidx => Ok(Box::new(nidx::NidxWriter::new(options))),
        #[cfg(feature = "io-csv")]
        OutputFormat::Csv => Ok(Box::new(csv::CsvWriter::new(options)?)),
        #[cfg(feature = "io-jsonl")]
        OutputFormat::Jsonl => Ok(Box::new(jsonl::JsonlWriter)),
        #[allow(unreachable_patterns)]
        other => Err(UsageError::UnsupportedFormat {
            direction: "output",
            format: other.to_string(),
        }),
    }
}

/// Batching front end shared by all readers.
///
/// Ships a batch whenever `records_per_batch` records accumulate, and checks
/// the downstream-done link after each shipment.
pub(crate) struct ReaderOutput<'a> {
    output: &'a Sender<Batch>,
    downstream_done: &'a Receiver<()>,
    batch: Batch,
    records_per_batch: usize,
    stopped: bool,
}

impl<'a> ReaderOutput<'a> {
    pub(crate) fn new(
        output: &'a Sender<Batch>,
        downstream_done: &'a Receiver<()>,
        records_per_batch: usize,
    ) -> Self {
        let records_per_batch = records_per_batch.max(1);
        Self {
            output,
            downstream_done,
            batch: Vec::with_capacity(records_per_batch.min(4096)),
            records_per_batch,
            stopped: false,
        }
    }

    pub(crate) fn push(&mut self, record: Record, context: &Context) -> Result<()> {
        self.batch
            .push(RecordAndContext::new(record, context.clone()));
        if self.batch.len() >= self.records_per_batch {
            self.ship()?;
            if self.downstream_done.try_recv().is_ok() {
                debug!("reader: downstream done, stopping early");
                self.stopped = true;
            }
        }
        Ok(())
    }

    pub(crate) const fn stopped(&self) -> bool {
        self.stopped
    }

    /// Ship the tail batch followed by the end-of-stream marker.
    pub(crate) fn finish(mut self, context: Context) -> Result<()> {
        self.batch.push(RecordAndContext::end_of_stream(context));
        self.ship()
    }

    fn ship(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.batch);
        self.output.send(batch).map_err(|_| {
            ChainError::Disconnected {
                stage: 0,
                verb: "reader".to_string(),
            }
            .into()
        })
    }
}

/// Parses one line of a line-oriented format.
pub(crate) trait LineParser: Send {
    /// Called when a new file starts.
    fn start_file(&mut self) {}

    /// `Ok(None)` skips the line.
    fn parse_line(&mut self, line: &str) -> Result<Option<Record>>;
}

/// Drives any [`LineParser`] over a list of files.
pub(crate) struct LineReader<P> {
    parser: P,
    records_per_batch: usize,
}

impl<P: LineParser> LineReader<P> {
    pub(crate) const fn new(parser: P, records_per_batch: usize) -> Self {
        Self {
            parser,
            records_per_batch,
        }
    }

    fn read_stream(
        &mut self,
        stream: Box<dyn BufRead + Send>,
        context: &mut Context,
        out: &mut ReaderOutput<'_>,
    ) -> Result<()> {
        self.parser.start_file();
        for (i, line) in stream.lines().enumerate() {
            if out.stopped() {
                break;
            }
            let line =
                line.with_context(|| format!("read line {} in {}", i + 1, context.filename))?;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            let parsed = self
                .parser
                .parse_line(line)
                .with_context(|| format!("parse line {} in {}", i + 1, context.filename))?;
            if let Some(record) = parsed {
                context.update_for_input_record();
                out.push(record, context)?;
            }
        }
        Ok(())
    }
}

impl<P: LineParser> RecordReader for LineReader<P> {
    fn read(
        &mut self,
        file_names: &[String],
        mut context: Context,
        output: &Sender<Batch>,
        downstream_done: &Receiver<()>,
    ) -> Result<()> {
        let mut out = ReaderOutput::new(output, downstream_done, self.records_per_batch);
        for_each_input(file_names, &mut context, &mut out, |stream, context, out| {
            self.read_stream(stream, context, out)
        })?;
        out.finish(context)
    }
}

/// Open each named input in turn (standard input when there are none) and
/// hand it to `read`, keeping the file counters in `context` current.
pub(crate) fn for_each_input(
    file_names: &[String],
    context: &mut Context,
    out: &mut ReaderOutput<'_>,
    mut read: impl FnMut(Box<dyn BufRead + Send>, &mut Context, &mut ReaderOutput<'_>) -> Result<()>,
) -> Result<()> {
    if file_names.is_empty() {
        context.update_for_start_of_file(STDIN_NAME);
        return read(compression::open_input("-")?, context, out);
    }
    for name in file_names {
        if out.stopped() {
            break;
        }
        debug!(file = %name, "reader: opening");
        context.update_for_start_of_file(name);
        read(compression::open_input(name)?, context, out)?;
    }
    Ok(())
}
