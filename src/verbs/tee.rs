//! `tee`: write every record to a file and pass it through unchanged.

use crate::error::UsageError;
use crate::io::compression::{auto_detect_writer, create_output};
use crate::io::{OutputFormat, RecordWriter, WriterOptions, create_record_writer};
use crate::record::RecordAndContext;
use crate::verb::{DoneSignals, Emitter, Verb};
use anyhow::{Context as _, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Flags for `tee`.
#[derive(Parser, Debug, Clone)]
#[command(name = "tee", about = "Writes records to a file and passes them through.")]
pub struct TeeArgs {
    /// Append instead of truncating.
    #[arg(short = 'a')]
    pub append: bool,

    /// Output format for the file; defaults to the main output format.
    #[arg(short = 'o', value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Destination; `.gz`, `.zst`, `.bz2` and `.xz` names are compressed.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

/// Downstream-done signals are absorbed: the file gets every record even
/// when the rest of the chain has stopped listening.
pub struct Tee {
    path: PathBuf,
    append: bool,
    writer: Box<dyn RecordWriter>,
    file: Option<Box<dyn Write + Send>>,
    written: u64,
}

impl Tee {
    /// # Errors
    /// The output format has no writer in this build.
    pub fn new(args: TeeArgs, main_writer: &WriterOptions) -> Result<Self, UsageError> {
        let options = match args.format {
            Some(format) => WriterOptions::with_format(format),
            None => main_writer.clone(),
        };
        Ok(Self {
            path: args.path,
            append: args.append,
            writer: create_record_writer(&options)?,
            file: None,
            written: 0,
        })
    }

    fn open(&self) -> Result<Box<dyn Write + Send>> {
        if !self.append {
            return create_output(&self.path).context("tee");
        }
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("tee: open {} for append", self.path.display()))?;
        auto_detect_writer(f, &self.path)
    }
}

impl Verb for Tee {
    fn name(&self) -> &'static str {
        "tee"
    }

    fn transform(
        &mut self,
        item: RecordAndContext,
        out: &mut Emitter,
        _signals: &mut DoneSignals,
    ) -> Result<()> {
        match &item {
            RecordAndContext::Record { record, .. } => {
                if self.file.is_none() {
                    self.file = Some(self.open()?);
                }
                if let Some(file) = self.file.as_mut() {
                    self.writer.write(record, file.as_mut())?;
                    self.written += 1;
                }
            }
            // The file is created even when no record arrives.
            RecordAndContext::EndOfStream(_) => {
                let mut file = match self.file.take() {
                    Some(file) => file,
                    None => self.open()?,
                };
                self.writer.finish(file.as_mut())?;
                file.flush()
                    .with_context(|| format!("tee: flush {}", self.path.display()))?;
                drop(file);
                debug!(path = %self.path.display(), records = self.written, "tee: closed");
            }
        }
        out.emit(item)
    }

    fn handle_downstream_done(&mut self, _signals: &mut DoneSignals) {}
}
