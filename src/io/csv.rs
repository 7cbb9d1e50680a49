//! CSV reading and writing on top of the `csv` crate.
//!
//! # Reading
//! The first row of each file is the header unless `implicit_header` is set,
//! in which case fields are keyed `1..n`. A data row whose length differs
//! from the header is an error unless `allow_ragged` is set: short rows then
//! fill only the keys they have and long rows key the extras by position.
//!
//! # Writing
//! A header precedes the first record. Whenever the key list changes, a blank
//! line and a fresh header start a new block, so heterogeneous streams stay
//! readable.

use super::{ReaderOutput, ReaderOptions, RecordReader, RecordWriter, WriterOptions, for_each_input};
use crate::error::UsageError;
use crate::record::{Context, Record};
use crate::value::Value;
use crate::verb::Batch;
use anyhow::{Context as _, Result, bail};
use crossbeam_channel::{Receiver, Sender};
use csv::{StringRecord, Terminator, WriterBuilder};
use std::io::{BufRead, Write};

fn single_byte(separator: &str, role: &str) -> Result<u8, UsageError> {
    match separator.as_bytes() {
        [b] => Ok(*b),
        _ => Err(UsageError::invalid(
            "csv",
            format!("{role} separator must be a single byte, got {separator:?}"),
        )),
    }
}

pub struct CsvReader {
    delimiter: u8,
    implicit_header: bool,
    allow_ragged: bool,
    records_per_batch: usize,
}

impl CsvReader {
    /// # Errors
    /// The field separator is not a single byte.
    pub fn new(options: &ReaderOptions) -> Result<Self, UsageError> {
        Ok(Self {
            delimiter: single_byte(options.field_separator(), "field")?,
            implicit_header: options.implicit_header,
            allow_ragged: options.allow_ragged,
            records_per_batch: options.records_per_batch,
        })
    }

    fn read_stream(
        &self,
        stream: Box<dyn BufRead + Send>,
        context: &mut Context,
        out: &mut ReaderOutput<'_>,
    ) -> Result<()> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(stream);
        let mut header: Option<Vec<String>> = None;
        let mut row = StringRecord::new();
        let mut line = 0usize;
        while !out.stopped()
            && rdr
                .read_record(&mut row)
                .with_context(|| format!("parse CSV in {}", context.filename))?
        {
            line += 1;
            if header.is_none() && !self.implicit_header {
                header = Some(row.iter().map(str::to_string).collect());
                continue;
            }
            let record = self
                .to_record(header.as_deref(), &row)
                .with_context(|| format!("CSV row {line} in {}", context.filename))?;
            context.update_for_input_record();
            out.push(record, context)?;
        }
        Ok(())
    }

    fn to_record(&self, header: Option<&[String]>, row: &StringRecord) -> Result<Record> {
        let mut record = Record::with_capacity(row.len());
        let Some(header) = header else {
            for (i, field) in row.iter().enumerate() {
                record.put((i + 1).to_string(), Value::infer(field));
            }
            return Ok(record);
        };
        if header.len() != row.len() && !self.allow_ragged {
            bail!(
                "data length {} does not match header length {}",
                row.len(),
                header.len()
            );
        }
        for (i, field) in row.iter().enumerate() {
            match header.get(i) {
                Some(key) => record.put(key.as_str(), Value::infer(field)),
                None => record.put((i + 1).to_string(), Value::infer(field)),
            }
        }
        Ok(record)
    }
}

impl RecordReader for CsvReader {
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

pub struct CsvWriter {
    delimiter: u8,
    header: Option<Vec<String>>,
}

impl CsvWriter {
    /// # Errors
    /// The field separator is not a single byte.
    pub fn new(options: &WriterOptions) -> Result<Self, UsageError> {
        Ok(Self {
            delimiter: single_byte(options.field_separator(), "field")?,
            header: None,
        })
    }

    fn write_row<I, F>(&self, fields: I, out: &mut dyn Write) -> Result<()>
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        let mut wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);
        wtr.write_record(fields).context("write CSV row")?;
        wtr.flush()?;
        Ok(())
    }
}

impl RecordWriter for CsvWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> Result<()> {
        let same_header = self
            .header
            .as_ref()
            .is_some_and(|h| h.iter().map(String::as_str).eq(record.keys()));
        if !same_header {
            if self.header.is_some() {
                out.write_all(b"\n")?;
            }
            let keys: Vec<String> = record.keys().map(str::to_string).collect();
            self.write_row(&keys, out)?;
            self.header = Some(keys);
        }
        self.write_row(record.values().map(ToString::to_string), out)
    }
}
