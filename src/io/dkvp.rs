//! DKVP: delimited key-value pairs, `a=1,b=2`.
//!
//! A field with no pair separator is keyed by its 1-based position, so
//! `abc,x=3` reads as `1=abc,x=3`.

use super::{LineParser, ReaderOptions, RecordWriter, WriterOptions};
use crate::record::Record;
use crate::value::Value;
use anyhow::Result;
use std::io::Write;

pub(crate) struct DkvpParser {
    ifs: String,
    ips: String,
}

impl DkvpParser {
    pub(crate) fn new(options: &ReaderOptions) -> Self {
        Self {
            ifs: options.field_separator().to_string(),
            ips: options.pair_separator().to_string(),
        }
    }
}

impl LineParser for DkvpParser {
    fn parse_line(&mut self, line: &str) -> Result<Option<Record>> {
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(parse_dkvp_line(line, &self.ifs, &self.ips)))
    }
}

/// Split one DKVP line. Later duplicates of a key overwrite earlier ones.
#[must_use]
pub fn parse_dkvp_line(line: &str, ifs: &str, ips: &str) -> Record {
    let mut record = Record::new();
    for (i, field) in line.split(ifs).enumerate() {
        match field.split_once(ips) {
            Some((key, value)) => record.put(key, Value::infer(value)),
            None => record.put((i + 1).to_string(), Value::infer(field)),
        }
    }
    record
}

/// Writes `k=v,k=v` lines.
pub struct DkvpWriter {
    ofs: String,
    ops: String,
}

impl DkvpWriter {
    #[must_use]
    pub fn new(options: &WriterOptions) -> Self {
        Self {
            ofs: options.field_separator().to_string(),
            ops: options.pair_separator().to_string(),
        }
    }
}

impl RecordWriter for DkvpWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> Result<()> {
        let mut line = String::new();
        for (i, (k, v)) in record.iter().enumerate() {
            if i > 0 {
                line.push_str(&self.ofs);
            }
            line.push_str(k);
            line.push_str(&self.ops);
            line.push_str(&v.to_string());
        }
        line.push('\n');
        out.write_all(line.as_bytes())?;
        Ok(())
    }
}
