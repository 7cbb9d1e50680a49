//! NIDX: implicitly indexed values, keyed `1..n` on input.
//!
//! Runs of the field separator count as one, so column-aligned text reads
//! cleanly. On output only values are written.

use super::{LineParser, ReaderOptions, RecordWriter, WriterOptions};
use crate::record::Record;
use crate::value::Value;
use anyhow::Result;
use std::io::Write;

pub(crate) struct NidxParser {
    ifs: String,
}

impl NidxParser {
    pub(crate) fn new(options: &ReaderOptions) -> Self {
        Self {
            ifs: options.field_separator().to_string(),
        }
    }
}

impl LineParser for NidxParser {
    fn parse_line(&mut self, line: &str) -> Result<Option<Record>> {
        let mut record = Record::new();
        for (i, field) in line.split(self.ifs.as_str()).filter(|f| !f.is_empty()).enumerate() {
            record.put((i + 1).to_string(), Value::infer(field));
        }
        if record.is_empty() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}

pub struct NidxWriter {
    ofs: String,
}

impl NidxWriter {
    #[must_use]
    pub fn new(options: &WriterOptions) -> Self {
        Self {
            ofs: options.field_separator().to_string(),
        }
    }
}

impl RecordWriter for NidxWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> Result<()> {
        let line = record
            .values()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&self.ofs);
        writeln!(out, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_separators_collapse() -> Result<()> {
        let mut p = NidxParser::new(&ReaderOptions::with_format(super::super::InputFormat::Nidx));
        let r = p.parse_line("  a   b c")?.unwrap();
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(r.get("2"), Some(&Value::from("b")));
        assert!(p.parse_line("   ")?.is_none());
        Ok(())
    }
}
