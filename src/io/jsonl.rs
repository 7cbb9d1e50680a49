//! JSON Lines: one JSON object per line.
//!
//! # Notes
//! - Empty and whitespace-only lines are skipped on read.
//! - Nested objects and arrays are flattened to `a.b` / `a.1` keys.
//! - Output is compact, one object per line, numbers unquoted.

use super::{LineParser, RecordWriter};
use crate::record::Record;
use anyhow::{Context, Result};
use std::io::Write;

pub(crate) struct JsonlParser;

impl LineParser for JsonlParser {
    fn parse_line(&mut self, line: &str) -> Result<Option<Record>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let record: Record = serde_json::from_str(line).context("expected a JSON object")?;
        Ok(Some(record))
    }
}

pub struct JsonlWriter;

impl RecordWriter for JsonlWriter {
    fn write(&mut self, record: &Record, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(&mut *out, record).context("serialize record")?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn parses_objects_and_skips_blank_lines() -> Result<()> {
        let mut p = JsonlParser;
        assert!(p.parse_line("   ")?.is_none());
        let r = p.parse_line(r#"{"id":1,"name":"a"}"#)?.unwrap();
        assert_eq!(r.get("id"), Some(&Value::Int(1)));
        assert!(p.parse_line("[1,2]").is_err());
        Ok(())
    }

    #[test]
    fn writes_compact_lines() -> Result<()> {
        let r: Record = [("id", "1"), ("name", "a")].into_iter().collect();
        let mut out = Vec::new();
        JsonlWriter.write(&r, &mut out)?;
        assert_eq!(String::from_utf8(out)?, "{\"id\":1,\"name\":\"a\"}\n");
        Ok(())
    }
}
