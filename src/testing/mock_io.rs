//! Temporary input files for tests.

use crate::io::compression::create_output;
use crate::io::{OutputFormat, WriterOptions, create_record_writer};
use crate::record::Record;
use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `records` to `path` in `format`; compressed if the name says so.
///
/// # Errors
/// The file cannot be created or written.
pub fn write_records(path: &Path, records: &[Record], format: OutputFormat) -> Result<()> {
    let mut writer = create_record_writer(&WriterOptions::with_format(format))?;
    let mut out = create_output(path)?;
    for r in records {
        writer.write(r, out.as_mut())?;
    }
    writer.finish(out.as_mut())?;
    out.flush()?;
    Ok(())
}

/// A temporary directory that is removed when dropped.
///
/// ```
/// use ironmill::io::OutputFormat;
/// use ironmill::testing::{TestDir, records};
///
/// # fn main() -> anyhow::Result<()> {
/// let dir = TestDir::new()?;
/// let path = dir.write("left.dkvp", &records(&[&[("id", "1")]]), OutputFormat::Dkvp)?;
/// assert_eq!(std::fs::read_to_string(path)?, "id=1\n");
/// # Ok(())
/// # }
/// ```
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// # Errors
    /// The directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the directory, created or not.
    #[must_use]
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `records` to `name` and return its path.
    ///
    /// # Errors
    /// The file cannot be created or written.
    pub fn write(&self, name: &str, records: &[Record], format: OutputFormat) -> Result<PathBuf> {
        let path = self.join(name);
        write_records(&path, records, format)?;
        Ok(path)
    }

    /// Write raw text to `name` and return its path.
    ///
    /// # Errors
    /// The file cannot be written.
    pub fn write_text(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.join(name);
        std::fs::write(&path, text)?;
        Ok(path)
    }
}
