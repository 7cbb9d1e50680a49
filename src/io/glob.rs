//! Glob expansion for input file names.
//!
//! `--from 'logs/*.dkvp'` reads every matching file in sorted order. Names
//! without glob metacharacters pass through untouched, so a missing plain
//! file fails later with its own open error.

use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::PathBuf;

fn is_pattern(name: &str) -> bool {
    name.contains(['*', '?', '['])
}

/// Expand a glob pattern into its matching files, sorted.
///
/// # Errors
/// The pattern is invalid or a directory cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Expand every pattern in `names`, keeping the command-line order between
/// names.
///
/// # Errors
/// A pattern is invalid or matches no file.
pub fn expand_inputs(names: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::with_capacity(names.len());
    for name in names {
        if !is_pattern(name) {
            files.push(name.clone());
            continue;
        }
        let matched = expand_glob(name)?;
        if matched.is_empty() {
            bail!("no files found matching pattern: {name}");
        }
        files.extend(matched.into_iter().map(|p| p.display().to_string()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn patterns_expand_sorted_and_plain_names_pass_through() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["b.dkvp", "a.dkvp", "c.csv"] {
            fs::write(dir.path().join(name), "x=1\n")?;
        }
        let pattern = dir.path().join("*.dkvp").display().to_string();
        let files = expand_inputs(&["plain.txt".to_string(), pattern])?;
        assert_eq!(files.len(), 3);
        assert_eq!(files[0], "plain.txt");
        assert!(files[1].ends_with("a.dkvp"));
        assert!(files[2].ends_with("b.dkvp"));
        Ok(())
    }

    #[test]
    fn unmatched_pattern_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pattern = dir.path().join("*.nothing").display().to_string();
        let err = expand_inputs(&[pattern]).unwrap_err();
        assert!(err.to_string().contains("no files found"));
        Ok(())
    }
}
