//! Main-flag parsing for the `ironmill` binary.
//!
//! Main flags come first; the first word that is not a flag names a verb, and
//! everything after it belongs to the verb chain.

use crate::chain::{Chain, ChainOptions};
use crate::error::UsageError;
use crate::io::{InputFormat, OutputFormat, ReaderOptions, WriterOptions};
use crate::record::{Context, Separators};
use crate::verb::DEFAULT_RECORDS_PER_BATCH;
use crate::verbs::{VERBS, VerbSettings, build_verb_chain};
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::fmt::Write as _;

/// Streaming record processing: chained verbs over DKVP, NIDX, CSV, and JSON Lines.
#[derive(Parser, Debug, Clone)]
#[command(name = "ironmill", version, long_about = None)]
#[command(override_usage = "ironmill [FLAGS] VERB [VERB-FLAGS] {then VERB [VERB-FLAGS]}...")]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Input format: dkvp, nidx, csv, jsonl.
    #[arg(short = 'i', value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,

    /// Output format: dkvp, nidx, csv, jsonl.
    #[arg(short = 'o', value_name = "FORMAT")]
    pub output_format: Option<OutputFormat>,

    #[arg(long, help_heading = "Format shortcuts")]
    pub icsv: bool,
    #[arg(long, help_heading = "Format shortcuts")]
    pub ijsonl: bool,
    #[arg(long, help_heading = "Format shortcuts")]
    pub inidx: bool,
    #[arg(long, help_heading = "Format shortcuts")]
    pub idkvp: bool,
    #[arg(long, help_heading = "Format shortcuts")]
    pub ocsv: bool,
    #[arg(long, help_heading = "Format shortcuts")]
    pub ojsonl: bool,
    #[arg(long, help_heading = "Format shortcuts")]
    pub onidx: bool,
    #[arg(long, help_heading = "Format shortcuts")]
    pub odkvp: bool,
    /// CSV in and out.
    #[arg(long, help_heading = "Format shortcuts")]
    pub csv: bool,
    /// JSON Lines in and out.
    #[arg(long, visible_alias = "json", help_heading = "Format shortcuts")]
    pub jsonl: bool,
    /// CSV in, JSON Lines out.
    #[arg(long, help_heading = "Format shortcuts")]
    pub c2j: bool,

    /// Input field separator.
    #[arg(long, value_name = "SEP", help_heading = "Separators")]
    pub ifs: Option<String>,
    /// Input pair separator.
    #[arg(long, value_name = "SEP", help_heading = "Separators")]
    pub ips: Option<String>,
    /// Output field separator.
    #[arg(long, value_name = "SEP", help_heading = "Separators")]
    pub ofs: Option<String>,
    /// Output pair separator.
    #[arg(long, value_name = "SEP", help_heading = "Separators")]
    pub ops: Option<String>,

    /// CSV input has no header line; fields are keyed 1..n.
    #[arg(long)]
    pub implicit_csv_header: bool,

    /// Accept CSV rows whose length differs from the header.
    #[arg(long)]
    pub allow_ragged_csv_input: bool,

    /// Input file or glob pattern; repeatable. Standard input when absent.
    #[arg(long = "from", value_name = "FILE")]
    pub from: Vec<String>,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_RECORDS_PER_BATCH, help_heading = "Tuning")]
    pub records_per_batch: usize,

    /// Batches each stage queue holds.
    #[arg(long, value_name = "N", default_value_t = 4, help_heading = "Tuning")]
    pub queue_capacity: usize,

    /// Log progress every N input records.
    #[arg(long, value_name = "N", help_heading = "Tuning")]
    pub nr_progress_mod: Option<u64>,

    /// The verb chain.
    #[arg(
        value_name = "VERB",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub verb_chain: Vec<String>,
}

/// Parse the process arguments, with the verb list in the help text.
///
/// # Errors
/// A clap error, including the help and version "errors".
pub fn parse<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command()
        .after_help(verb_help())
        .try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}

/// The `Verbs:` section of the help text.
#[must_use]
pub fn verb_help() -> String {
    let width = VERBS.iter().map(|v| v.name.len()).max().unwrap_or(0);
    let mut help = String::from("Verbs:\n");
    for v in VERBS {
        let _ = writeln!(help, "  {:width$}  {}", v.name, v.summary);
    }
    help.push_str("\nRun `ironmill VERB --help` for a verb's flags.");
    help
}

impl Cli {
    /// Explicit `-i` wins over the shortcuts.
    #[must_use]
    pub fn input_format(&self) -> InputFormat {
        if let Some(format) = self.input_format {
            format
        } else if self.icsv || self.csv || self.c2j {
            InputFormat::Csv
        } else if self.ijsonl || self.jsonl {
            InputFormat::Jsonl
        } else if self.inidx {
            InputFormat::Nidx
        } else {
            InputFormat::Dkvp
        }
    }

    /// Explicit `-o` wins over the shortcuts.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        if let Some(format) = self.output_format {
            format
        } else if self.ocsv || self.csv {
            OutputFormat::Csv
        } else if self.ojsonl || self.jsonl || self.c2j {
            OutputFormat::Jsonl
        } else if self.onidx {
            OutputFormat::Nidx
        } else {
            OutputFormat::Dkvp
        }
    }

    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            format: self.input_format(),
            ifs: self.ifs.clone(),
            ips: self.ips.clone(),
            implicit_header: self.implicit_csv_header,
            allow_ragged: self.allow_ragged_csv_input,
            records_per_batch: self.records_per_batch.max(1),
        }
    }

    #[must_use]
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            format: self.output_format(),
            ofs: self.ofs.clone(),
            ops: self.ops.clone(),
        }
    }

    #[must_use]
    pub fn chain_options(&self) -> ChainOptions {
        ChainOptions {
            records_per_batch: self.records_per_batch.max(1),
            queue_capacity: self.queue_capacity,
            nr_progress_mod: self.nr_progress_mod.filter(|&n| n > 0),
        }
    }

    #[must_use]
    pub fn verb_settings(&self) -> VerbSettings {
        VerbSettings {
            reader: self.reader_options(),
            writer: self.writer_options(),
        }
    }

    /// Context the main reader starts from.
    #[must_use]
    pub fn initial_context(&self) -> Context {
        let separators = self.reader_options().apply_to(Separators::default());
        Context::new(self.writer_options().apply_to(separators))
    }

    /// Build the verb chain these flags describe.
    ///
    /// # Errors
    /// Unknown verbs, empty `then` segments, or bad verb flags.
    pub fn build_chain(&self) -> Result<Chain, UsageError> {
        let verbs = build_verb_chain(&self.verb_chain, &self.verb_settings())?;
        Ok(Chain::new(verbs)
            .with_options(self.chain_options())
            .with_initial_context(self.initial_context()))
    }

    /// `-v` count to an env-filter directive.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(line: &str) -> Cli {
        parse(std::iter::once("ironmill").chain(line.split_whitespace())).unwrap()
    }

    #[test]
    fn verb_flags_are_not_main_flags() {
        let c = cli("--icsv --from a.csv head -n 4 -g a then cat -n");
        assert_eq!(c.input_format(), InputFormat::Csv);
        assert_eq!(c.from, vec!["a.csv"]);
        assert_eq!(
            c.verb_chain,
            vec!["head", "-n", "4", "-g", "a", "then", "cat", "-n"]
        );
    }

    #[test]
    fn shortcuts_and_explicit_formats() {
        let c = cli("--c2j cat");
        assert_eq!(c.input_format(), InputFormat::Csv);
        assert_eq!(c.output_format(), OutputFormat::Jsonl);
        let c = cli("--csv -o nidx cat");
        assert_eq!(c.output_format(), OutputFormat::Nidx);
        assert_eq!(cli("cat").input_format(), InputFormat::Dkvp);
    }

    #[test]
    fn separators_reach_the_initial_context() {
        let c = cli("--ifs ; --ops : cat");
        let ctx = c.initial_context();
        assert_eq!(ctx.separators.ifs, ";");
        assert_eq!(ctx.separators.ips, "=");
        assert_eq!(ctx.separators.ops, ":");
    }

    #[test]
    fn missing_verb_is_a_parse_error() {
        assert!(parse(["ironmill", "--icsv"]).is_err());
    }

    #[test]
    fn builds_the_chain() {
        let chain = cli("--records-per-batch 7 head -n 1 then count").build_chain().unwrap();
        assert_eq!(chain.verb_names(), vec!["head", "count"]);
        assert_eq!(
            cli("frob").build_chain().err(),
            Some(UsageError::UnknownVerb("frob".into()))
        );
    }
}
