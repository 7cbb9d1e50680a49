//! Join configuration and its command-line form.

use crate::error::UsageError;
use crate::io::{InputFormat, ReaderOptions};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Fully resolved join settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOptions {
    pub left_file: String,
    pub left_join_fields: Vec<String>,
    pub right_join_fields: Vec<String>,
    pub output_join_fields: Vec<String>,
    /// Prepended to every non-join field name taken from the left record.
    pub left_prefix: String,
    /// Prepended to every non-join field name taken from the right record.
    pub right_prefix: String,
    pub emit_pairables: bool,
    pub emit_left_unpairables: bool,
    pub emit_right_unpairables: bool,
    /// Merge-join both inputs, which must be sorted by join key.
    pub sorted_input: bool,
    /// When set, left records keep only these non-join fields.
    pub left_keep_fields: Option<Vec<String>>,
    pub left_reader: ReaderOptions,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            left_file: String::new(),
            left_join_fields: Vec::new(),
            right_join_fields: Vec::new(),
            output_join_fields: Vec::new(),
            left_prefix: String::new(),
            right_prefix: String::new(),
            emit_pairables: true,
            emit_left_unpairables: false,
            emit_right_unpairables: false,
            sorted_input: false,
            left_keep_fields: None,
            left_reader: ReaderOptions::default(),
        }
    }
}

impl JoinOptions {
    /// Join `left_file` to the main stream on the same field names both sides.
    #[must_use]
    pub fn on_fields(left_file: impl Into<String>, fields: &[&str]) -> Self {
        let fields: Vec<String> = fields.iter().map(|f| (*f).to_string()).collect();
        Self {
            left_file: left_file.into(),
            left_join_fields: fields.clone(),
            right_join_fields: fields.clone(),
            output_join_fields: fields,
            ..Self::default()
        }
    }

    /// Check the cross-field rules.
    ///
    /// # Errors
    /// A missing left file, no join fields, mismatched list lengths, or all
    /// emission flags off.
    pub fn validate(&self) -> Result<(), UsageError> {
        if self.left_file.is_empty() {
            return Err(UsageError::MissingOption {
                verb: "join".into(),
                flag: "-f".into(),
            });
        }
        if self.output_join_fields.is_empty() {
            return Err(UsageError::MissingOption {
                verb: "join".into(),
                flag: "-j".into(),
            });
        }
        let (l, r, o) = (
            self.left_join_fields.len(),
            self.right_join_fields.len(),
            self.output_join_fields.len(),
        );
        if l != o || r != o {
            return Err(UsageError::JoinFieldCountMismatch {
                left: l,
                right: r,
                output: o,
            });
        }
        if !self.emit_pairables && !self.emit_left_unpairables && !self.emit_right_unpairables {
            return Err(UsageError::NoEmission);
        }
        Ok(())
    }
}

/// Command-line flags for `join`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "join",
    about = "Joins records from a left file with records from the main input.",
    disable_version_flag = true
)]
pub struct JoinArgs {
    /// Left file name.
    #[arg(short = 'f', value_name = "FILE")]
    pub left_file: Option<String>,

    /// Comma-separated join field names for output (and input, unless -l/-r).
    #[arg(short = 'j', value_delimiter = ',', value_name = "FIELDS")]
    pub join_fields: Option<Vec<String>>,

    /// Comma-separated join field names for the left file.
    #[arg(short = 'l', value_delimiter = ',', value_name = "FIELDS")]
    pub left_fields: Option<Vec<String>>,

    /// Comma-separated join field names for the main input.
    #[arg(short = 'r', value_delimiter = ',', value_name = "FIELDS")]
    pub right_fields: Option<Vec<String>>,

    /// Prefix for non-join field names from the left file.
    #[arg(long = "lp", value_name = "PREFIX")]
    pub left_prefix: Option<String>,

    /// Prefix for non-join field names from the main input.
    #[arg(long = "rp", value_name = "PREFIX")]
    pub right_prefix: Option<String>,

    /// Do not emit paired records.
    #[arg(long = "np")]
    pub no_pairables: bool,

    /// Emit unpaired records from the left file.
    #[arg(long = "ul")]
    pub left_unpairables: bool,

    /// Emit unpaired records from the main input.
    #[arg(long = "ur")]
    pub right_unpairables: bool,

    /// Require sorted input and stream both sides (bounded memory).
    #[arg(short = 's', long = "sorted-input", overrides_with = "unsorted")]
    pub sorted_input: bool,

    /// Hold the left file in memory; input need not be sorted (default).
    #[arg(short = 'u', overrides_with = "sorted_input")]
    pub unsorted: bool,

    /// Input format of the left file, if different from the main input.
    #[arg(short = 'i', value_name = "FORMAT")]
    pub left_format: Option<String>,

    /// Comma-separated non-join fields to keep from left records.
    #[arg(long = "lk", value_delimiter = ',', value_name = "FIELDS")]
    pub left_keep: Option<Vec<String>>,
}

impl JoinArgs {
    /// Resolve flag defaults and validate.
    ///
    /// The left file is read with `main_reader` settings unless `-i` names
    /// another format.
    ///
    /// # Errors
    /// Any violation of the join's command-line contract.
    pub fn into_options(self, main_reader: &ReaderOptions) -> Result<JoinOptions, UsageError> {
        let output_join_fields = self
            .join_fields
            .or_else(|| self.left_fields.clone())
            .ok_or_else(|| UsageError::MissingOption {
                verb: "join".into(),
                flag: "-j".into(),
            })?;
        let mut left_reader = main_reader.clone();
        if let Some(fmt) = &self.left_format {
            left_reader = ReaderOptions {
                format: fmt.parse::<InputFormat>()?,
                ifs: None,
                ips: None,
                ..left_reader
            };
        }
        let options = JoinOptions {
            left_file: self.left_file.unwrap_or_default(),
            left_join_fields: self
                .left_fields
                .unwrap_or_else(|| output_join_fields.clone()),
            right_join_fields: self
                .right_fields
                .unwrap_or_else(|| output_join_fields.clone()),
            output_join_fields,
            left_prefix: self.left_prefix.unwrap_or_default(),
            right_prefix: self.right_prefix.unwrap_or_default(),
            emit_pairables: !self.no_pairables,
            emit_left_unpairables: self.left_unpairables,
            emit_right_unpairables: self.right_unpairables,
            sorted_input: self.sorted_input && !self.unsorted,
            left_keep_fields: self.left_keep,
            left_reader,
        };
        options.validate()?;
        Ok(options)
    }
}
