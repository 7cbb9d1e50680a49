//! Built-in verbs and the registry that builds them from command-line words.
//!
//! A verb chain on the command line is a list of verb invocations separated
//! by `then`:
//!
//! ```text
//! head -n 4 -g a then join -j id -f left.csv then count
//! ```
//!
//! Each verb parses its own flags with a `clap` derive struct and is
//! constructed once; no per-record dispatch on verb kind happens afterwards.

pub mod cat;
pub mod count;
pub mod head;
pub mod nothing;
pub mod seqgen;
pub mod tac;
pub mod tail;
pub mod tee;

use crate::error::UsageError;
use crate::io::{ReaderOptions, WriterOptions};
use crate::join::{JoinArgs, JoinVerb};
use crate::verb::Verb;
use clap::Parser;
use clap::error::ErrorKind;

/// Word separating verbs in a chain.
pub const THEN: &str = "then";

/// Main-level settings some verbs inherit (the join's left-file reader,
/// `tee`'s writer).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerbSettings {
    pub reader: ReaderOptions,
    pub writer: WriterOptions,
}

type Constructor = fn(&[String], &VerbSettings) -> Result<Box<dyn Verb>, UsageError>;

/// One registry entry.
pub struct VerbEntry {
    pub name: &'static str,
    pub summary: &'static str,
    build: Constructor,
}

impl VerbEntry {
    /// Build from `args`, where `args[0]` is the verb name.
    ///
    /// # Errors
    /// The verb's flags are malformed or inconsistent.
    pub fn build(
        &self,
        args: &[String],
        settings: &VerbSettings,
    ) -> Result<Box<dyn Verb>, UsageError> {
        (self.build)(args, settings)
    }
}

/// Every verb the binary knows, in help order.
pub static VERBS: &[VerbEntry] = &[
    VerbEntry {
        name: "cat",
        summary: "Passes records through, optionally numbering them.",
        build: |args, _| Ok(Box::new(cat::Cat::new(parse_verb_args(args)?))),
    },
    VerbEntry {
        name: "count",
        summary: "Counts records, optionally per group.",
        build: |args, _| Ok(Box::new(count::Count::new(parse_verb_args(args)?))),
    },
    VerbEntry {
        name: "head",
        summary: "Passes the first n records, optionally per group.",
        build: |args, _| Ok(Box::new(head::Head::new(parse_verb_args(args)?))),
    },
    VerbEntry {
        name: "join",
        summary: "Joins records from a left file with the main input.",
        build: |args, settings| {
            let args: JoinArgs = parse_verb_args(args)?;
            Ok(Box::new(JoinVerb::new(args.into_options(&settings.reader)?)?))
        },
    },
    VerbEntry {
        name: "nothing",
        summary: "Drops all records.",
        build: |args, _| {
            let _: nothing::NothingArgs = parse_verb_args(args)?;
            Ok(Box::new(nothing::Nothing))
        },
    },
    VerbEntry {
        name: "seqgen",
        summary: "Generates a sequence of records; ignores input.",
        build: |args, _| Ok(Box::new(seqgen::Seqgen::new(parse_verb_args(args)?)?)),
    },
    VerbEntry {
        name: "tac",
        summary: "Reverses record order.",
        build: |args, _| {
            let _: tac::TacArgs = parse_verb_args(args)?;
            Ok(Box::new(tac::Tac::default()))
        },
    },
    VerbEntry {
        name: "tail",
        summary: "Passes the last n records, optionally per group.",
        build: |args, _| Ok(Box::new(tail::Tail::new(parse_verb_args(args)?))),
    },
    VerbEntry {
        name: "tee",
        summary: "Writes records to a file while passing them through.",
        build: |args, settings| {
            Ok(Box::new(tee::Tee::new(parse_verb_args(args)?, &settings.writer)?))
        },
    },
];

#[must_use]
pub fn lookup(name: &str) -> Option<&'static VerbEntry> {
    VERBS.iter().find(|v| v.name == name)
}

/// Split `a -x then b then c -y` into per-verb argument lists.
///
/// # Errors
/// An empty list or an empty segment (`then then`, trailing `then`).
pub fn split_verb_chain(args: &[String]) -> Result<Vec<Vec<String>>, UsageError> {
    if args.is_empty() {
        return Err(UsageError::NoVerb);
    }
    let segments: Vec<Vec<String>> = args
        .split(|a| a == THEN)
        .map(<[String]>::to_vec)
        .collect();
    if segments.iter().any(Vec::is_empty) {
        return Err(UsageError::NoVerb);
    }
    Ok(segments)
}

/// Build one verb; `args[0]` names it.
///
/// # Errors
/// Unknown verb name or bad verb flags.
pub fn build_verb(
    args: &[String],
    settings: &VerbSettings,
) -> Result<Box<dyn Verb>, UsageError> {
    let name = args.first().ok_or(UsageError::NoVerb)?;
    let entry = lookup(name).ok_or_else(|| UsageError::UnknownVerb(name.clone()))?;
    entry.build(args, settings)
}

/// Build every verb of a `then`-chain, in order.
///
/// # Errors
/// The first verb that fails to parse.
pub fn build_verb_chain(
    args: &[String],
    settings: &VerbSettings,
) -> Result<Vec<Box<dyn Verb>>, UsageError> {
    split_verb_chain(args)?
        .iter()
        .map(|segment| build_verb(segment, settings))
        .collect()
}

/// Parse a verb's flags; `args[0]` is the verb name.
pub(crate) fn parse_verb_args<T: Parser>(args: &[String]) -> Result<T, UsageError> {
    let verb = args.first().map_or("verb", String::as_str);
    T::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::MissingRequiredArgument => UsageError::MissingArgument {
            verb: verb.to_string(),
            flag: e.to_string().trim_end().to_string(),
        },
        _ => UsageError::invalid(verb, e.to_string().trim_end()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn splits_on_then() {
        let segments = split_verb_chain(&words("head -n 2 then cat -n then tac")).unwrap();
        assert_eq!(
            segments,
            vec![words("head -n 2"), words("cat -n"), words("tac")]
        );
    }

    #[test]
    fn empty_segments_are_rejected() {
        assert_eq!(split_verb_chain(&[]), Err(UsageError::NoVerb));
        assert_eq!(
            split_verb_chain(&words("cat then")),
            Err(UsageError::NoVerb)
        );
        assert_eq!(
            split_verb_chain(&words("cat then then tac")),
            Err(UsageError::NoVerb)
        );
    }

    #[test]
    fn unknown_verbs_and_bad_flags_are_usage_errors() {
        let settings = VerbSettings::default();
        assert_eq!(
            build_verb(&words("frobnicate"), &settings).err(),
            Some(UsageError::UnknownVerb("frobnicate".into()))
        );
        assert!(matches!(
            build_verb(&words("head -n notanumber"), &settings).err(),
            Some(UsageError::Invalid { .. })
        ));
    }

    #[test]
    fn builds_chains_in_order() {
        let verbs =
            build_verb_chain(&words("cat then head -n 1 then count"), &VerbSettings::default())
                .unwrap();
        assert_eq!(
            verbs.iter().map(|v| v.name()).collect::<Vec<_>>(),
            vec!["cat", "head", "count"]
        );
    }

    #[test]
    fn every_registered_verb_builds_with_minimal_flags() {
        let settings = VerbSettings::default();
        for (entry, args) in [
            ("cat", "cat"),
            ("count", "count"),
            ("head", "head"),
            ("join", "join -j id -f left.dkvp"),
            ("nothing", "nothing"),
            ("seqgen", "seqgen --stop 3"),
            ("tac", "tac"),
            ("tail", "tail"),
            ("tee", "tee out.dkvp"),
        ] {
            let verb = build_verb(&words(args), &settings).unwrap();
            assert_eq!(verb.name(), entry);
        }
        assert_eq!(VERBS.len(), 9);
    }
}
