//! Typed errors for the cases callers need to tell apart.
//!
//! Most of the crate propagates `anyhow::Error` with context attached at each
//! I/O edge. The two enums here exist because the driver has to react to them
//! differently: a [`UsageError`] means "print usage and exit 1", and a
//! [`ChainError::Disconnected`] is a secondary symptom that must never mask the
//! root cause reported by another stage.

use thiserror::Error;

/// A violation of a verb's or the driver's command-line contract.
///
/// These are detected before any record flows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("{verb}: option {flag} requires an argument")]
    MissingArgument { verb: String, flag: String },

    #[error("{verb}: required option {flag} was not given")]
    MissingOption { verb: String, flag: String },

    #[error("{verb}: {detail}")]
    Invalid { verb: String, detail: String },

    #[error("join: left, right, and output join-field lists must have equal length (got {left}, {right}, {output})")]
    JoinFieldCountMismatch {
        left: usize,
        right: usize,
        output: usize,
    },

    #[error("join: all emission flags are off (--np without --ul or --ur); nothing would be emitted")]
    NoEmission,

    #[error("unknown verb \"{0}\"")]
    UnknownVerb(String),

    #[error("no verb supplied")]
    NoVerb,

    #[error("unsupported {direction} format \"{format}\"")]
    UnsupportedFormat { direction: &'static str, format: String },
}

impl UsageError {
    pub fn invalid(verb: &str, detail: impl Into<String>) -> Self {
        Self::Invalid {
            verb: verb.to_string(),
            detail: detail.into(),
        }
    }
}

/// Failures of the stage plumbing itself, as opposed to a verb's own logic.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A neighbouring stage went away; the real cause is reported by that stage.
    #[error("stage {stage} ({verb}): neighbouring stage disconnected")]
    Disconnected { stage: usize, verb: String },

    #[error("stage {stage} ({verb}) panicked")]
    Panicked { stage: usize, verb: String },

    #[error("record reader panicked")]
    ReaderPanicked,

    /// A logic defect: state that an earlier step guaranteed is missing.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl ChainError {
    /// True for errors that are only a consequence of some other stage failing.
    #[must_use]
    pub const fn is_secondary(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}
