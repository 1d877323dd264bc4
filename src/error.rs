//! This module contains the errors used all over this codebase.

use std::{io, path::PathBuf};

use crate::prelude::*;

/// Convenience wrapper around *Result<T, AppError>*.
pub type AppResult<T> = Result<T, AppError>;

/// Error returned by several functions in Loadstone.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error returned by failing IO operations.
    /// Most of these will occur while probing the game's data directory.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error returned by the condition language, at parse or evaluation time.
    #[error(transparent)]
    Condition(#[from] ConditionError),

    /// Error returned by invalid metadata values.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Error returned by a failed sort attempt.
    #[error(transparent)]
    Sort(#[from] SortError),
}

/// An error produced by the condition expression language.
///
/// Parse errors are raised when metadata is loaded, never at evaluation time;
/// a condition that fails to parse is a hard error, not a false result.
#[derive(Error, Debug)]
pub enum ConditionError {
    /// The condition text is not valid syntax.
    #[error("failed to parse condition \"{condition}\": {reason}")]
    Parse {
        /// The full text of the offending condition.
        condition: String,

        /// What went wrong, and where.
        reason: String,
    },

    /// A name argument inside a condition is a pattern, but it is not a valid regex.
    #[error("invalid regex \"{pattern}\" in a condition")]
    InvalidRegex {
        /// The pattern that failed to compile.
        pattern: String,

        #[source]
        source: regex::Error,
    },

    /// An IO failure occurred while probing a file during evaluation.
    #[error("failed to probe \"{path}\" while evaluating a condition")]
    Probe {
        /// The file that was being probed.
        path: PathBuf,

        #[source]
        source: io::Error,
    },
}

/// An error caused by an invalid metadata value.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// A priority magnitude at or beyond the global priority divisor cannot be represented.
    #[error(
        "cannot set a priority with an absolute value at or above {}, got {0}",
        crate::metadata::GLOBAL_PRIORITY_DIVISOR
    )]
    PriorityOutOfRange(i64),

    /// A plugin name that looks like a pattern entry is not a valid regex.
    #[error("plugin name pattern \"{pattern}\" is not a valid regex")]
    InvalidNamePattern {
        /// The name that was treated as a pattern.
        pattern: String,

        #[source]
        source: regex::Error,
    },

    /// A message with content in several languages must include an English entry.
    #[error("multilingual messages must contain an English content string")]
    MissingEnglishContent,

    /// A referenced masterlist or userlist path does not exist.
    #[error("the metadata list at \"{}\" does not exist", .0.display())]
    ListNotFound(PathBuf),
}

/// An error returned by a failed sort attempt.
#[derive(Error, Debug)]
pub enum SortError {
    /// The plugin graph contains a cycle, named by the two plugins on the
    /// detected back edge. Cycles are never broken automatically; the caller
    /// must let the user fix the metadata responsible and retry.
    #[error("cyclic interaction detected between plugins \"{0}\" and \"{1}\"")]
    Cycle(String, String),
}
