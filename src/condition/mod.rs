//! The condition expression language.
//!
//! Metadata entries carry optional condition strings that decide, per
//! installed environment, whether the entry applies. A condition is a boolean
//! expression over predicates like `file("Foo.esp")`, `active("Foo.esp")`,
//! `checksum("Foo.esp", DEADBEEF)` and `version("Foo.esp", "1.0", >=)`,
//! combined with `and`, `or`, `not` and parentheses.
//!
//! Conditions are compiled once, when metadata is loaded, so that malformed
//! syntax fails fast instead of surfacing halfway through an evaluation pass.
//! Evaluation runs against an [*EvalSession*](crate::env::EvalSession), which
//! memoizes results per pass because predicates can be expensive (directory
//! scans, checksum computation).

mod eval;
mod parser;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// A comparison operator usable in a `version(...)` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparator {
    pub(crate) fn compare<T: Ord>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Gt => lhs > rhs,
            Self::Le => lhs <= rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// The compiled form of a condition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(bool),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),

    /// True when the named file exists under the data directory.
    /// The name may be a pattern, which triggers a directory scan.
    FileExists(String),

    /// True when the named plugin is in the active load order.
    /// The name may be a pattern.
    Active(String),

    /// True when the named file exists and its CRC-32 equals the given value.
    ChecksumMatches(String, u32),

    /// Compares the version read from the named file against a literal.
    VersionCheck(String, String, Comparator),
}

/// A condition string together with its compiled expression.
///
/// Parsing happens in [*Condition::parse*]; a *Condition* value therefore
/// always holds a syntactically valid expression. Deserializing from a string
/// goes through the same path, so a masterlist with a malformed condition is
/// rejected while it is being loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    raw: String,
    expr: Expr,
}

impl Condition {
    /// Compiles a condition string.
    ///
    /// Failure names the offending input; it is never silently treated as a
    /// false condition.
    pub fn parse(text: &str) -> Result<Self, ConditionError> {
        match parser::parse(text) {
            Ok(expr) => Ok(Self {
                raw: text.to_owned(),
                expr,
            }),
            Err(reason) => Err(ConditionError::Parse {
                condition: text.to_owned(),
                reason,
            }),
        }
    }

    /// The original condition text.
    pub fn text(&self) -> &str {
        &self.raw
    }

    /// Evaluates this condition against the session's environment.
    ///
    /// Results are memoized by the lower-cased condition text for the duration
    /// of the session's current pass; a repeated evaluation returns the cached
    /// boolean without re-running any predicate.
    pub fn eval(&self, session: &mut EvalSession) -> Result<bool, ConditionError> {
        trace!("Evaluating condition: {}", self.raw);

        let key = self.raw.to_lowercase();
        if let Some(cached) = session.cached_condition(&key) {
            return Ok(cached);
        }

        let value = eval::eval_expr(&self.expr, session)?;
        session.cache_condition(key, value);

        Ok(value)
    }
}

// Condition texts identify the same condition regardless of case, matching
// how evaluation results are cached.
impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.raw.to_lowercase() == other.raw.to_lowercase()
    }
}

impl Eq for Condition {}

impl TryFrom<String> for Condition {
    type Error = ConditionError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.raw
    }
}

#[cfg(test)]
mod tests;
