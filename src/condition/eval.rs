//! Evaluation of compiled condition expressions.

use regex::{Regex, RegexBuilder};

use super::{Comparator, Expr};
use crate::metadata::is_name_pattern;
use crate::prelude::*;
use crate::version::Version;

pub(super) fn eval_expr(
    expr: &Expr,
    session: &mut EvalSession,
) -> Result<bool, ConditionError> {
    match expr {
        Expr::Literal(value) => Ok(*value),
        Expr::Not(inner) => Ok(!eval_expr(inner, session)?),
        Expr::And(lhs, rhs) => Ok(eval_expr(lhs, session)? && eval_expr(rhs, session)?),
        Expr::Or(lhs, rhs) => Ok(eval_expr(lhs, session)? || eval_expr(rhs, session)?),

        Expr::FileExists(name) => {
            if is_name_pattern(name) {
                let regex = compile_pattern(name)?;
                let names = session.installed_names()?;
                Ok(names.iter().any(|n| regex.is_match(n)))
            } else {
                session.file_exists(name)
            }
        }

        Expr::Active(name) => {
            if is_name_pattern(name) {
                let regex = compile_pattern(name)?;
                let names = session.installed_names()?;
                Ok(names
                    .iter()
                    .any(|n| regex.is_match(n) && session.env().is_plugin_active(n)))
            } else {
                Ok(session.env().is_plugin_active(name))
            }
        }

        Expr::ChecksumMatches(name, crc) => {
            Ok(session.crc_of(name)?.is_some_and(|actual| actual == *crc))
        }

        Expr::VersionCheck(name, wanted, cmp) => eval_version_check(name, wanted, *cmp, session),
    }
}

/// A nonexistent file fails every version comparison except `!=`.
/// A file that exists but has no readable version is treated as version "0".
fn eval_version_check(
    name: &str,
    wanted: &str,
    cmp: Comparator,
    session: &mut EvalSession,
) -> Result<bool, ConditionError> {
    if !session.file_exists(name)? {
        return Ok(cmp == Comparator::Ne);
    }

    let actual = session
        .file_version(name)?
        .map_or_else(|| Version::new("0"), Version::new);

    Ok(cmp.compare(&actual, &Version::new(wanted)))
}

/// Compiles a pattern argument as a case-insensitive, fully anchored regex.
fn compile_pattern(pattern: &str) -> Result<Regex, ConditionError> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .map_err(|source| ConditionError::InvalidRegex {
            pattern: pattern.to_owned(),
            source,
        })
}
