//! Name validation for values this layer introduces into generated SQL.
//!
//! Metric names and aliases are spliced into SQL by the downstream engine, so
//! they must be safe identifiers. Ingested table and column names are never
//! validated here: the live database owns structural identity, and a column
//! legally named `order` in its home database must still ingest cleanly.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum identifier length accepted across common dialects.
pub const MAX_NAME_LENGTH: usize = 64;

/// Keywords that would break generated SQL if used bare as a metric name or
/// alias. Deliberately small: only words that appear in the SELECT/JOIN
/// surface the downstream generator emits.
static UNSAFE_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "SELECT", "FROM", "WHERE", "JOIN", "ON", "AND", "OR", "NOT", "AS", "GROUP", "ORDER", "BY",
        "HAVING", "LIMIT", "OFFSET", "UNION", "DISTINCT", "CASE", "WHEN", "THEN", "ELSE", "END",
        "NULL", "TRUE", "FALSE", "IN", "BETWEEN", "LIKE", "IS", "ASC", "DESC", "INNER", "LEFT",
        "RIGHT", "OUTER", "CROSS", "WITH",
    ]
    .into_iter()
    .collect()
});

/// A single finding about a proposed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameIssue {
    Empty,
    TooLong { max: usize, actual: usize },
    InvalidCharacters { invalid: Vec<char> },
    StartsWithDigit,
    NoLetters,
    UnsafeKeyword { keyword: String },
    LeadingOrTrailingUnderscore,
}

impl std::fmt::Display for NameIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameIssue::Empty => write!(f, "name cannot be empty"),
            NameIssue::TooLong { max, actual } => {
                write!(f, "name is too long ({actual} chars, max {max})")
            }
            NameIssue::InvalidCharacters { invalid } => {
                let chars: String = invalid.iter().collect();
                write!(
                    f,
                    "name contains invalid characters '{chars}'; only letters, digits, and underscores are allowed"
                )
            }
            NameIssue::StartsWithDigit => write!(f, "name cannot start with a digit"),
            NameIssue::NoLetters => write!(f, "name must contain at least one letter"),
            NameIssue::UnsafeKeyword { keyword } => {
                write!(f, "'{keyword}' is a SQL keyword and cannot be used bare")
            }
            NameIssue::LeadingOrTrailingUnderscore => {
                write!(f, "name should not start or end with an underscore")
            }
        }
    }
}

/// Outcome of checking a name: errors block the edit, warnings do not.
#[derive(Debug, Clone, Default)]
pub struct NameCheck {
    pub errors: Vec<NameIssue>,
    pub warnings: Vec<NameIssue>,
}

impl NameCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// First error, if any, rendered for the caller.
    pub fn into_result(self) -> Result<(), String> {
        match self.errors.into_iter().next() {
            Some(issue) => Err(issue.to_string()),
            None => Ok(()),
        }
    }
}

/// Check a proposed SQL-safe name (metric name or alias).
pub fn check_sql_name(name: &str) -> NameCheck {
    let mut check = NameCheck::default();
    let trimmed = name.trim();

    if trimmed.is_empty() {
        check.errors.push(NameIssue::Empty);
        return check;
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        check.errors.push(NameIssue::TooLong {
            max: MAX_NAME_LENGTH,
            actual: trimmed.len(),
        });
    }

    let invalid: Vec<char> = trimmed
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && *c != '_')
        .collect();
    if !invalid.is_empty() {
        check.errors.push(NameIssue::InvalidCharacters { invalid });
    }

    if trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        check.errors.push(NameIssue::StartsWithDigit);
    }

    if !trimmed.chars().any(|c| c.is_ascii_alphabetic()) {
        check.errors.push(NameIssue::NoLetters);
    }

    if UNSAFE_KEYWORDS.contains(trimmed.to_uppercase().as_str()) {
        check.errors.push(NameIssue::UnsafeKeyword {
            keyword: trimmed.to_string(),
        });
    }

    if trimmed.starts_with('_') || trimmed.ends_with('_') {
        check.warnings.push(NameIssue::LeadingOrTrailingUnderscore);
    }

    check
}

/// Validate a metric name, returning the first problem as a message.
pub fn validate_metric_name(name: &str) -> Result<(), String> {
    check_sql_name(name).into_result()
}

/// Validate a table or column alias.
pub fn validate_alias(alias: &str) -> Result<(), String> {
    check_sql_name(alias).into_result()
}
