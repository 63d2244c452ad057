//! Read-only SQL guard
//!
//! Every query, typed by a user or generated by the model, passes through here
//! before it reaches the store:
//! - Must start with SELECT or WITH
//! - Only one statement (trailing semicolons are tolerated)
//! - No mutating keyword anywhere in the text, matched as a whole word
//!
//! Deny by default: anything that is not clearly a single read query is rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::error::{AppError, Result};
use crate::domain::query::ValidatedQuery;

pub const DENIED_KEYWORDS: [&str; 9] = [
    "insert", "update", "delete", "drop", "alter", "truncate", "create", "grant", "revoke",
];

static DENIED_KEYWORD_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    DENIED_KEYWORDS
        .iter()
        .map(|kw| (*kw, Regex::new(&format!(r"\b{}\b", kw)).unwrap()))
        .collect()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlGuard;

impl SqlGuard {
    pub fn new() -> Self {
        Self
    }

    /// Accept `sql` as a read-only query or return the first rule it breaks.
    pub fn validate(&self, sql: &str) -> Result<ValidatedQuery> {
        if let Some(violation) = self.violations(sql).into_iter().next() {
            return Err(violation);
        }

        let statement = sql.trim().trim_end_matches(';').trim_end();
        Ok(ValidatedQuery::new(statement.to_string()))
    }

    /// Every rule `sql` breaks, in rule order. Empty when the query is acceptable.
    pub fn violations(&self, sql: &str) -> Vec<AppError> {
        let normalized = sql.trim().to_lowercase();
        let mut violations = Vec::new();

        if !(normalized.starts_with("select") || normalized.starts_with("with")) {
            violations.push(AppError::NotAReadQuery);
        }

        if normalized.trim_end_matches(';').contains(';') {
            violations.push(AppError::MultipleStatements);
        }

        for (keyword, pattern) in DENIED_KEYWORD_PATTERNS.iter() {
            if pattern.is_match(&normalized) {
                violations.push(AppError::DisallowedKeyword(keyword.to_string()));
            }
        }

        violations
    }
}
