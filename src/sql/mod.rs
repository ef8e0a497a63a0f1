//! SQL sanitization and safety validation.
//!
//! A generated statement moves raw -> cleaned -> validated; only validated
//! read-only statements may reach execution.

mod sanitizer;
mod validator;

pub use sanitizer::{contains_statement_separator, sanitize};
pub use validator::SqlValidator;

use std::fmt;

/// Classified kind of a SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// A plain SELECT query.
    Select,
    /// A common table expression (WITH ... SELECT).
    With,
    /// A data- or schema-mutating statement; carries the detected keyword.
    Forbidden(String),
    /// Kind could not be determined from the text.
    Unknown,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::With => write!(f, "WITH (CTE)"),
            Self::Forbidden(kw) => write!(f, "{}", kw),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
