//! Read-only statement validation.
//!
//! Uses sqlparser with the PostgreSQL dialect to classify generated SQL and
//! reject anything but single read-only queries. This is a safety gate, not
//! a SQL compiler: statements sqlparser cannot parse fall back to a leading
//! keyword check so that CTEs and dialect quirks are not over-rejected.

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::{ChartqlError, Result};
use crate::sql::StatementKind;

/// Statement keywords that must never reach execution.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TRUNCATE", "MERGE", "GRANT",
    "REVOKE", "CALL", "EXEC",
];

/// Validator that accepts only single read-only statements.
#[derive(Debug)]
pub struct SqlValidator {
    dialect: PostgreSqlDialect,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Validates the given SQL text, returning its classified kind.
    ///
    /// Fails on empty input, multiple statements, any mutating or DDL
    /// statement (naming the detected keyword), and statement kinds that
    /// are neither SELECT nor WITH.
    pub fn validate(&self, sql: &str) -> Result<StatementKind> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(ChartqlError::validation("Empty SQL query"));
        }

        match Parser::parse_sql(&self.dialect, trimmed) {
            Ok(statements) => {
                if statements.is_empty() {
                    return Err(ChartqlError::validation("Empty SQL query"));
                }
                if statements.len() > 1 {
                    return Err(ChartqlError::validation(
                        "Multiple SQL statements are not allowed",
                    ));
                }

                match classify_statement(&statements[0]) {
                    StatementKind::Forbidden(kw) => Err(ChartqlError::validation(format!(
                        "Only SELECT queries allowed. Detected: {kw}"
                    ))),
                    kind @ (StatementKind::Select | StatementKind::With) => Ok(kind),
                    StatementKind::Unknown => classify_by_leading_keyword(trimmed),
                }
            }
            // Unparseable text: fall back to the leading keyword so valid
            // dialect-specific CTEs are not rejected outright.
            Err(_) => classify_by_leading_keyword(trimmed),
        }
    }
}

/// Classifies a statement the parser could handle.
fn classify_statement(statement: &Statement) -> StatementKind {
    match statement {
        // A query may still hide mutations inside CTE bodies or derived
        // tables, so inspect it recursively before accepting.
        Statement::Query(query) => match find_mutation_in_query(query) {
            Some(kw) => StatementKind::Forbidden(kw.to_string()),
            None if query.with.is_some() => StatementKind::With,
            None => StatementKind::Select,
        },

        Statement::Insert { .. } => StatementKind::Forbidden("INSERT".to_string()),
        Statement::Update { .. } => StatementKind::Forbidden("UPDATE".to_string()),
        Statement::Delete { .. } => StatementKind::Forbidden("DELETE".to_string()),
        Statement::Merge { .. } => StatementKind::Forbidden("MERGE".to_string()),
        Statement::Truncate { .. } => StatementKind::Forbidden("TRUNCATE".to_string()),
        Statement::Drop { .. } => StatementKind::Forbidden("DROP".to_string()),
        Statement::Grant { .. } => StatementKind::Forbidden("GRANT".to_string()),
        Statement::Revoke { .. } => StatementKind::Forbidden("REVOKE".to_string()),
        Statement::Call { .. } => StatementKind::Forbidden("CALL".to_string()),

        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => StatementKind::Forbidden("ALTER".to_string()),

        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateProcedure { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. } => StatementKind::Forbidden("CREATE".to_string()),

        _ => StatementKind::Unknown,
    }
}

/// Accepts or rejects unparseable text by its first keyword.
fn classify_by_leading_keyword(sql: &str) -> Result<StatementKind> {
    let first = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_uppercase();

    if FORBIDDEN_KEYWORDS.contains(&first.as_str()) {
        return Err(ChartqlError::validation(format!(
            "Only SELECT queries allowed. Detected: {first}"
        )));
    }

    match first.as_str() {
        "SELECT" | "WITH" => Ok(StatementKind::Unknown),
        other => Err(ChartqlError::validation(format!(
            "Statement type not allowed: {other}"
        ))),
    }
}

/// Searches a query for data-modifying operations hidden in CTE bodies,
/// nested queries or derived tables. Returns the first keyword found.
fn find_mutation_in_query(query: &Query) -> Option<&'static str> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            if let Some(kw) = find_mutation_in_query(&cte.query) {
                return Some(kw);
            }
        }
    }
    find_mutation_in_set_expr(&query.body)
}

fn find_mutation_in_set_expr(set_expr: &SetExpr) -> Option<&'static str> {
    match set_expr {
        SetExpr::Insert { .. } => Some("INSERT"),
        SetExpr::Update { .. } => Some("UPDATE"),
        SetExpr::Delete { .. } => Some("DELETE"),
        SetExpr::Merge { .. } => Some("MERGE"),
        SetExpr::Query(query) => find_mutation_in_query(query),
        SetExpr::Select(select) => select.from.iter().find_map(find_mutation_in_table),
        SetExpr::SetOperation { left, right, .. } => {
            find_mutation_in_set_expr(left).or_else(|| find_mutation_in_set_expr(right))
        }
        // Values and bare-table bodies carry no nested query to inspect.
        _ => None,
    }
}

fn find_mutation_in_table(twj: &TableWithJoins) -> Option<&'static str> {
    find_mutation_in_factor(&twj.relation).or_else(|| {
        twj.joins
            .iter()
            .find_map(|join| find_mutation_in_factor(&join.relation))
    })
}

fn find_mutation_in_factor(factor: &TableFactor) -> Option<&'static str> {
    match factor {
        TableFactor::Derived { subquery, .. } => find_mutation_in_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => find_mutation_in_table(table_with_joins),
        _ => None,
    }
}
