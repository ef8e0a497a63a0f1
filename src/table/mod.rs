//! Tabular query results.
//!
//! `ResultTable` is the typed-table abstraction the chart inferencer works
//! on: every column carries a type tag decided once at construction, after a
//! best-effort numeric coercion pass over textually-numeric columns.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Number of rows included in the textual preview.
const PREVIEW_ROWS: usize = 5;

/// A single cell value from a query result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    Text(String),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the numeric form of this value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Converts the value to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Inferred type of a result column, decided once at table construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Boolean,
    Text,
}

/// A result column: name plus inferred type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name as returned by the database.
    pub name: String,

    /// Type inferred from the column's values.
    pub column_type: ColumnType,
}

/// A row of cell values.
pub type Row = Vec<Value>;

/// An ordered rectangular grid of named, typed columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultTable {
    columns: Vec<TableColumn>,
    rows: Vec<Row>,
}

impl ResultTable {
    /// Builds a table from raw column names and rows.
    ///
    /// Coerces textually-numeric columns to numbers (column-level,
    /// all-or-nothing) and infers each column's type tag. Rows are expected
    /// to be rectangular; short rows are padded with NULL.
    pub fn new(column_names: Vec<String>, mut rows: Vec<Row>) -> Self {
        let width = column_names.len();
        for row in &mut rows {
            row.resize(width, Value::Null);
        }

        for col in 0..width {
            coerce_numeric_column(&mut rows, col);
        }

        let columns = column_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| TableColumn {
                name,
                column_type: infer_column_type(&rows, i),
            })
            .collect();

        Self { columns, rows }
    }

    /// Creates an empty table with no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the column metadata.
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Returns true if every cell in the table is NULL.
    ///
    /// An empty table has no cells and is not considered all-null.
    pub fn is_all_null(&self) -> bool {
        !self.rows.is_empty()
            && !self.columns.is_empty()
            && self.rows.iter().flatten().all(Value::is_null)
    }

    /// Returns the index of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the values of the named column.
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        match self.column_index(name) {
            Some(i) => self.rows.iter().map(|row| &row[i]).collect(),
            None => Vec::new(),
        }
    }

    /// Counts the distinct non-null display values of the named column.
    pub fn distinct_count(&self, name: &str) -> usize {
        let mut seen = HashSet::new();
        for value in self.column_values(name) {
            if !value.is_null() {
                seen.insert(value.to_display_string());
            }
        }
        seen.len()
    }

    /// Returns names of numeric columns, in table order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Numeric)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Returns names of non-numeric, non-boolean columns, in table order.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Text)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Returns true if this is the single-cell "message" shape used by the
    /// fallback generator to carry a user-facing notice.
    pub fn is_message_table(&self) -> bool {
        self.rows.len() == 1 && self.columns.len() == 1 && self.columns[0].name == "message"
    }

    /// Returns the message text if this is a message table.
    pub fn message(&self) -> Option<String> {
        if self.is_message_table() {
            Some(self.rows[0][0].to_display_string())
        } else {
            None
        }
    }

    /// Renders the first rows as aligned text, in the spirit of a dataframe
    /// head() dump.
    pub fn preview(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let shown = self.rows.iter().take(PREVIEW_ROWS);
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.len()).collect();
        let mut cells: Vec<Vec<String>> = Vec::new();
        for row in shown {
            let rendered: Vec<String> = row.iter().map(Value::to_display_string).collect();
            for (i, cell) in rendered.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
            cells.push(rendered);
        }

        let header = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:>width$}", c.name, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ");

        let mut lines = vec![header];
        for row in cells {
            let line = row
                .iter()
                .enumerate()
                .map(|(i, cell)| format!("{:>width$}", cell, width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ");
            lines.push(line);
        }

        lines.join("\n")
    }
}

/// Rewrites a column's text cells as numbers when every non-null cell in the
/// column parses as one. All-or-nothing: a single non-numeric cell leaves
/// the whole column untouched.
fn coerce_numeric_column(rows: &mut [Row], col: usize) {
    let mut saw_value = false;
    for row in rows.iter() {
        match &row[col] {
            Value::Null | Value::Int(_) | Value::Float(_) => {}
            Value::Text(s) => {
                if s.trim().parse::<f64>().is_err() {
                    return;
                }
                saw_value = true;
            }
            Value::Bool(_) => return,
        }
    }
    if !saw_value {
        return;
    }

    for row in rows.iter_mut() {
        if let Value::Text(s) = &row[col] {
            let trimmed = s.trim();
            row[col] = match trimmed.parse::<i64>() {
                Ok(i) => Value::Int(i),
                // Unwrap is safe: the scan above proved the parse succeeds.
                Err(_) => Value::Float(trimmed.parse::<f64>().unwrap()),
            };
        }
    }
}

/// Infers a column's type from its non-null values.
fn infer_column_type(rows: &[Row], col: usize) -> ColumnType {
    let mut saw_numeric = false;
    let mut saw_bool = false;
    let mut saw_text = false;

    for row in rows {
        match &row[col] {
            Value::Null => {}
            Value::Int(_) | Value::Float(_) => saw_numeric = true,
            Value::Bool(_) => saw_bool = true,
            Value::Text(_) => saw_text = true,
        }
    }

    if saw_numeric && !saw_bool && !saw_text {
        ColumnType::Numeric
    } else if saw_bool && !saw_numeric && !saw_text {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}
