//! Schema context for prompt construction.
//!
//! Loads the schema metadata JSON produced by the ingestion tooling and
//! renders an LLM-friendly textual description of tables, columns, primary
//! keys and foreign keys.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ChartqlError, Result};

/// Schema metadata document as stored on disk.
///
/// Shape: `{tables: [{table_name, primary_key, columns: [...], foreign_keys: [...]}]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Database name the metadata was generated from, if recorded.
    #[serde(default)]
    pub database: Option<String>,

    /// SQL dialect the metadata targets, if recorded.
    #[serde(default)]
    pub dialect: Option<String>,

    /// All tables in the schema.
    #[serde(default)]
    pub tables: Vec<TableMeta>,
}

/// Metadata for a single table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableMeta {
    /// Table name.
    pub table_name: String,

    /// Primary key column name.
    pub primary_key: String,

    /// Ordered column list.
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,

    /// Foreign key relationships originating from this table.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyMeta>,
}

/// Metadata for a single column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,

    /// Declared data type (e.g. "INTEGER", "TEXT", "DATE").
    pub data_type: String,

    /// Whether the column allows NULL values.
    #[serde(default)]
    pub nullable: bool,
}

/// A foreign key from one column to another table's column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKeyMeta {
    /// Source column name.
    pub column: String,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced column name.
    pub ref_column: String,
}

/// In-memory index over the schema metadata.
///
/// Constructed once at startup and shared by reference for the lifetime of
/// the process. Table names are unique; foreign key targets are checked
/// best-effort at build time and only warned about, never re-validated when
/// queries run.
#[derive(Debug, Clone)]
pub struct SchemaContext {
    document: SchemaDocument,
    table_index: HashMap<String, usize>,
}

impl SchemaContext {
    /// Builds a context from an already-parsed document.
    pub fn new(document: SchemaDocument) -> Result<Self> {
        let mut table_index = HashMap::with_capacity(document.tables.len());
        for (i, table) in document.tables.iter().enumerate() {
            if table_index.insert(table.table_name.clone(), i).is_some() {
                return Err(ChartqlError::schema(format!(
                    "Duplicate table name in schema metadata: {}",
                    table.table_name
                )));
            }
        }

        let context = Self {
            document,
            table_index,
        };
        context.check_foreign_keys();
        Ok(context)
    }

    /// Loads schema metadata from a JSON file.
    ///
    /// A missing or unparseable file is fatal: the pipeline cannot build
    /// prompts without schema context.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChartqlError::schema(format!(
                "Schema metadata file not found: {}: {}",
                path.display(),
                e
            ))
        })?;

        let document: SchemaDocument = serde_json::from_str(&content).map_err(|e| {
            ChartqlError::schema(format!(
                "Invalid schema metadata in {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::new(document)
    }

    /// Warns about foreign keys pointing at tables or columns that do not
    /// exist in this context.
    fn check_foreign_keys(&self) {
        for table in &self.document.tables {
            for fk in &table.foreign_keys {
                match self.table(&fk.ref_table) {
                    None => warn!(
                        "Foreign key {}.{} references unknown table {}",
                        table.table_name, fk.column, fk.ref_table
                    ),
                    Some(target) => {
                        if !target.columns.iter().any(|c| c.name == fk.ref_column) {
                            warn!(
                                "Foreign key {}.{} references unknown column {}.{}",
                                table.table_name, fk.column, fk.ref_table, fk.ref_column
                            );
                        }
                    }
                }
            }
        }
    }

    /// Returns the table metadata for the given table name.
    pub fn table(&self, name: &str) -> Option<&TableMeta> {
        self.table_index
            .get(name)
            .map(|&i| &self.document.tables[i])
    }

    /// Returns all table names in document order.
    pub fn table_names(&self) -> Vec<&str> {
        self.document
            .tables
            .iter()
            .map(|t| t.table_name.as_str())
            .collect()
    }

    /// Returns the column names of a table.
    pub fn columns(&self, table_name: &str) -> Option<Vec<&str>> {
        self.table(table_name)
            .map(|t| t.columns.iter().map(|c| c.name.as_str()).collect())
    }

    /// Returns the primary key column of a table.
    pub fn primary_key(&self, table_name: &str) -> Option<&str> {
        self.table(table_name).map(|t| t.primary_key.as_str())
    }

    /// Returns the foreign keys of a table.
    pub fn foreign_keys(&self, table_name: &str) -> &[ForeignKeyMeta] {
        self.table(table_name)
            .map(|t| t.foreign_keys.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the names of tables that contain the given column.
    pub fn find_tables_by_column(&self, column_name: &str) -> Vec<&str> {
        self.document
            .tables
            .iter()
            .filter(|t| t.columns.iter().any(|c| c.name == column_name))
            .map(|t| t.table_name.as_str())
            .collect()
    }

    /// Renders a textual description of the schema for LLM prompts.
    ///
    /// One block per table listing columns, primary key and foreign keys.
    pub fn schema_text(&self) -> String {
        let blocks: Vec<String> = self
            .document
            .tables
            .iter()
            .map(format_table_block)
            .collect();
        blocks.join("\n")
    }
}

fn format_table_block(table: &TableMeta) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let fks = if table.foreign_keys.is_empty() {
        "None".to_string()
    } else {
        table
            .foreign_keys
            .iter()
            .map(|fk| format!("{} -> {}.{}", fk.column, fk.ref_table, fk.ref_column))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Table: {}\nColumns: {}\nPrimary Key: {}\nForeign Keys: {}\n",
        table.table_name, columns, table.primary_key, fks
    )
}
