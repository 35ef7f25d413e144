// ABOUTME: Table structure introspection, date column selection and identifier rewriting
// ABOUTME: Reads CREATE TABLE text and ordinal column metadata from the catalog

pub mod date_column;
pub mod rewrite;

pub use date_column::{select_date_column, DATE_COLUMN_PREFERENCE};
pub use rewrite::rewrite_structure;

use crate::database::ArchiveDatabase;
use crate::error::ArchiveError;

/// Column metadata from `information_schema.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Bare type name, e.g. `datetime`.
    pub data_type: String,
    /// Full declared type, e.g. `datetime(3)` or `tinyint(1)`.
    pub column_type: String,
    pub primary_key: bool,
    /// Virtual or stored generated column; never written by inserts.
    pub generated: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        let column_type = column_type.into();
        let data_type = column_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self {
            name: name.into(),
            data_type,
            column_type,
            primary_key: false,
            generated: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    pub fn is_date_time(&self) -> bool {
        matches!(
            self.data_type.to_ascii_lowercase().as_str(),
            "date" | "datetime" | "timestamp"
        )
    }

    /// MySQL has no boolean storage type; `BOOLEAN` is declared as `tinyint(1)`.
    pub fn is_boolean(&self) -> bool {
        let declared = self.column_type.to_ascii_lowercase();
        declared == "tinyint(1)" || declared == "boolean" || declared == "bool"
    }
}

/// Verbatim structural definition of a table plus its ordered columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStructure {
    pub table: String,
    pub ddl: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableStructure {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Read the structural definition and ordinal column list of `table`.
///
/// Read-only. A table with no catalog columns is reported as
/// `SchemaNotFound`; any driver failure becomes `CatalogQueryFailed`.
pub async fn inspect_table<D>(db: &mut D, table: &str) -> Result<TableStructure, ArchiveError>
where
    D: ArchiveDatabase + ?Sized,
{
    tracing::debug!("Inspecting structure of table '{}'", table);

    let columns = db
        .table_columns(table)
        .await
        .map_err(|source| ArchiveError::CatalogQueryFailed {
            table: table.to_string(),
            operation: "listing columns",
            source,
        })?;

    if columns.is_empty() {
        return Err(ArchiveError::SchemaNotFound {
            table: table.to_string(),
        });
    }

    let ddl = db
        .show_create_table(table)
        .await
        .map_err(|source| ArchiveError::CatalogQueryFailed {
            table: table.to_string(),
            operation: "reading CREATE TABLE",
            source,
        })?;

    tracing::debug!("Table '{}' has {} column(s)", table, columns.len());

    Ok(TableStructure {
        table: table.to_string(),
        ddl,
        columns,
    })
}
