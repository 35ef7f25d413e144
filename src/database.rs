// ABOUTME: Database seam used by the cutover pipeline and the exporters
// ABOUTME: Defines the ArchiveDatabase trait plus the age filter and page request types

use crate::archive::CutoffInstant;
use crate::schema::{ColumnInfo, TableStructure};
use crate::value::CellValue;
use anyhow::Result;
use async_trait::async_trait;

/// Which side of the cutoff a row-age predicate selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeComparison {
    /// `column < cutoff`: rows that belong in the archive.
    OlderThan,
    /// Exact complement of `OlderThan`: `column >= cutoff` or `column IS NULL`.
    /// Rows without an age are never archived.
    NotOlderThan,
}

/// Row-age predicate. The cutoff is always sent as a bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeFilter {
    pub column: String,
    pub comparison: AgeComparison,
    pub cutoff: CutoffInstant,
}

impl AgeFilter {
    pub fn older_than(column: impl Into<String>, cutoff: CutoffInstant) -> Self {
        Self {
            column: column.into(),
            comparison: AgeComparison::OlderThan,
            cutoff,
        }
    }

    pub fn not_older_than(column: impl Into<String>, cutoff: CutoffInstant) -> Self {
        Self {
            column: column.into(),
            comparison: AgeComparison::NotOlderThan,
            cutoff,
        }
    }
}

/// One `LIMIT/OFFSET` window of an export scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

/// Operations the archive run needs from the database.
///
/// Every call is awaited in sequence on a single connection; implementations
/// must not retry. Errors carry context and are classified by the caller.
#[async_trait]
pub trait ArchiveDatabase: Send {
    /// Columns of `table` in ordinal order. Empty when the table does not exist.
    async fn table_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Verbatim structural definition of `table`.
    async fn show_create_table(&mut self, table: &str) -> Result<String>;

    async fn count_rows(&mut self, table: &str, filter: Option<&AgeFilter>) -> Result<u64>;

    /// Execute `structure.ddl` verbatim.
    async fn create_table(&mut self, structure: &TableStructure) -> Result<()>;

    /// Set-based `INSERT ... SELECT` of the rows matching `filter`. Returns rows inserted.
    async fn copy_rows(
        &mut self,
        from: &str,
        to: &str,
        columns: &[ColumnInfo],
        filter: &AgeFilter,
    ) -> Result<u64>;

    /// Returns rows deleted.
    async fn delete_rows(&mut self, table: &str, filter: &AgeFilter) -> Result<u64>;

    async fn rename_table(&mut self, from: &str, to: &str) -> Result<()>;

    async fn drop_table_if_exists(&mut self, table: &str) -> Result<()>;

    /// Current value of the session `time_zone` variable.
    async fn session_time_zone(&mut self) -> Result<String>;

    /// Set the session `time_zone`, which governs how TIMESTAMP values are read.
    async fn set_session_time_zone(&mut self, zone: &str) -> Result<()>;

    async fn lock_table_read(&mut self, table: &str) -> Result<()>;

    async fn unlock_tables(&mut self) -> Result<()>;

    /// One page of rows, values in the order of `columns`.
    async fn fetch_page(
        &mut self,
        table: &str,
        columns: &[ColumnInfo],
        page: PageRequest,
    ) -> Result<Vec<Vec<CellValue>>>;
}
