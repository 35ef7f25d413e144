// ABOUTME: Streaming exporters that dump a table to SQL or CSV files page by page
// ABOUTME: Shared options, file naming and atomic temp-file persistence live here

pub mod csv_dump;
pub mod format;
pub mod sql_dump;

pub use csv_dump::export_csv_dump;
pub use sql_dump::export_sql_dump;

use crate::database::ArchiveDatabase;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Rows fetched per round trip by the SQL exporter.
pub const SQL_PAGE_SIZE: u64 = 1000;
/// Rows fetched per round trip by the CSV exporter.
pub const CSV_PAGE_SIZE: u64 = 5000;
/// Value tuples per `INSERT` statement in SQL dumps.
pub const ROWS_PER_INSERT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpFormat {
    Sql,
    Csv,
}

impl DumpFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DumpFormat::Sql => "sql",
            DumpFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpFormat::Sql => f.write_str("SQL"),
            DumpFormat::Csv => f.write_str("CSV"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub directory: PathBuf,
    /// Written into the SQL dump header.
    pub host: String,
    /// Written into the SQL dump header.
    pub database: String,
    /// Timestamp used in file names and the dump header.
    pub generated_at: NaiveDateTime,
}

impl ExportOptions {
    /// `<directory>/<table>_<YYYYMMDD_HHMMSS>.<ext>`
    pub fn file_path(&self, table: &str, format: DumpFormat) -> PathBuf {
        self.directory.join(format!(
            "{}_{}.{}",
            table,
            self.generated_at.format("%Y%m%d_%H%M%S"),
            format.extension()
        ))
    }
}

/// A finished dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub format: DumpFormat,
    pub path: PathBuf,
    pub rows: u64,
}

/// Dump `table` in the requested format.
pub async fn export_table<D>(
    db: &mut D,
    table: &str,
    format: DumpFormat,
    options: &ExportOptions,
) -> Result<ExportSummary>
where
    D: ArchiveDatabase + ?Sized,
{
    match format {
        DumpFormat::Sql => export_sql_dump(db, table, options).await,
        DumpFormat::Csv => export_csv_dump(db, table, options).await,
    }
}

/// Open a temporary file next to the final destination.
///
/// The dump is written here and only persisted over the final name once
/// complete, so a failed export never leaves a partial file behind.
pub(crate) fn create_staging_file(directory: &Path) -> Result<NamedTempFile> {
    fs::create_dir_all(directory).with_context(|| {
        format!("Failed to create export directory {}", directory.display())
    })?;

    NamedTempFile::new_in(directory)
        .with_context(|| format!("Failed to create temp export file in {}", directory.display()))
}

pub(crate) fn persist_staging_file(file: NamedTempFile, path: &Path) -> Result<()> {
    file.persist(path)
        .with_context(|| format!("Failed to persist export file {}", path.display()))?;
    Ok(())
}
