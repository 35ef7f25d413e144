// ABOUTME: Writes a table to CSV with a header row, one page of rows at a time
// ABOUTME: Pages are independent queries; no lock is held across them

use super::format::csv_field;
use super::{
    create_staging_file, persist_staging_file, DumpFormat, ExportOptions, ExportSummary,
    CSV_PAGE_SIZE,
};
use crate::database::{ArchiveDatabase, PageRequest};
use crate::schema::inspect_table;
use anyhow::{Context, Result};

/// Dump every column of `table` to `<table>_<timestamp>.csv`.
///
/// The first line holds the column names in ordinal order. Fields are quoted
/// only when they contain a delimiter, quote or line break. The source table
/// may change between pages; use the SQL exporter for a locked snapshot.
pub async fn export_csv_dump<D>(
    db: &mut D,
    table: &str,
    options: &ExportOptions,
) -> Result<ExportSummary>
where
    D: ArchiveDatabase + ?Sized,
{
    let structure = inspect_table(db, table).await?;
    let path = options.file_path(table, DumpFormat::Csv);
    tracing::info!("Exporting table '{}' to CSV file {}", table, path.display());

    let mut staging = create_staging_file(&options.directory)?;
    let mut total = 0u64;
    {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(staging.as_file_mut());

        writer
            .write_record(structure.column_names())
            .context("Failed to write CSV header")?;

        let mut offset = 0u64;
        loop {
            let page = db
                .fetch_page(
                    table,
                    &structure.columns,
                    PageRequest {
                        limit: CSV_PAGE_SIZE,
                        offset,
                    },
                )
                .await
                .with_context(|| {
                    format!(
                        "Failed to read rows {}..{} of '{}'",
                        offset,
                        offset + CSV_PAGE_SIZE,
                        table
                    )
                })?;
            let fetched = page.len() as u64;

            for row in &page {
                writer
                    .write_record(row.iter().map(csv_field))
                    .context("Failed to write CSV row")?;
            }
            writer
                .flush()
                .with_context(|| format!("Failed to flush CSV file {}", path.display()))?;
            total += fetched;

            if fetched > 0 {
                tracing::info!("Exported {} rows to CSV...", total);
            }
            if fetched < CSV_PAGE_SIZE {
                break;
            }
            offset += CSV_PAGE_SIZE;
        }
    }

    persist_staging_file(staging, &path)?;
    tracing::info!("✓ Exported {} rows to {}", total, path.display());

    Ok(ExportSummary {
        format: DumpFormat::Csv,
        path,
        rows: total,
    })
}
