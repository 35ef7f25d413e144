// ABOUTME: Writes a self-contained SQL dump of one table using paged reads
// ABOUTME: Holds LOCK TABLES ... READ while paging and always releases it

use super::format::push_sql_literal;
use super::{
    create_staging_file, persist_staging_file, DumpFormat, ExportOptions, ExportSummary,
    ROWS_PER_INSERT, SQL_PAGE_SIZE,
};
use crate::database::{ArchiveDatabase, PageRequest};
use crate::schema::{inspect_table, ColumnInfo, TableStructure};
use crate::utils::quote_ident;
use crate::value::CellValue;
use anyhow::{Context, Result};
use std::io::{BufWriter, Write};

/// Session zone the rows are read in; matches the `TIME_ZONE` the dump sets on reload.
pub const DUMP_TIME_ZONE: &str = "+00:00";

/// Dump `table` as a script that recreates it and reloads every row.
///
/// The script opens with session settings that disable unique, foreign-key
/// and auto-increment checks, contains the table's `CREATE TABLE` text and
/// batched `INSERT` statements, and restores the session settings at the end.
/// Generated columns are left out of the insert column list.
pub async fn export_sql_dump<D>(
    db: &mut D,
    table: &str,
    options: &ExportOptions,
) -> Result<ExportSummary>
where
    D: ArchiveDatabase + ?Sized,
{
    let structure = inspect_table(db, table).await?;
    let path = options.file_path(table, DumpFormat::Sql);
    tracing::info!("Exporting table '{}' to SQL file {}", table, path.display());

    let mut staging = create_staging_file(&options.directory)?;
    let rows = {
        let mut out = BufWriter::new(staging.as_file_mut());
        write_header(&mut out, &structure, options)
            .with_context(|| format!("Failed to write SQL dump header to {}", path.display()))?;

        // TIMESTAMP values are read in UTC so they reload unchanged under the
        // dump's TIME_ZONE='+00:00'
        let previous_zone = db.session_time_zone().await?;
        db.set_session_time_zone(DUMP_TIME_ZONE).await?;

        let locked = db
            .lock_table_read(table)
            .await
            .with_context(|| format!("Failed to lock table '{}' for export", table));
        let dumped = match locked {
            Ok(()) => {
                let dumped = write_rows(db, &mut out, &structure).await;
                let unlocked = db.unlock_tables().await.with_context(|| {
                    format!("Failed to unlock table '{}' after export", table)
                });
                first_failure(dumped, unlocked)
            }
            Err(e) => Err(e),
        };
        let restored = db
            .set_session_time_zone(&previous_zone)
            .await
            .with_context(|| {
                format!("Failed to restore session time zone '{}'", previous_zone)
            });
        let rows = first_failure(dumped, restored)?;

        write_footer(&mut out, rows)
            .with_context(|| format!("Failed to write SQL dump footer to {}", path.display()))?;
        out.flush()
            .with_context(|| format!("Failed to flush SQL dump {}", path.display()))?;
        rows
    };

    persist_staging_file(staging, &path)?;
    tracing::info!("✓ Exported {} rows to {}", rows, path.display());

    Ok(ExportSummary {
        format: DumpFormat::Sql,
        path,
        rows,
    })
}

/// Keep the first error; a cleanup failure after an earlier error is only logged.
fn first_failure<T>(outcome: Result<T>, cleanup: Result<()>) -> Result<T> {
    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            tracing::warn!("Cleanup after failed export also failed: {:#}", cleanup_err);
            Err(e)
        }
    }
}

fn write_header<W: Write>(
    out: &mut W,
    structure: &TableStructure,
    options: &ExportOptions,
) -> std::io::Result<()> {
    let table = quote_ident(&structure.table);
    write!(
        out,
        "-- MySQL dump of table {name}\n\
         -- Host: {host}    Database: {database}\n\
         -- Generated: {generated}\n\
         -- ------------------------------------------------------\n\
         \n\
         SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0;\n\
         SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0;\n\
         SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO';\n\
         SET @OLD_TIME_ZONE=@@TIME_ZONE, TIME_ZONE='+00:00';\n\
         \n\
         --\n\
         -- Table structure for table {table}\n\
         --\n\
         \n\
         DROP TABLE IF EXISTS {table};\n\
         \n\
         {ddl};\n\
         \n\
         --\n\
         -- Dumping data for table {table}\n\
         --\n\
         \n\
         LOCK TABLES {table} WRITE;\n",
        name = structure.table,
        host = options.host,
        database = options.database,
        generated = options.generated_at.format("%Y-%m-%d %H:%M:%S"),
        table = table,
        ddl = structure.ddl.trim_end().trim_end_matches(';'),
    )
}

fn write_footer<W: Write>(out: &mut W, rows: u64) -> std::io::Result<()> {
    write!(
        out,
        "UNLOCK TABLES;\n\
         \n\
         --\n\
         -- Dump completed on {completed}\n\
         -- Total rows exported: {rows}\n\
         --\n\
         \n\
         SET SQL_MODE=@OLD_SQL_MODE;\n\
         SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;\n\
         SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS;\n\
         SET TIME_ZONE=@OLD_TIME_ZONE;\n",
        completed = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        rows = rows,
    )
}

async fn write_rows<D, W>(db: &mut D, out: &mut W, structure: &TableStructure) -> Result<u64>
where
    D: ArchiveDatabase + ?Sized,
    W: Write,
{
    let columns: Vec<ColumnInfo> = structure
        .columns
        .iter()
        .filter(|c| !c.generated)
        .cloned()
        .collect();
    let insert_prefix = insert_prefix(&structure.table, &columns);

    let mut total = 0u64;
    let mut offset = 0u64;
    loop {
        let page = db
            .fetch_page(
                &structure.table,
                &columns,
                PageRequest {
                    limit: SQL_PAGE_SIZE,
                    offset,
                },
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to read rows {}..{} of '{}'",
                    offset,
                    offset + SQL_PAGE_SIZE,
                    structure.table
                )
            })?;
        let fetched = page.len() as u64;

        for batch in page.chunks(ROWS_PER_INSERT) {
            write_insert(out, &insert_prefix, batch).context("Failed to write INSERT statement")?;
        }
        total += fetched;

        if fetched < SQL_PAGE_SIZE {
            break;
        }
        offset += SQL_PAGE_SIZE;
        tracing::info!("Exported {} rows...", total);
    }

    Ok(total)
}

fn insert_prefix(table: &str, columns: &[ColumnInfo]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(",");
    format!("INSERT INTO {} ({}) VALUES\n", quote_ident(table), column_list)
}

fn write_insert<W: Write>(out: &mut W, prefix: &str, rows: &[Vec<CellValue>]) -> std::io::Result<()> {
    let mut statement = prefix.as_bytes().to_vec();
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            statement.extend_from_slice(b",\n");
        }
        statement.push(b'(');
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                statement.push(b',');
            }
            push_sql_literal(value, &mut statement);
        }
        statement.push(b')');
    }
    statement.extend_from_slice(b";\n");
    out.write_all(&statement)
}
