// ABOUTME: The ordered, non-resumable cutover that moves old rows into an archive table
// ABOUTME: Inspect, count, create, copy, verify, delete, swap, then best-effort export

use super::plan::{CutoffInstant, RowCounts, RunNames};
use super::{ArchiveOutcome, ArchiveReport, ArchiveRequest, CutoverState};
use crate::database::{AgeFilter, ArchiveDatabase};
use crate::error::ArchiveError;
use crate::export::{export_table, ExportOptions};
use crate::schema::{inspect_table, rewrite_structure, select_date_column};
use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

fn advance(state: &mut CutoverState, next: CutoverState) {
    debug!("Cutover state: {} -> {}", state, next);
    *state = next;
}

/// Run one archive of `request.table` against `db`.
///
/// `reference` is the run's start instant: it fixes the cutoff, the
/// `<YYYYMMDD>` suffix of the working and archive tables, and the export
/// file timestamps.
///
/// The working table is built from the rows that stay (`age >= cutoff`, or
/// no age at all),
/// those rows are then removed from the original so it holds exactly the
/// archive set, and finally the two tables trade names:
///
/// ```text
/// orders            -> orders_archive_<date>   (rows older than the cutoff)
/// orders_<date>     -> orders                  (all other rows)
/// ```
///
/// Steps before Create never modify a table. From Create onward the sequence
/// is not transactional; every error names the tables involved and, for the
/// renames, the statement that completes the swap by hand. Export failures
/// never fail the run and are returned in the report instead.
pub async fn run_archive<D>(
    db: &mut D,
    request: &ArchiveRequest,
    reference: NaiveDateTime,
) -> Result<ArchiveReport, ArchiveError>
where
    D: ArchiveDatabase + ?Sized,
{
    request.validate()?;
    let names = RunNames::new(&request.table, reference.date())?;
    let cutoff = CutoffInstant::from_reference(reference, request.retention_days)?;
    let mut state = CutoverState::Init;

    info!(
        "Archiving table '{}': retention {} days, cutoff {}",
        names.original, request.retention_days, cutoff
    );

    // Step 1: inspect
    info!("Step 1: Inspecting table '{}'", names.original);
    let structure = inspect_table(db, &names.original).await?;
    let date_column = select_date_column(
        &names.original,
        &structure.columns,
        request.date_column.as_deref(),
    )?;
    info!("Using date column '{}'", date_column);
    advance(&mut state, CutoverState::Inspected);

    // Step 2: count
    info!("Step 2: Counting rows on each side of {}", cutoff);
    let archive_filter = AgeFilter::older_than(&date_column, cutoff);
    let keep_filter = AgeFilter::not_older_than(&date_column, cutoff);
    let counts = RowCounts {
        archive: count(db, &names.original, Some(&archive_filter)).await?,
        keep: count(db, &names.original, Some(&keep_filter)).await?,
    };
    info!(
        "Rows to archive: {}, rows to keep: {}",
        counts.archive, counts.keep
    );
    advance(&mut state, CutoverState::Counted);

    let mut report = ArchiveReport {
        names,
        date_column,
        cutoff,
        counts,
        outcome: ArchiveOutcome::NothingToArchive,
        final_state: state,
        deleted_rows: None,
        exports: Vec::new(),
        export_failures: Vec::new(),
    };

    if counts.archive == 0 {
        info!("No rows older than {}; nothing to archive", cutoff);
        return Ok(report);
    }

    // Step 3: dry run
    if request.dry_run {
        info!("Step 3: Dry run, no tables will be created or modified");
        info!(
            "Would create '{}' with {} kept rows, delete them from '{}', \
             rename '{}' to '{}' ({} rows) and '{}' to '{}'",
            report.names.working,
            counts.keep,
            report.names.original,
            report.names.original,
            report.names.archive,
            counts.archive,
            report.names.working,
            report.names.original
        );
        advance(&mut state, CutoverState::DryRunReported);
        report.outcome = ArchiveOutcome::DryRun;
        report.final_state = state;
        return Ok(report);
    }

    let names = report.names.clone();

    // Step 4: create
    info!("Step 4: Creating working table '{}'", names.working);
    let rewritten = rewrite_structure(&structure, &names.working, &names.suffix)?;
    db.create_table(&rewritten)
        .await
        .map_err(|source| ArchiveError::CreateFailed {
            table: names.working.clone(),
            source,
        })?;
    advance(&mut state, CutoverState::Created);

    // Step 5: copy the rows that stay
    info!(
        "Step 5: Copying {} kept rows into '{}'",
        counts.keep, names.working
    );
    match db
        .copy_rows(&names.original, &names.working, &structure.columns, &keep_filter)
        .await
    {
        Ok(copied) => info!("Copied {} rows", copied),
        Err(source) => {
            error!("Copy into '{}' failed: {:#}", names.working, source);
            let working_table_dropped = match db.drop_table_if_exists(&names.working).await {
                Ok(()) => {
                    info!("Dropped working table '{}'", names.working);
                    true
                }
                Err(drop_err) => {
                    warn!(
                        "Failed to drop working table '{}': {:#}",
                        names.working, drop_err
                    );
                    false
                }
            };
            return Err(ArchiveError::CopyFailed {
                from: names.original.clone(),
                to: names.working.clone(),
                working_table_dropped,
                source,
            });
        }
    }
    advance(&mut state, CutoverState::Copied);

    // Step 6: verify
    info!("Step 6: Verifying row count of '{}'", names.working);
    let copied = db
        .count_rows(&names.working, None)
        .await
        .map_err(|source| ArchiveError::VerifyFailed {
            table: names.working.clone(),
            original: names.original.clone(),
            source,
        })?;
    if copied != counts.keep {
        error!(
            "Working table '{}' holds {} rows, expected keep count {}",
            names.working, copied, counts.keep
        );
        return Err(ArchiveError::RecordCountMismatch {
            table: names.working.clone(),
            expected: counts.keep,
            actual: copied,
        });
    }
    info!("✓ Working table holds the keep count of {} rows", copied);
    advance(&mut state, CutoverState::Verified);

    // Step 7: delete the copied rows from the original
    info!(
        "Step 7: Removing kept rows from '{}' so it holds only the archive set",
        names.original
    );
    let deleted = db
        .delete_rows(&names.original, &keep_filter)
        .await
        .map_err(|source| ArchiveError::DeleteFailed {
            table: names.original.clone(),
            working: names.working.clone(),
            source,
        })?;
    if deleted != counts.keep {
        warn!(
            "Deleted {} rows from '{}' but counted {} to keep; the table may have been written concurrently",
            deleted, names.original, counts.keep
        );
    } else {
        info!("Deleted {} rows", deleted);
    }
    report.deleted_rows = Some(deleted);
    advance(&mut state, CutoverState::Deleted);

    // Step 8: swap names
    info!(
        "Step 8: Renaming '{}' to '{}'",
        names.original, names.archive
    );
    db.rename_table(&names.original, &names.archive)
        .await
        .map_err(|source| ArchiveError::RenameFailed {
            from: names.original.clone(),
            to: names.archive.clone(),
            recovery: names.recovery_for_first_rename(),
            source,
        })?;

    info!("Renaming '{}' to '{}'", names.working, names.original);
    db.rename_table(&names.working, &names.original)
        .await
        .map_err(|source| ArchiveError::RenameFailed {
            from: names.working.clone(),
            to: names.original.clone(),
            recovery: names.recovery_for_second_rename(),
            source,
        })?;
    advance(&mut state, CutoverState::Swapped);
    report.outcome = ArchiveOutcome::Archived;
    info!(
        "✓ Archived {} rows into '{}'; '{}' now holds {} rows",
        counts.archive, names.archive, names.original, counts.keep
    );

    // Step 9: export
    let formats = request.export.formats();
    if !formats.is_empty() {
        info!("Step 9: Exporting '{}'", names.archive);
        let options = ExportOptions {
            directory: request.export.directory.clone(),
            host: request.export.host.clone(),
            database: request.export.database.clone(),
            generated_at: reference,
        };

        for format in formats {
            match export_table(db, &names.archive, format, &options).await {
                Ok(summary) => report.exports.push(summary),
                Err(source) => {
                    warn!(
                        "{} export of '{}' failed, archive tables are unaffected: {:#}",
                        format, names.archive, source
                    );
                    report.export_failures.push(ArchiveError::ExportFailed {
                        table: names.archive.clone(),
                        format,
                        source,
                    });
                }
            }
        }

        if report.export_failures.is_empty() {
            advance(&mut state, CutoverState::Exported);
        }
    }

    report.final_state = state;
    Ok(report)
}

async fn count<D>(
    db: &mut D,
    table: &str,
    filter: Option<&AgeFilter>,
) -> Result<u64, ArchiveError>
where
    D: ArchiveDatabase + ?Sized,
{
    db.count_rows(table, filter)
        .await
        .map_err(|source| ArchiveError::CountFailed {
            table: table.to_string(),
            source,
        })
}
