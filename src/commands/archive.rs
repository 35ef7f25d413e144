// ABOUTME: Archive command implementation
// ABOUTME: Resolves settings, confirms with the operator, connects and runs the cutover

use crate::archive::{run_archive, ArchiveOutcome, ArchiveReport, ArchiveRequest, ExportSettings};
use crate::config::{ArchiveConfig, ConnectionOverrides, ConnectionSettings};
use crate::error::ArchiveError;
use crate::mysql::MysqlDatabase;
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::PathBuf;

/// Flags of the `archive` subcommand; unset options fall back to the config file.
#[derive(Debug, Clone, Default)]
pub struct ArchiveArgs {
    pub table: String,
    pub connection: ConnectionOverrides,
    pub days: Option<u32>,
    pub dry_run: bool,
    pub export_sql: bool,
    pub export_csv: bool,
    pub export_path: Option<PathBuf>,
    pub date_column: Option<String>,
    pub yes: bool,
}

/// Build the immutable request for this run from flags and config.
pub fn build_request(
    args: &ArchiveArgs,
    config: &ArchiveConfig,
    settings: &ConnectionSettings,
) -> Result<ArchiveRequest, ArchiveError> {
    let request = ArchiveRequest {
        table: args.table.clone(),
        retention_days: config.retention_days(args.days),
        dry_run: args.dry_run,
        date_column: args.date_column.clone(),
        export: ExportSettings {
            directory: config.export_path(args.export_path.clone()),
            sql: args.export_sql,
            csv: args.export_csv,
            host: settings.host.clone(),
            database: settings.database.clone(),
        },
    };
    request.validate()?;
    Ok(request)
}

/// Archive rows older than the retention window out of `args.table`
///
/// `started_at` is the run's reference instant; it fixes the cutoff and the
/// date suffix of every table and file the run creates.
///
/// # Errors
///
/// Returns the pipeline's `ArchiveError` (wrapped in `anyhow`) when any
/// cutover step fails, or an error if the operator declines the prompt.
/// Export failures are reported as warnings only.
pub async fn archive(args: ArchiveArgs, config: &ArchiveConfig, started_at: NaiveDateTime) -> Result<()> {
    let settings = ConnectionSettings::resolve(&args.connection, &config.connection)?;
    let request = build_request(&args, config, &settings)?;

    tracing::info!(
        "Archive run for {}.{} started at {}",
        settings.database,
        request.table,
        started_at.format("%Y-%m-%d %H:%M:%S")
    );
    if request.dry_run {
        tracing::info!("Dry run: no table will be created, modified or renamed");
    } else if !args.yes {
        confirm(&request, &settings)?;
    }

    let mut db = MysqlDatabase::connect(&settings)
        .await
        .map_err(|source| ArchiveError::ConnectionFailed {
            target: settings.target(),
            source,
        })?;

    let result = run_archive(&mut db, &request, started_at).await;

    if let Err(e) = db.disconnect().await {
        tracing::warn!("{:#}", e);
    }

    match result {
        Ok(report) => {
            log_report(&report);
            Ok(())
        }
        Err(e) => {
            if e.is_before_mutation() {
                tracing::error!("Archive aborted before any table was modified: {}", e);
            } else {
                tracing::error!("Archive aborted after tables were modified: {}", e);
            }
            Err(e.into())
        }
    }
}

fn confirm(request: &ArchiveRequest, settings: &ConnectionSettings) -> Result<()> {
    let prompt = format!(
        "Move rows older than {} days out of {}.{} into an archive table?",
        request.retention_days, settings.database, request.table
    );
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to get confirmation")?;

    if !confirmed {
        tracing::warn!("⚠ User cancelled operation");
        bail!("Archive cancelled by user");
    }
    Ok(())
}

fn log_report(report: &ArchiveReport) {
    match report.outcome {
        ArchiveOutcome::NothingToArchive => {
            tracing::info!(
                "✓ Nothing to archive in '{}' (cutoff {})",
                report.names.original,
                report.cutoff
            );
        }
        ArchiveOutcome::DryRun => {
            tracing::info!("========================================");
            tracing::info!("Dry run summary for '{}'", report.names.original);
            tracing::info!("  Date column:      {}", report.date_column);
            tracing::info!("  Cutoff:           {}", report.cutoff);
            tracing::info!("  Rows to archive:  {}", report.counts.archive);
            tracing::info!("  Rows to keep:     {}", report.counts.keep);
            tracing::info!("  Working table:    {}", report.names.working);
            tracing::info!("  Archive table:    {}", report.names.archive);
            tracing::info!("========================================");
        }
        ArchiveOutcome::Archived => {
            tracing::info!("========================================");
            tracing::info!("✓ Archive complete");
            tracing::info!(
                "  {}: {} rows",
                report.names.archive,
                report.counts.archive
            );
            tracing::info!("  {}: {} rows", report.names.original, report.counts.keep);
            for export in &report.exports {
                tracing::info!(
                    "  {} export: {} ({} rows)",
                    export.format,
                    export.path.display(),
                    export.rows
                );
            }
            for failure in &report.export_failures {
                tracing::warn!("  ⚠ {}", failure);
            }
            tracing::info!("========================================");
        }
    }
}
