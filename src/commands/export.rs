// ABOUTME: Export command implementation
// ABOUTME: Dumps any existing table to SQL and/or CSV without touching its rows

use crate::config::{ArchiveConfig, ConnectionOverrides, ConnectionSettings};
use crate::error::ArchiveError;
use crate::export::{export_table, DumpFormat, ExportOptions};
use crate::mysql::MysqlDatabase;
use crate::utils::validate_mysql_identifier;
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub table: String,
    pub connection: ConnectionOverrides,
    pub sql: bool,
    pub csv: bool,
    pub export_path: Option<PathBuf>,
}

impl ExportArgs {
    /// Requested formats; with neither flag set both are written.
    pub fn formats(&self) -> Vec<DumpFormat> {
        match (self.sql, self.csv) {
            (true, false) => vec![DumpFormat::Sql],
            (false, true) => vec![DumpFormat::Csv],
            _ => vec![DumpFormat::Sql, DumpFormat::Csv],
        }
    }
}

/// Export `args.table`, typically an archive table whose export failed
pub async fn export(args: ExportArgs, config: &ArchiveConfig, started_at: NaiveDateTime) -> Result<()> {
    validate_mysql_identifier(&args.table).context("Invalid table name")?;
    let settings = ConnectionSettings::resolve(&args.connection, &config.connection)?;

    let options = ExportOptions {
        directory: config.export_path(args.export_path.clone()),
        host: settings.host.clone(),
        database: settings.database.clone(),
        generated_at: started_at,
    };

    let mut db = MysqlDatabase::connect(&settings)
        .await
        .map_err(|source| ArchiveError::ConnectionFailed {
            target: settings.target(),
            source,
        })?;

    let mut failed = Vec::new();
    for format in args.formats() {
        match export_table(&mut db, &args.table, format, &options).await {
            Ok(summary) => tracing::info!(
                "✓ {} export written to {} ({} rows)",
                summary.format,
                summary.path.display(),
                summary.rows
            ),
            Err(e) => {
                tracing::error!("{} export of '{}' failed: {:#}", format, args.table, e);
                failed.push(format);
            }
        }
    }

    if let Err(e) = db.disconnect().await {
        tracing::warn!("{:#}", e);
    }

    if !failed.is_empty() {
        let names: Vec<String> = failed.iter().map(|f| f.to_string()).collect();
        bail!("{} export of '{}' failed", names.join(" and "), args.table);
    }
    Ok(())
}
