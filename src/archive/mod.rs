// ABOUTME: Archive run request, report and cutover state types
// ABOUTME: The pipeline itself lives in pipeline.rs; run-scoped values in plan.rs

pub mod pipeline;
pub mod plan;

pub use pipeline::run_archive;
pub use plan::{run_suffix, CutoffInstant, RowCounts, RunNames};

use crate::error::ArchiveError;
use crate::export::{DumpFormat, ExportSummary};
use crate::utils::validate_mysql_identifier;
use std::fmt;
use std::path::PathBuf;

/// Where and how the archive table is dumped after a successful swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub directory: PathBuf,
    pub sql: bool,
    pub csv: bool,
    /// Host label written into SQL dump headers.
    pub host: String,
    /// Database label written into SQL dump headers.
    pub database: String,
}

impl ExportSettings {
    pub fn formats(&self) -> Vec<DumpFormat> {
        let mut formats = Vec::new();
        if self.sql {
            formats.push(DumpFormat::Sql);
        }
        if self.csv {
            formats.push(DumpFormat::Csv);
        }
        formats
    }
}

/// Immutable input of one archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub table: String,
    pub retention_days: u32,
    pub dry_run: bool,
    /// Operator-chosen age column; otherwise one is selected from the schema.
    pub date_column: Option<String>,
    pub export: ExportSettings,
}

impl ArchiveRequest {
    pub fn validate(&self) -> Result<(), ArchiveError> {
        validate_mysql_identifier(&self.table)
            .map_err(|e| ArchiveError::InvalidRequest(format!("table: {:#}", e)))?;
        if let Some(column) = &self.date_column {
            validate_mysql_identifier(column)
                .map_err(|e| ArchiveError::InvalidRequest(format!("date column: {:#}", e)))?;
        }
        Ok(())
    }
}

/// Position reached in the cutover sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CutoverState {
    Init,
    Inspected,
    Counted,
    DryRunReported,
    Created,
    Copied,
    Verified,
    Deleted,
    Swapped,
    Exported,
}

impl fmt::Display for CutoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CutoverState::Init => "init",
            CutoverState::Inspected => "inspected",
            CutoverState::Counted => "counted",
            CutoverState::DryRunReported => "dry-run reported",
            CutoverState::Created => "created",
            CutoverState::Copied => "copied",
            CutoverState::Verified => "verified",
            CutoverState::Deleted => "deleted",
            CutoverState::Swapped => "swapped",
            CutoverState::Exported => "exported",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// No row is older than the cutoff; nothing was created or deleted.
    NothingToArchive,
    /// Counts were reported; nothing was created or deleted.
    DryRun,
    /// Tables were swapped; the archive table holds the old rows.
    Archived,
}

/// What a finished run did. Export failures are recorded here, not raised.
#[derive(Debug)]
pub struct ArchiveReport {
    pub names: RunNames,
    pub date_column: String,
    pub cutoff: CutoffInstant,
    pub counts: RowCounts,
    pub outcome: ArchiveOutcome,
    pub final_state: CutoverState,
    /// Rows removed from the original table by the delete step.
    pub deleted_rows: Option<u64>,
    pub exports: Vec<ExportSummary>,
    pub export_failures: Vec<ArchiveError>,
}

impl ArchiveReport {
    pub fn is_archived(&self) -> bool {
        self.outcome == ArchiveOutcome::Archived
    }
}
