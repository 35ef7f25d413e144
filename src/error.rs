// ABOUTME: Error taxonomy for the archive pipeline and exporters
// ABOUTME: Each variant carries the table names and counts needed to reconstruct table state

use crate::export::DumpFormat;
use thiserror::Error;

/// Failure raised by a step of the archive run.
///
/// Database adapters report `anyhow::Error`s with context attached; the
/// pipeline classifies them into one of these variants so the operator can
/// tell which tables exist and what they hold at the moment of failure.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid archive request: {0}")]
    InvalidRequest(String),

    #[error("failed to connect to MySQL at {target}")]
    ConnectionFailed {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("table `{table}` does not exist")]
    SchemaNotFound { table: String },

    #[error("catalog query failed for table `{table}` while {operation}")]
    CatalogQueryFailed {
        table: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("table `{table}` has no date, datetime or timestamp column to measure row age")]
    NoSuitableDateColumn { table: String },

    #[error("failed to count rows in `{table}`; no table has been modified")]
    CountFailed {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create working table `{table}`; no table has been modified")]
    CreateFailed {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "failed to copy rows from `{from}` into `{to}`; original table unchanged, \
         working table {}",
        drop_outcome(.working_table_dropped)
    )]
    CopyFailed {
        from: String,
        to: String,
        working_table_dropped: bool,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "failed to count rows in working table `{table}`; original table `{original}` unchanged, \
         working table holds copied rows and must be dropped before re-running"
    )]
    VerifyFailed {
        table: String,
        original: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "record count mismatch in working table `{table}`: expected {expected} kept rows, found {actual}; \
         original table untouched, working table left for inspection"
    )]
    RecordCountMismatch {
        table: String,
        expected: u64,
        actual: u64,
    },

    #[error(
        "failed to remove kept rows from `{table}`; working table `{working}` holds the verified kept rows, \
         both tables must be inspected before re-running"
    )]
    DeleteFailed {
        table: String,
        working: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to rename `{from}` to `{to}`; to recover run: {recovery}")]
    RenameFailed {
        from: String,
        to: String,
        recovery: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{format} export of `{table}` failed")]
    ExportFailed {
        table: String,
        format: DumpFormat,
        #[source]
        source: anyhow::Error,
    },
}

fn drop_outcome(dropped: &bool) -> &'static str {
    if *dropped {
        "dropped"
    } else {
        "could NOT be dropped and must be removed manually"
    }
}

impl ArchiveError {
    /// Whether any table may have been modified when this error was raised.
    ///
    /// Steps before `Create` are read-only and may be re-run freely.
    pub fn is_before_mutation(&self) -> bool {
        matches!(
            self,
            ArchiveError::InvalidRequest(_)
                | ArchiveError::ConnectionFailed { .. }
                | ArchiveError::SchemaNotFound { .. }
                | ArchiveError::CatalogQueryFailed { .. }
                | ArchiveError::NoSuitableDateColumn { .. }
                | ArchiveError::CountFailed { .. }
                | ArchiveError::CreateFailed { .. }
        )
    }
}
