// ABOUTME: Values fixed once at the start of an archive run
// ABOUTME: Cutoff instant, the three table names, and the pre-mutation row counts

use crate::error::ArchiveError;
use crate::utils::{quote_ident, validate_mysql_identifier};
use chrono::{Duration, NaiveDate, NaiveDateTime, SubsecRound};
use std::fmt;

/// Rows whose age column is strictly before this instant are archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CutoffInstant(NaiveDateTime);

impl CutoffInstant {
    /// `reference - retention_days`, truncated to whole seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// # use table_archiver::archive::CutoffInstant;
    /// # use chrono::NaiveDate;
    /// let now = NaiveDate::from_ymd_opt(2024, 4, 1)
    ///     .unwrap()
    ///     .and_hms_milli_opt(12, 30, 15, 750)
    ///     .unwrap();
    /// let cutoff = CutoffInstant::from_reference(now, 90).unwrap();
    /// assert_eq!(cutoff.to_string(), "2024-01-02 12:30:15");
    /// ```
    pub fn from_reference(reference: NaiveDateTime, retention_days: u32) -> Result<Self, ArchiveError> {
        reference
            .trunc_subsecs(0)
            .checked_sub_signed(Duration::days(i64::from(retention_days)))
            .map(CutoffInstant)
            .ok_or_else(|| {
                ArchiveError::InvalidRequest(format!(
                    "retention of {} days reaches before the earliest representable date",
                    retention_days
                ))
            })
    }

    pub fn as_datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for CutoffInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Date tag shared by the working table, the archive table and the rewritten index names.
pub fn run_suffix(run_date: NaiveDate) -> String {
    run_date.format("%Y%m%d").to_string()
}

/// The three table names in play during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNames {
    pub original: String,
    /// `<table>_<YYYYMMDD>`; becomes the original name after the swap.
    pub working: String,
    /// `<table>_archive_<YYYYMMDD>`; the terminal artifact.
    pub archive: String,
    pub suffix: String,
}

impl RunNames {
    pub fn new(table: &str, run_date: NaiveDate) -> Result<Self, ArchiveError> {
        let suffix = run_suffix(run_date);
        let names = Self {
            original: table.to_string(),
            working: format!("{}_{}", table, suffix),
            archive: format!("{}_archive_{}", table, suffix),
            suffix,
        };

        for name in [&names.original, &names.working, &names.archive] {
            validate_mysql_identifier(name)
                .map_err(|e| ArchiveError::InvalidRequest(format!("{:#}", e)))?;
        }

        Ok(names)
    }

    /// Manual statements that finish an interrupted swap from the given step.
    pub fn recovery_for_first_rename(&self) -> String {
        format!(
            "nothing renamed yet; RENAME TABLE {} TO {}, {} TO {}",
            quote_ident(&self.original),
            quote_ident(&self.archive),
            quote_ident(&self.working),
            quote_ident(&self.original)
        )
    }

    pub fn recovery_for_second_rename(&self) -> String {
        format!(
            "RENAME TABLE {} TO {}",
            quote_ident(&self.working),
            quote_ident(&self.original)
        )
    }
}

/// Row counts captured against the original table before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    /// Rows strictly older than the cutoff.
    pub archive: u64,
    /// Rows at or after the cutoff, plus rows with no age.
    pub keep: u64,
}
