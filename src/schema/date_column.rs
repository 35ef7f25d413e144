// ABOUTME: Chooses the column that encodes row age for the archive cutoff
// ABOUTME: Preference list first, then alphabetical among remaining date/time columns

use super::ColumnInfo;
use crate::error::ArchiveError;

/// Column names tried first, in order, when several date/time columns exist.
pub const DATE_COLUMN_PREFERENCE: &[&str] = &[
    "smsdate",
    "request_time",
    "deli_date",
    "created_at",
    "updated_at",
    "req_date",
    "res_date",
    "date_created",
    "created",
];

/// Pick the age discriminator for `table` from its introspected columns.
///
/// When an `override_column` is given it must name one of the table's
/// date/time columns. Otherwise the first preferred name present wins and
/// the remaining candidates are ordered by name, so the same schema always
/// yields the same column.
pub fn select_date_column(
    table: &str,
    columns: &[ColumnInfo],
    override_column: Option<&str>,
) -> Result<String, ArchiveError> {
    let mut candidates: Vec<&str> = columns
        .iter()
        .filter(|c| c.is_date_time())
        .map(|c| c.name.as_str())
        .collect();

    if let Some(wanted) = override_column {
        return match columns.iter().find(|c| c.name == wanted) {
            Some(column) if column.is_date_time() => Ok(column.name.clone()),
            Some(column) => Err(ArchiveError::InvalidRequest(format!(
                "column '{}' of table '{}' has type '{}', expected date, datetime or timestamp",
                wanted, table, column.column_type
            ))),
            None => Err(ArchiveError::InvalidRequest(format!(
                "table '{}' has no column named '{}'",
                table, wanted
            ))),
        };
    }

    if let Some(preferred) = DATE_COLUMN_PREFERENCE
        .iter()
        .find(|name| candidates.contains(*name))
    {
        return Ok(preferred.to_string());
    }

    candidates.sort_unstable();
    candidates
        .first()
        .map(|name| name.to_string())
        .ok_or_else(|| ArchiveError::NoSuitableDateColumn {
            table: table.to_string(),
        })
}
