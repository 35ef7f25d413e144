// ABOUTME: Conversion between mysql_async values and archive cell values
// ABOUTME: Handles zero dates, TIME intervals and tinyint(1) booleans

use crate::archive::CutoffInstant;
use crate::schema::ColumnInfo;
use crate::value::CellValue;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Timelike};
use mysql_async::{Row, Value};

/// Convert a MySQL value read from `column` into a cell value
///
/// - `tinyint(1)` integers → booleans
/// - `0000-00-00 00:00:00` → the zero-datetime marker
/// - dates MySQL accepts but the calendar does not (`2024-02-00`) → their text form
/// - TIME intervals → `[-]HHH:MM:SS[.ffffff]` text
/// - everything else keeps its native shape
///
/// # Examples
///
/// ```
/// # use mysql_async::Value;
/// # use table_archiver::mysql::converter::to_cell_value;
/// # use table_archiver::schema::ColumnInfo;
/// # use table_archiver::value::CellValue;
/// let flag = ColumnInfo::new("active", "tinyint(1)");
/// assert_eq!(to_cell_value(&Value::Int(1), &flag), CellValue::Bool(true));
/// ```
pub fn to_cell_value(value: &Value, column: &ColumnInfo) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,

        Value::Int(i) if column.is_boolean() => CellValue::Bool(*i != 0),
        Value::UInt(u) if column.is_boolean() => CellValue::Bool(*u != 0),
        Value::Int(i) => CellValue::Int(*i),
        Value::UInt(u) => CellValue::UInt(*u),

        Value::Float(f) => CellValue::Float(*f),
        Value::Double(d) => CellValue::Double(*d),

        Value::Bytes(b) if column.is_date_time() && is_zero_date_text(b) => CellValue::ZeroDateTime,
        Value::Bytes(b) => CellValue::Bytes(b.clone()),

        Value::Date(0, 0, 0, 0, 0, 0, 0) => CellValue::ZeroDateTime,
        Value::Date(year, month, day, hour, minute, second, micro) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|d| {
                    d.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micro,
                    )
                })
                .map(CellValue::DateTime)
                .unwrap_or_else(|| {
                    CellValue::text(&format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year, month, day, hour, minute, second
                    ))
                })
        }

        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if *is_negative { "-" } else { "" };
            let total_hours = u64::from(*days) * 24 + u64::from(*hours);
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, minutes, seconds);
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            CellValue::text(&text)
        }
    }
}

fn is_zero_date_text(bytes: &[u8]) -> bool {
    bytes.starts_with(b"0000-00-00")
}

/// Convert a fetched row into cell values ordered like `columns`.
pub fn row_to_cells(row: &Row, columns: &[ColumnInfo]) -> Result<Vec<CellValue>> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            row.as_ref(idx)
                .map(|value| to_cell_value(value, column))
                .with_context(|| {
                    format!("Row is missing column '{}' at index {}", column.name, idx)
                })
        })
        .collect()
}

/// The cutoff as a bound DATETIME parameter.
pub fn cutoff_param(cutoff: &CutoffInstant) -> Value {
    let at = cutoff.as_datetime();
    Value::Date(
        at.year() as u16,
        at.month() as u8,
        at.day() as u8,
        at.hour() as u8,
        at.minute() as u8,
        at.second() as u8,
        0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(ty: &str) -> ColumnInfo {
        ColumnInfo::new("c", ty)
    }

    #[test]
    fn test_null() {
        assert_eq!(to_cell_value(&Value::NULL, &column("int")), CellValue::Null);
    }

    #[test]
    fn test_integers_and_booleans() {
        assert_eq!(to_cell_value(&Value::Int(-7), &column("int")), CellValue::Int(-7));
        assert_eq!(to_cell_value(&Value::UInt(7), &column("int unsigned")), CellValue::UInt(7));
        assert_eq!(to_cell_value(&Value::Int(0), &column("tinyint(1)")), CellValue::Bool(false));
        assert_eq!(to_cell_value(&Value::Int(5), &column("tinyint(4)")), CellValue::Int(5));
    }

    #[test]
    fn test_dates() {
        let value = Value::Date(2024, 2, 29, 13, 45, 1, 500_000);
        match to_cell_value(&value, &column("datetime(6)")) {
            CellValue::DateTime(dt) => {
                assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-02-29 13:45:01")
            }
            other => panic!("expected datetime, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_dates() {
        assert_eq!(
            to_cell_value(&Value::Date(0, 0, 0, 0, 0, 0, 0), &column("datetime")),
            CellValue::ZeroDateTime
        );
        assert_eq!(
            to_cell_value(&Value::Bytes(b"0000-00-00 00:00:00".to_vec()), &column("timestamp")),
            CellValue::ZeroDateTime
        );
        // Text columns keep the literal
        assert_eq!(
            to_cell_value(&Value::Bytes(b"0000-00-00".to_vec()), &column("varchar(10)")),
            CellValue::text("0000-00-00")
        );
    }

    #[test]
    fn test_partial_zero_date_is_kept_as_text() {
        assert_eq!(
            to_cell_value(&Value::Date(2024, 2, 0, 0, 0, 0, 0), &column("date")),
            CellValue::text("2024-02-00 00:00:00")
        );
    }

    #[test]
    fn test_time_intervals() {
        assert_eq!(
            to_cell_value(&Value::Time(false, 1, 2, 3, 4, 0), &column("time")),
            CellValue::text("26:03:04")
        );
        assert_eq!(
            to_cell_value(&Value::Time(true, 0, 0, 0, 5, 250), &column("time(6)")),
            CellValue::text("-00:00:05.000250")
        );
    }

    #[test]
    fn test_cutoff_param() {
        let now = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(6, 7, 8)
            .unwrap();
        let cutoff = CutoffInstant::from_reference(now, 1).unwrap();
        assert_eq!(cutoff_param(&cutoff), Value::Date(2024, 3, 31, 6, 7, 8, 0));
    }
}
