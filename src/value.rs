// ABOUTME: Driver-neutral cell values read from archive tables
// ABOUTME: Produced by the MySQL converter and consumed by both dump formatters

use chrono::NaiveDateTime;

/// A single column value of a fetched row.
///
/// Text and binary columns both arrive as raw bytes and are written
/// verbatim; formatting differences live in `export::format`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// MySQL's `0000-00-00 00:00:00` sentinel. Exported like NULL, never as an epoch.
    ZeroDateTime,
    Bytes(Vec<u8>),
}

impl CellValue {
    pub fn text(value: &str) -> Self {
        CellValue::Bytes(value.as_bytes().to_vec())
    }
}
