// ABOUTME: Per-value rendering for SQL dump literals and CSV fields
// ABOUTME: NULL and zero datetimes collapse to NULL/empty; text and binary pass through verbatim

use crate::value::CellValue;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append `value` as a MySQL literal to `out`.
///
/// Strings and binary data are single-quoted with `\`, `'`, newline,
/// carriage return, NUL and SUB (0x1a) backslash-escaped.
///
/// # Examples
///
/// ```
/// # use table_archiver::export::format::push_sql_literal;
/// # use table_archiver::value::CellValue;
/// let mut out = Vec::new();
/// push_sql_literal(&CellValue::text("it's"), &mut out);
/// assert_eq!(out, b"'it\\'s'");
/// ```
pub fn push_sql_literal(value: &CellValue, out: &mut Vec<u8>) {
    match value {
        CellValue::Null | CellValue::ZeroDateTime => out.extend_from_slice(b"NULL"),
        CellValue::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
        CellValue::UInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        CellValue::Float(v) => out.extend_from_slice(v.to_string().as_bytes()),
        CellValue::Double(v) => out.extend_from_slice(v.to_string().as_bytes()),
        CellValue::Bool(v) => out.push(if *v { b'1' } else { b'0' }),
        CellValue::DateTime(v) => {
            out.push(b'\'');
            out.extend_from_slice(v.format(DATETIME_FORMAT).to_string().as_bytes());
            out.push(b'\'');
        }
        CellValue::Bytes(bytes) => {
            out.push(b'\'');
            escape_sql_bytes(bytes, out);
            out.push(b'\'');
        }
    }
}

fn escape_sql_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0x00 => out.extend_from_slice(b"\\0"),
            0x1a => out.extend_from_slice(b"\\Z"),
            _ => out.push(b),
        }
    }
}

/// Render `value` as an unquoted CSV field; quoting is left to the csv writer.
pub fn csv_field(value: &CellValue) -> Vec<u8> {
    match value {
        CellValue::Null | CellValue::ZeroDateTime => Vec::new(),
        CellValue::Int(v) => v.to_string().into_bytes(),
        CellValue::UInt(v) => v.to_string().into_bytes(),
        CellValue::Float(v) => v.to_string().into_bytes(),
        CellValue::Double(v) => v.to_string().into_bytes(),
        CellValue::Bool(true) => b"true".to_vec(),
        CellValue::Bool(false) => b"false".to_vec(),
        CellValue::DateTime(v) => v.format(DATETIME_FORMAT).to_string().into_bytes(),
        CellValue::Bytes(bytes) => bytes.clone(),
    }
}
