// ABOUTME: Statement text for every query the archive run sends to MySQL
// ABOUTME: Identifiers are backtick-quoted here; values are always left as ? placeholders

use crate::database::{AgeComparison, AgeFilter};
use crate::schema::ColumnInfo;
use crate::utils::quote_ident;

/// Ordinal column metadata of a table in the current database.
pub const COLUMNS_QUERY: &str = r#"
    SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, COLUMN_KEY, EXTRA
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE()
    AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

pub const UNLOCK_TABLES: &str = "UNLOCK TABLES";

pub const SESSION_TIME_ZONE: &str = "SELECT @@SESSION.time_zone";

pub const SET_SESSION_TIME_ZONE: &str = "SET SESSION time_zone = ?";

fn column_list(columns: &[ColumnInfo]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(filter: &AgeFilter) -> String {
    let column = quote_ident(&filter.column);
    match filter.comparison {
        AgeComparison::OlderThan => format!(" WHERE {} < ?", column),
        AgeComparison::NotOlderThan => {
            format!(" WHERE ({} >= ? OR {} IS NULL)", column, column)
        }
    }
}

pub fn show_create_table(table: &str) -> String {
    format!("SHOW CREATE TABLE {}", quote_ident(table))
}

pub fn count_rows(table: &str, filter: Option<&AgeFilter>) -> String {
    let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    if let Some(filter) = filter {
        sql.push_str(&where_clause(filter));
    }
    sql
}

/// `INSERT ... SELECT` over the non-generated columns, bound to one cutoff parameter.
pub fn copy_rows(from: &str, to: &str, columns: &[ColumnInfo], filter: &AgeFilter) -> String {
    let insertable: Vec<ColumnInfo> = columns.iter().filter(|c| !c.generated).cloned().collect();
    let list = column_list(&insertable);
    format!(
        "INSERT INTO {} ({}) SELECT {} FROM {}{}",
        quote_ident(to),
        list,
        list,
        quote_ident(from),
        where_clause(filter)
    )
}

pub fn delete_rows(table: &str, filter: &AgeFilter) -> String {
    format!("DELETE FROM {}{}", quote_ident(table), where_clause(filter))
}

pub fn rename_table(from: &str, to: &str) -> String {
    format!("RENAME TABLE {} TO {}", quote_ident(from), quote_ident(to))
}

pub fn drop_table_if_exists(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub fn lock_table_read(table: &str) -> String {
    format!("LOCK TABLES {} READ", quote_ident(table))
}

/// Page query taking `LIMIT ? OFFSET ?` parameters.
///
/// Ordered by the primary key columns present in `columns` so consecutive
/// pages neither skip nor repeat rows; tables without one fall back to
/// storage order.
pub fn select_page(table: &str, columns: &[ColumnInfo]) -> String {
    let key: Vec<String> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| quote_ident(&c.name))
        .collect();

    let mut sql = format!("SELECT {} FROM {}", column_list(columns), quote_ident(table));
    if !key.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&key.join(", "));
    }
    sql.push_str(" LIMIT ? OFFSET ?");
    sql
}
