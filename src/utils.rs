// ABOUTME: Utility functions for identifier validation, quoting and log display
// ABOUTME: Every table and column name passes through here before reaching SQL text

use anyhow::{bail, Result};

/// MySQL's limit for table, column and index identifiers.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate a MySQL identifier (database, table or column name)
///
/// Identifiers always reach SQL through [`quote_ident`], so any name MySQL
/// accepts as a quoted identifier is allowed, including `-`, spaces and
/// non-ASCII letters. Rejected are names that:
/// - Are empty or whitespace-only
/// - Exceed 64 characters
/// - End with a space
/// - Contain control characters
/// - Contain `/` or `\` (table names also become dump file names)
///
/// # Errors
///
/// Returns an error naming the offending character or rule.
///
/// # Examples
///
/// ```
/// # use table_archiver::utils::validate_mysql_identifier;
/// assert!(validate_mysql_identifier("orders").is_ok());
/// assert!(validate_mysql_identifier("my-app").is_ok());
/// assert!(validate_mysql_identifier("commandes_été").is_ok());
/// assert!(validate_mysql_identifier("orders\0").is_err());
/// assert!(validate_mysql_identifier("../orders").is_err());
/// ```
pub fn validate_mysql_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        bail!("Identifier cannot be empty or whitespace-only");
    }

    let length = identifier.chars().count();
    if length > MAX_IDENTIFIER_LEN {
        bail!(
            "Identifier '{}' exceeds maximum length of {} characters (got {})",
            sanitize_identifier(identifier),
            MAX_IDENTIFIER_LEN,
            length
        );
    }

    if identifier.ends_with(' ') {
        bail!(
            "Identifier '{}' cannot end with a space",
            sanitize_identifier(identifier)
        );
    }

    for (i, c) in identifier.chars().enumerate() {
        if c.is_control() {
            bail!(
                "Identifier '{}' contains control character \\x{:02x} at position {}",
                sanitize_identifier(identifier),
                c as u32,
                i
            );
        }
        if c == '/' || c == '\\' {
            bail!(
                "Identifier '{}' contains path separator '{}' at position {}",
                sanitize_identifier(identifier),
                c,
                i
            );
        }
    }

    Ok(())
}

/// Quote an identifier with backticks, doubling any embedded backtick
///
/// # Examples
///
/// ```
/// # use table_archiver::utils::quote_ident;
/// assert_eq!(quote_ident("orders"), "`orders`");
/// assert_eq!(quote_ident("we`ird"), "`we``ird`");
/// ```
pub fn quote_ident(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to prevent log injection.
/// For display only; SQL safety comes from validation and quoting.
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Shorten a statement for logging, keeping the first `max_len` bytes
///
/// Cuts on a character boundary so multi-byte text never panics.
pub fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        return sql.to_string();
    }
    let mut end = max_len;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}
