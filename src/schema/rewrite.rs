// ABOUTME: Renames a CREATE TABLE definition and suffixes its secondary identifiers
// ABOUTME: Parses SHOW CREATE TABLE output line-by-line into a minimal typed form

use super::TableStructure;
use crate::error::ArchiveError;
use crate::utils::quote_ident;
use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::OnceLock;

/// One definition line inside the parentheses of `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// Column definitions are carried verbatim and never rewritten.
    Column(String),
    PrimaryKey(String),
    /// `KEY`, `INDEX`, `UNIQUE KEY`, `FULLTEXT KEY`, `SPATIAL KEY`.
    Index {
        prefix: String,
        name: String,
        rest: String,
    },
    Constraint {
        prefix: String,
        name: String,
        kind: ConstraintKind,
        rest: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    ForeignKey,
    Check,
}

/// Minimal typed view of `SHOW CREATE TABLE` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableDefinition {
    header_prefix: String,
    table: String,
    header_rest: String,
    definitions: Vec<Definition>,
    /// Closing line plus table options and partitioning, verbatim.
    trailer: Vec<String>,
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)(\s*CREATE\s+TABLE\s+)`((?:[^`]|``)+)`(.*)$").expect("valid header regex")
    })
}

fn index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)(\s*(?:(?:UNIQUE|FULLTEXT|SPATIAL)\s+)?(?:KEY|INDEX)\s+)`((?:[^`]|``)+)`(.*)$")
            .expect("valid index regex")
    })
}

fn constraint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)(\s*CONSTRAINT\s+)`((?:[^`]|``)+)`(\s+(FOREIGN\s+KEY|CHECK)\b.*)$")
            .expect("valid constraint regex")
    })
}

fn primary_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i)\s*PRIMARY\s+KEY\b").expect("valid primary key regex"))
}

fn unescape(name: &str) -> String {
    name.replace("``", "`")
}

impl CreateTableDefinition {
    /// Parse the structural definition returned by the catalog.
    pub fn parse(ddl: &str) -> Result<Self> {
        let mut lines = ddl.split('\n');

        let header = lines
            .next()
            .ok_or_else(|| anyhow!("structural definition is empty"))?;
        let caps = header_re()
            .captures(header)
            .ok_or_else(|| anyhow!("structural definition does not start with CREATE TABLE: {}", header))?;

        let mut definitions = Vec::new();
        let mut trailer = Vec::new();
        for line in lines.by_ref() {
            if line.starts_with(')') {
                trailer.push(line.to_string());
                break;
            }
            definitions.push(classify(line));
        }
        trailer.extend(lines.map(str::to_string));

        if trailer.is_empty() {
            return Err(anyhow!("structural definition has no closing parenthesis"));
        }

        Ok(Self {
            header_prefix: caps[1].to_string(),
            table: unescape(&caps[2]),
            header_rest: caps[3].to_string(),
            definitions,
            trailer,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Identifiers that live in the schema-wide namespace and must be unique.
    pub fn secondary_identifiers(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                Definition::Index { name, .. } | Definition::Constraint { name, .. } => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub fn rename_table(&mut self, new_name: &str) {
        self.table = new_name.to_string();
    }

    /// Append `_<suffix>` to every secondary index and constraint identifier.
    pub fn suffix_identifiers(&mut self, suffix: &str) {
        for definition in &mut self.definitions {
            match definition {
                Definition::Index { name, .. } | Definition::Constraint { name, .. } => {
                    name.push('_');
                    name.push_str(suffix);
                }
                Definition::Column(_) | Definition::PrimaryKey(_) => {}
            }
        }
    }

    pub fn to_ddl(&self) -> String {
        let mut lines = Vec::with_capacity(self.definitions.len() + self.trailer.len() + 1);
        lines.push(format!(
            "{}{}{}",
            self.header_prefix,
            quote_ident(&self.table),
            self.header_rest
        ));
        for definition in &self.definitions {
            lines.push(match definition {
                Definition::Column(line) | Definition::PrimaryKey(line) => line.clone(),
                Definition::Index { prefix, name, rest }
                | Definition::Constraint {
                    prefix, name, rest, ..
                } => format!("{}{}{}", prefix, quote_ident(name), rest),
            });
        }
        lines.extend(self.trailer.iter().cloned());
        lines.join("\n")
    }
}

fn classify(line: &str) -> Definition {
    if primary_key_re().is_match(line) {
        return Definition::PrimaryKey(line.to_string());
    }
    if let Some(caps) = constraint_re().captures(line) {
        let kind = if caps[4].to_ascii_uppercase().starts_with("CHECK") {
            ConstraintKind::Check
        } else {
            ConstraintKind::ForeignKey
        };
        return Definition::Constraint {
            prefix: caps[1].to_string(),
            name: unescape(&caps[2]),
            kind,
            rest: caps[3].to_string(),
        };
    }
    if let Some(caps) = index_re().captures(line) {
        return Definition::Index {
            prefix: caps[1].to_string(),
            name: unescape(&caps[2]),
            rest: caps[3].to_string(),
        };
    }
    Definition::Column(line.to_string())
}

fn parse_failed(table: &str, source: anyhow::Error) -> ArchiveError {
    ArchiveError::CreateFailed {
        table: table.to_string(),
        source,
    }
}

/// Produce the definition of the working table.
///
/// The header's table name is replaced once and every secondary index,
/// foreign-key and check constraint identifier gains `_<suffix>`. Column
/// definitions and the primary key are carried over untouched.
pub fn rewrite_structure(
    structure: &TableStructure,
    new_table: &str,
    suffix: &str,
) -> Result<TableStructure, ArchiveError> {
    let mut definition =
        CreateTableDefinition::parse(&structure.ddl).map_err(|e| parse_failed(new_table, e))?;

    if !definition.table().eq_ignore_ascii_case(&structure.table) {
        return Err(parse_failed(
            new_table,
            anyhow!(
                "structural definition names table '{}', expected '{}'",
                definition.table(),
                structure.table
            ),
        ));
    }

    definition.rename_table(new_table);
    definition.suffix_identifiers(suffix);

    tracing::debug!(
        "Rewrote definition of '{}' as '{}' ({} secondary identifier(s) suffixed with '{}')",
        structure.table,
        new_table,
        definition.secondary_identifiers().len(),
        suffix
    );

    Ok(TableStructure {
        table: new_table.to_string(),
        ddl: definition.to_ddl(),
        columns: structure.columns.clone(),
    })
}
