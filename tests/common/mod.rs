// ABOUTME: In-memory ArchiveDatabase used by the pipeline and export integration tests
// ABOUTME: Records every call, injects failures by operation name and tracks page sizes

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use table_archiver::database::{AgeComparison, AgeFilter, ArchiveDatabase, PageRequest};
use table_archiver::schema::{ColumnInfo, TableStructure};
use table_archiver::value::CellValue;

#[derive(Debug, Clone, PartialEq)]
pub struct FakeTable {
    pub ddl: String,
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Default)]
pub struct FakeDatabase {
    pub tables: BTreeMap<String, FakeTable>,
    /// Operation names that fail, e.g. `copy_rows`, `rename_table:orders_20240401`
    /// or `fetch_page:1000` (keyed by offset).
    pub fail_on: HashSet<String>,
    /// Rows silently dropped by `copy_rows`, to provoke a count mismatch.
    pub copy_short_by: usize,
    pub journal: Vec<String>,
    pub locked: Option<String>,
    /// Session `time_zone`; the server default is `SYSTEM`.
    pub time_zone: String,
    pub max_page_len: usize,
    pub pages_fetched: usize,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self {
            time_zone: "SYSTEM".to_string(),
            ..Self::default()
        }
    }

    pub fn with_table(name: &str, table: FakeTable) -> Self {
        let mut db = Self::new();
        db.tables.insert(name.to_string(), table);
        db
    }

    pub fn fail(&mut self, operation: &str) {
        self.fail_on.insert(operation.to_string());
    }

    pub fn table(&self, name: &str) -> &FakeTable {
        self.tables
            .get(name)
            .unwrap_or_else(|| panic!("table {} should exist", name))
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.table(name).rows.len()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Journal entries that change a table.
    pub fn mutations(&self) -> Vec<&String> {
        self.journal
            .iter()
            .filter(|entry| {
                ["create_table", "copy_rows", "delete_rows", "rename_table", "drop_table"]
                    .iter()
                    .any(|op| entry.starts_with(op))
            })
            .collect()
    }

    fn check(&self, operation: &str, detail: &str) -> Result<()> {
        if self.fail_on.contains(operation)
            || self.fail_on.contains(&format!("{}:{}", operation, detail))
        {
            bail!("injected failure in {} {}", operation, detail);
        }
        Ok(())
    }

    fn get(&self, table: &str) -> Result<&FakeTable> {
        self.tables
            .get(table)
            .ok_or_else(|| anyhow!("Table '{}' doesn't exist", table))
    }
}

fn matches(table: &FakeTable, row: &[CellValue], filter: &AgeFilter) -> bool {
    let idx = table
        .columns
        .iter()
        .position(|c| c.name == filter.column)
        .expect("filter column exists");
    let older = match &row[idx] {
        CellValue::DateTime(at) => Some(*at < filter.cutoff.as_datetime()),
        // NULL never satisfies a comparison
        _ => None,
    };
    match filter.comparison {
        AgeComparison::OlderThan => older == Some(true),
        AgeComparison::NotOlderThan => older != Some(true),
    }
}

#[async_trait]
impl ArchiveDatabase for FakeDatabase {
    async fn table_columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.journal.push(format!("table_columns {}", table));
        self.check("table_columns", table)?;
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn show_create_table(&mut self, table: &str) -> Result<String> {
        self.journal.push(format!("show_create_table {}", table));
        self.check("show_create_table", table)?;
        Ok(self.get(table)?.ddl.clone())
    }

    async fn count_rows(&mut self, table: &str, filter: Option<&AgeFilter>) -> Result<u64> {
        self.journal.push(format!("count_rows {}", table));
        self.check("count_rows", table)?;
        let t = self.get(table)?;
        let count = match filter {
            Some(filter) => t.rows.iter().filter(|r| matches(t, r, filter)).count(),
            None => t.rows.len(),
        };
        Ok(count as u64)
    }

    async fn create_table(&mut self, structure: &TableStructure) -> Result<()> {
        self.journal.push(format!("create_table {}", structure.table));
        self.check("create_table", &structure.table)?;
        if self.tables.contains_key(&structure.table) {
            bail!("Table '{}' already exists", structure.table);
        }
        self.tables.insert(
            structure.table.clone(),
            FakeTable {
                ddl: structure.ddl.clone(),
                columns: structure.columns.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn copy_rows(
        &mut self,
        from: &str,
        to: &str,
        _columns: &[ColumnInfo],
        filter: &AgeFilter,
    ) -> Result<u64> {
        self.journal.push(format!("copy_rows {}->{}", from, to));
        self.check("copy_rows", from)?;
        let source = self.get(from)?;
        let mut selected: Vec<Vec<CellValue>> = source
            .rows
            .iter()
            .filter(|r| matches(source, r, filter))
            .cloned()
            .collect();
        let keep = selected.len().saturating_sub(self.copy_short_by);
        selected.truncate(keep);

        let target = self
            .tables
            .get_mut(to)
            .ok_or_else(|| anyhow!("Table '{}' doesn't exist", to))?;
        let copied = selected.len() as u64;
        target.rows.extend(selected);
        Ok(copied)
    }

    async fn delete_rows(&mut self, table: &str, filter: &AgeFilter) -> Result<u64> {
        self.journal.push(format!("delete_rows {}", table));
        self.check("delete_rows", table)?;
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| anyhow!("Table '{}' doesn't exist", table))?;
        let remaining: Vec<Vec<CellValue>> = t
            .rows
            .iter()
            .filter(|r| !matches(t, r, filter))
            .cloned()
            .collect();
        let deleted = (t.rows.len() - remaining.len()) as u64;
        if let Some(t) = self.tables.get_mut(table) {
            t.rows = remaining;
        }
        Ok(deleted)
    }

    async fn rename_table(&mut self, from: &str, to: &str) -> Result<()> {
        self.journal.push(format!("rename_table {}->{}", from, to));
        self.check("rename_table", from)?;
        if self.tables.contains_key(to) {
            bail!("Table '{}' already exists", to);
        }
        let t = self
            .tables
            .remove(from)
            .ok_or_else(|| anyhow!("Table '{}' doesn't exist", from))?;
        self.tables.insert(to.to_string(), t);
        Ok(())
    }

    async fn drop_table_if_exists(&mut self, table: &str) -> Result<()> {
        self.journal.push(format!("drop_table {}", table));
        self.check("drop_table", table)?;
        self.tables.remove(table);
        Ok(())
    }

    async fn session_time_zone(&mut self) -> Result<String> {
        self.journal.push("session_time_zone".to_string());
        self.check("session_time_zone", "")?;
        Ok(self.time_zone.clone())
    }

    async fn set_session_time_zone(&mut self, zone: &str) -> Result<()> {
        self.journal.push(format!("set_session_time_zone {}", zone));
        self.check("set_session_time_zone", zone)?;
        self.time_zone = zone.to_string();
        Ok(())
    }

    async fn lock_table_read(&mut self, table: &str) -> Result<()> {
        self.journal.push(format!("lock_table_read {}", table));
        self.check("lock_table_read", table)?;
        self.locked = Some(table.to_string());
        Ok(())
    }

    async fn unlock_tables(&mut self) -> Result<()> {
        self.journal.push("unlock_tables".to_string());
        self.check("unlock_tables", "")?;
        self.locked = None;
        Ok(())
    }

    async fn fetch_page(
        &mut self,
        table: &str,
        columns: &[ColumnInfo],
        page: PageRequest,
    ) -> Result<Vec<Vec<CellValue>>> {
        self.journal
            .push(format!("fetch_page {} {}", table, page.offset));
        self.check("fetch_page", &page.offset.to_string())?;
        let t = self.get(table)?;

        let positions: Vec<usize> = columns
            .iter()
            .map(|c| {
                t.columns
                    .iter()
                    .position(|tc| tc.name == c.name)
                    .ok_or_else(|| anyhow!("Unknown column '{}'", c.name))
            })
            .collect::<Result<_>>()?;

        let rows: Vec<Vec<CellValue>> = t
            .rows
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
            .collect();

        self.pages_fetched += 1;
        self.max_page_len = self.max_page_len.max(rows.len());
        Ok(rows)
    }
}

pub const ORDERS_DDL: &str = concat!(
    "CREATE TABLE `orders` (\n",
    "  `id` bigint NOT NULL AUTO_INCREMENT,\n",
    "  `customer` varchar(64) NOT NULL,\n",
    "  `created_at` datetime NOT NULL,\n",
    "  `active` tinyint(1) NOT NULL DEFAULT '1',\n",
    "  PRIMARY KEY (`id`),\n",
    "  KEY `idx_created_at` (`created_at`)\n",
    ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
);

pub fn orders_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("id", "bigint").primary_key(),
        ColumnInfo::new("customer", "varchar(64)"),
        ColumnInfo::new("created_at", "datetime"),
        ColumnInfo::new("active", "tinyint(1)"),
    ]
}

/// 2024-04-01 12:00:00, giving a 90-day cutoff of 2024-01-02 12:00:00.
pub fn reference() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn cutoff_90_days() -> NaiveDateTime {
    reference() - Duration::days(90)
}

/// `orders` with `old` rows before the 90-day cutoff and `recent` rows at or after it.
///
/// The first recent row sits exactly on the cutoff.
pub fn orders_table(old: usize, recent: usize) -> FakeTable {
    let cutoff = cutoff_90_days();
    let mut rows = Vec::with_capacity(old + recent);
    for i in 0..old {
        rows.push(order_row(
            rows.len() as i64 + 1,
            cutoff - Duration::minutes(i as i64 + 1),
        ));
    }
    for i in 0..recent {
        rows.push(order_row(
            rows.len() as i64 + 1,
            cutoff + Duration::minutes(i as i64),
        ));
    }
    FakeTable {
        ddl: ORDERS_DDL.to_string(),
        columns: orders_columns(),
        rows,
    }
}

fn order_row(id: i64, created_at: NaiveDateTime) -> Vec<CellValue> {
    vec![
        CellValue::Int(id),
        CellValue::text(&format!("customer-{}", id)),
        CellValue::DateTime(created_at),
        CellValue::Bool(id % 2 == 0),
    ]
}
