use std::collections::HashMap;

use sqlx::SqliteConnection;

use super::rowset::{Column, RowSet};
use super::value::ColumnType;

/// What the warehouse knows about one table's structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<(String, ColumnType)>,
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
}

/// Column names compare the way SQLite compares identifiers.
impl TableSchema {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, ty)| *ty)
    }

    /// Columns the row-set carries that the table does not have yet.
    pub fn missing_columns<'a>(&self, rows: &'a RowSet) -> Vec<&'a Column> {
        rows.columns()
            .iter()
            .filter(|c| !self.has_column(&c.name))
            .collect()
    }

    /// Whether a primary key or unique index covers exactly `keys`.
    pub fn has_conflict_target(&self, keys: &[&str]) -> bool {
        let wanted = sorted(keys.iter().copied());
        if !self.primary_key.is_empty()
            && sorted(self.primary_key.iter().map(String::as_str)) == wanted
        {
            return true;
        }
        self.unique_keys
            .iter()
            .any(|u| sorted(u.iter().map(String::as_str)) == wanted)
    }
}

fn sorted<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = names.map(str::to_ascii_lowercase).collect();
    out.sort_unstable();
    out
}

/// Column-type registry, one entry per table touched through the warehouse.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schema for `table`, read from the catalog on first use.
    /// `None` means the table does not exist.
    pub async fn load(
        &mut self,
        conn: &mut SqliteConnection,
        table: &str,
    ) -> Result<Option<&TableSchema>, sqlx::Error> {
        let name = table.to_ascii_lowercase();
        if !self.tables.contains_key(&name) {
            match introspect(conn, table).await? {
                Some(schema) => {
                    self.tables.insert(name.clone(), schema);
                }
                None => return Ok(None),
            }
        }
        Ok(self.tables.get(&name))
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(&table.to_ascii_lowercase())
    }

    pub fn insert(&mut self, table: &str, schema: TableSchema) {
        self.tables.insert(table.to_ascii_lowercase(), schema);
    }

    pub fn invalidate(&mut self, table: &str) {
        self.tables.remove(&table.to_ascii_lowercase());
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

/// Read a table's structure from the SQLite catalog.
pub async fn introspect(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Option<TableSchema>, sqlx::Error> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        r#"SELECT name, "type", pk FROM pragma_table_info(?1) ORDER BY cid"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut primary_key: Vec<(i64, String)> = rows
        .iter()
        .filter(|(_, _, pk)| *pk > 0)
        .map(|(name, _, pk)| (*pk, name.clone()))
        .collect();
    primary_key.sort();

    let columns = rows
        .into_iter()
        .map(|(name, decl, _)| (name, ColumnType::from_declared(&decl)))
        .collect();

    let indexes: Vec<(String, i64)> =
        sqlx::query_as(r#"SELECT name, "unique" FROM pragma_index_list(?1)"#)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

    let mut unique_keys = Vec::new();
    for (index, unique) in indexes {
        if unique == 0 {
            continue;
        }
        let cols: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
                .bind(&index)
                .fetch_all(&mut *conn)
                .await?;
        // Expression indexes have unnamed entries and can't serve as a conflict target.
        if cols.iter().all(|(name,)| name.is_some()) {
            unique_keys.push(cols.into_iter().filter_map(|(name,)| name).collect());
        }
    }

    Ok(Some(TableSchema {
        columns,
        primary_key: primary_key.into_iter().map(|(_, name)| name).collect(),
        unique_keys,
    }))
}
