//! Schema-evolving upsert.
//!
//! A row-set is merged into its destination table in a single transaction:
//! the table is created on first write, missing columns are appended with an
//! inferred type, and every row is inserted or, on a natural-key match,
//! updated column by column. Rows are applied in input order, so a key that
//! repeats within one batch ends up with its last occurrence.

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info};

use super::registry::{SchemaRegistry, TableSchema};
use super::rowset::RowSet;
use super::value::{ColumnType, Value};
use crate::error::StoreError;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Merge `rows` into `table` keyed by `key_columns`.
///
/// Returns the number of input rows, whether they inserted, updated or
/// changed nothing. An empty row-set is a no-op and does not create the table.
pub async fn upsert(
    conn: &mut SqliteConnection,
    registry: &mut SchemaRegistry,
    table: &str,
    key_columns: &[&str],
    rows: &RowSet,
) -> Result<usize, StoreError> {
    if rows.is_empty() {
        return Ok(0);
    }
    validate(table, key_columns, rows)?;

    match merge(conn, registry, table, key_columns, rows).await {
        Ok(schema) => {
            registry.insert(table, schema);
            debug!(table, rows = rows.len(), "upserted row-set");
            Ok(rows.len())
        }
        Err(e) => {
            // The transaction rolled back, so whatever was cached may be ahead of the store.
            registry.invalidate(table);
            Err(e)
        }
    }
}

async fn merge(
    conn: &mut SqliteConnection,
    registry: &mut SchemaRegistry,
    table: &str,
    key_columns: &[&str],
    rows: &RowSet,
) -> Result<TableSchema, StoreError> {
    let mut tx = conn.begin().await?;

    let existing = registry.load(&mut *tx, table).await?.cloned();
    let mut schema = match existing {
        Some(schema) => schema,
        None => create_table(&mut *tx, table, rows).await?,
    };

    let missing: Vec<(String, ColumnType)> = schema
        .missing_columns(rows)
        .into_iter()
        .map(|c| (c.name.clone(), ColumnType::infer(&c.values)))
        .collect();
    for (name, ty) in missing {
        let ddl = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote(table),
            quote(&name),
            ty.sql()
        );
        sqlx::query(&ddl).execute(&mut *tx).await?;
        info!(table, column = %name, ty = ty.sql(), "added column");
        schema.columns.push((name, ty));
    }

    if !schema.has_conflict_target(key_columns) {
        let ddl = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            quote(&format!("ux_{}__{}", table, key_columns.join("__"))),
            quote(table),
            quoted_list(key_columns.iter().copied())
        );
        sqlx::query(&ddl).execute(&mut *tx).await?;
        schema
            .unique_keys
            .push(key_columns.iter().map(|k| k.to_string()).collect());
    }

    let sql = merge_statement(table, key_columns, rows);
    for i in 0..rows.len() {
        let mut query = sqlx::query(&sql);
        for value in rows.row(i) {
            query = bind_value(query, value);
        }
        query.execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(schema)
}

async fn create_table(
    conn: &mut SqliteConnection,
    table: &str,
    rows: &RowSet,
) -> Result<TableSchema, StoreError> {
    let columns: Vec<(String, ColumnType)> = rows
        .columns()
        .iter()
        .map(|c| (c.name.clone(), ColumnType::infer(&c.values)))
        .collect();

    let defs = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote(name), ty.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    sqlx::query(&format!("CREATE TABLE {} ({})", quote(table), defs))
        .execute(&mut *conn)
        .await?;
    info!(table, columns = columns.len(), "created table");

    Ok(TableSchema {
        columns,
        primary_key: Vec::new(),
        unique_keys: Vec::new(),
    })
}

fn validate(table: &str, key_columns: &[&str], rows: &RowSet) -> Result<(), StoreError> {
    check_identifier(table)?;
    for name in rows.column_names() {
        check_identifier(name)?;
    }
    if key_columns.is_empty() {
        return Err(StoreError::NoKeyColumns {
            table: table.to_string(),
        });
    }
    for key in key_columns {
        let column = rows
            .column(key)
            .ok_or_else(|| StoreError::MissingKeyColumn {
                table: table.to_string(),
                column: key.to_string(),
            })?;
        if let Some(row) = column.values.iter().position(Value::is_null) {
            return Err(StoreError::NullKey {
                table: table.to_string(),
                column: key.to_string(),
                row,
            });
        }
    }
    Ok(())
}

fn check_identifier(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Double-quote an identifier for SQLite.
pub(crate) fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quoted_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(quote).collect::<Vec<_>>().join(", ")
}

fn merge_statement(table: &str, key_columns: &[&str], rows: &RowSet) -> String {
    let columns = quoted_list(rows.column_names());
    let placeholders = (1..=rows.columns().len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = rows
        .column_names()
        .filter(|c| !key_columns.iter().any(|k| k.eq_ignore_ascii_case(c)))
        .map(|c| format!("{0} = excluded.{0}", quote(c)))
        .collect::<Vec<_>>();
    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        quote(table),
        columns,
        placeholders,
        quoted_list(key_columns.iter().copied()),
        action
    )
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Boolean(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::NaiveTimestamp(v) => query.bind(*v),
        Value::Date(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
    }
}
