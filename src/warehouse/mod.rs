//! The local analytic store.
//!
//! One [`Warehouse`] owns the single SQLite connection of an ingestion run.
//! Writes go through the schema-evolving [`upsert`](upsert::upsert) engine.

pub mod registry;
pub mod rowset;
pub mod schema;
pub mod upsert;
pub mod value;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tracing::info;

use crate::error::StoreError;

pub use registry::{SchemaRegistry, TableSchema};
pub use rowset::{Column, Record, RowSet};
pub use schema::TableSpec;
pub use value::{ColumnType, Value};

/// Status codes api-football uses for a fixture that has been played out.
const FINISHED_STATUSES: &str = "'FT', 'AET', 'PEN'";

pub struct Warehouse {
    conn: SqliteConnection,
    registry: SchemaRegistry,
    location: String,
}

impl Warehouse {
    /// Open (creating if needed) the file-backed warehouse.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30))
            .connect()
            .await?;

        info!(path = %path.display(), "Opened warehouse");
        Ok(Self {
            conn,
            registry: SchemaRegistry::new(),
            location: path.display().to_string(),
        })
    }

    /// A private in-memory warehouse; contents vanish on close.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = SqliteConnectOptions::from_str("sqlite::memory:")?
            .connect()
            .await?;
        Ok(Self {
            conn,
            registry: SchemaRegistry::new(),
            location: ":memory:".to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Create the declared dimension and fact tables if they don't exist.
    pub async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        let mut tx = self.conn.begin().await?;
        for ddl in schema::DDL {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        self.registry.clear();
        info!(tables = schema::DECLARED.len(), "Warehouse schema ensured");
        Ok(())
    }

    /// Merge `rows` into `table` on `key_columns`. See [`upsert::upsert`].
    pub async fn upsert(
        &mut self,
        table: &str,
        key_columns: &[&str],
        rows: &RowSet,
    ) -> Result<usize, StoreError> {
        upsert::upsert(&mut self.conn, &mut self.registry, table, key_columns, rows).await
    }

    /// Upsert a row-set into the table and on the keys it carries.
    pub async fn write(&mut self, rows: &RowSet) -> Result<usize, StoreError> {
        let keys: Vec<&str> = rows.key_columns().iter().map(String::as_str).collect();
        self.upsert(rows.table(), &keys, rows).await
    }

    pub async fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        Ok(self.registry.load(&mut self.conn, table).await?.is_some())
    }

    pub async fn columns(&mut self, table: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .registry
            .load(&mut self.conn, table)
            .await?
            .map(|s| s.columns.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }

    pub async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnType>, StoreError> {
        Ok(self
            .registry
            .load(&mut self.conn, table)
            .await?
            .and_then(|s| s.column_type(column)))
    }

    /// Fixture ids already stored for a league season.
    pub async fn fixture_ids(
        &mut self,
        league_id: i64,
        season: i32,
        only_finished: bool,
    ) -> Result<Vec<i64>, StoreError> {
        let mut sql = String::from(
            "SELECT fixture_id FROM fact_fixtures WHERE league_id = ?1 AND season = ?2",
        );
        if only_finished {
            sql.push_str(&format!(" AND status_short IN ({FINISHED_STATUSES})"));
        }
        sql.push_str(" ORDER BY fixture_id");

        let ids = sqlx::query_scalar::<_, i64>(&sql)
            .bind(league_id)
            .bind(season)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(ids)
    }

    /// Raw access for ad-hoc reads. The schema cache is dropped because the
    /// caller may change table structure behind the registry's back.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        self.registry.clear();
        &mut self.conn
    }

    pub async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await?;
        info!(path = %self.location, "Closed warehouse");
        Ok(())
    }
}
