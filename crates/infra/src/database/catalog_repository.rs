//! SQLite-backed implementation of the `CatalogStore` port.
//!
//! Leaves are keyed by (year, brand_id, model_id, version_id); re-syncing a
//! leaf updates names, source and `last_sync` in place. Queries run on the
//! blocking pool so the async walk never holds a connection across awaits.

use std::sync::Arc;

use async_trait::async_trait;
use carindex_core::CatalogStore;
use carindex_domain::{CatalogField, CatalogItem, RecordFilter, Result, SyncRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use super::manager::DbManager;
use crate::errors::{map_join_error, InfraError};

pub struct SqliteCatalogStore {
    db: Arc<DbManager>,
}

impl SqliteCatalogStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Every stored leaf matching `filter`, ordered by composite key.
    pub async fn list(&self, filter: &RecordFilter) -> Result<Vec<SyncRecord>> {
        let filter = filter.clone();
        self.blocking(move |conn| {
            let (clause, args) = where_clause(&filter);
            let sql = format!("{RECORD_SELECT} {clause} ORDER BY year DESC, brand_id, model_id, version_id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), map_record_row)?;
            rows.collect()
        })
        .await
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            Ok(work(&*conn).map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn upsert(&self, record: &SyncRecord) -> Result<SyncRecord> {
        let record = record.clone();
        self.blocking(move |conn| {
            conn.execute(
                UPSERT_SQL,
                params![
                    record.year,
                    record.brand.id,
                    record.brand.name,
                    record.model.id,
                    record.model.name,
                    record.version.id,
                    record.version.name,
                    record.source,
                    record.last_sync,
                ],
            )?;
            debug!(year = record.year, brand_id = %record.brand.id, version_id = %record.version.id, "upserted catalog record");
            Ok(record)
        })
        .await
    }

    async fn distinct(&self, field: CatalogField, filter: &RecordFilter) -> Result<Vec<String>> {
        let filter = filter.clone();
        self.blocking(move |conn| {
            let (clause, args) = where_clause(&filter);
            let order = if field == CatalogField::Year { "DESC" } else { "ASC" };
            let sql = format!(
                "SELECT DISTINCT CAST({field} AS TEXT), {field} FROM catalog_records {clause} ORDER BY {field} {order}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let values = stmt.query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?;
            values.collect()
        })
        .await
    }

    async fn count(&self, filter: &RecordFilter) -> Result<u64> {
        let filter = filter.clone();
        self.blocking(move |conn| {
            let (clause, args) = where_clause(&filter);
            let sql = format!("SELECT COUNT(*) FROM catalog_records {clause}");
            let count: i64 = conn.query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }

    async fn latest_sync(&self) -> Result<Option<DateTime<Utc>>> {
        self.blocking(|conn| {
            conn.query_row("SELECT MAX(last_sync) FROM catalog_records", [], |row| {
                row.get::<_, Option<DateTime<Utc>>>(0)
            })
            .optional()
            .map(Option::flatten)
        })
        .await
    }
}

const UPSERT_SQL: &str = "INSERT INTO catalog_records (
        year, brand_id, brand_name, model_id, model_name, version_id, version_name, source, last_sync
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT (year, brand_id, model_id, version_id) DO UPDATE SET
        brand_name = excluded.brand_name,
        model_name = excluded.model_name,
        version_name = excluded.version_name,
        source = excluded.source,
        last_sync = excluded.last_sync";

const RECORD_SELECT: &str = "SELECT year, brand_id, brand_name, model_id, model_name,
        version_id, version_name, source, last_sync
    FROM catalog_records";

fn where_clause(filter: &RecordFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions = Vec::new();
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(year) = filter.year {
        args.push(Box::new(year));
        conditions.push(format!("year = ?{}", args.len()));
    }
    if let Some(brand_id) = &filter.brand_id {
        args.push(Box::new(brand_id.clone()));
        conditions.push(format!("brand_id = ?{}", args.len()));
    }

    if conditions.is_empty() {
        (String::new(), args)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), args)
    }
}

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<SyncRecord> {
    Ok(SyncRecord {
        year: row.get(0)?,
        brand: CatalogItem { id: row.get(1)?, name: row.get(2)? },
        model: CatalogItem { id: row.get(3)?, name: row.get(4)? },
        version: CatalogItem { id: row.get(5)?, name: row.get(6)? },
        source: row.get(7)?,
        last_sync: row.get(8)?,
    })
}
