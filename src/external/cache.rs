//! Durable local snapshot of stock records and the movement ledger. The
//! cache mirrors state so the location breakdown survives restarts; the
//! external system stays the source of truth for totals.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

use crate::models::{MovementEntry, StockRecord};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub records: Vec<StockRecord>,
    pub movements: Vec<MovementEntry>,
}

#[async_trait]
pub trait LedgerCache: Send + Sync {
    /// Load the last persisted snapshot. Corrupt rows fall back to an
    /// empty snapshot rather than failing startup.
    async fn load(&self) -> Result<LedgerSnapshot, CacheError>;

    /// Persist the full snapshot. Called after every successful mutation.
    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), CacheError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stock_records (
    pos INTEGER PRIMARY KEY,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS movements (
    pos INTEGER PRIMARY KEY,
    payload TEXT NOT NULL
);
";

pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // One connection so in-memory databases see a single store and
        // snapshot writes serialize.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    async fn load_rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
    ) -> Result<Option<Vec<T>>, CacheError> {
        let rows: Vec<(String,)> =
            sqlx::query_as(&format!("SELECT payload FROM {table} ORDER BY pos"))
                .fetch_all(&self.pool)
                .await?;
        let mut out = Vec::with_capacity(rows.len());
        for (payload,) in rows {
            match serde_json::from_str(&payload) {
                Ok(value) => out.push(value),
                Err(e) => {
                    tracing::warn!(table, error = %e, "Corrupt cache row, resetting cache");
                    return Ok(None);
                }
            }
        }
        Ok(Some(out))
    }
}

#[async_trait]
impl LedgerCache for SqliteCache {
    async fn load(&self) -> Result<LedgerSnapshot, CacheError> {
        let records = self.load_rows::<StockRecord>("stock_records").await?;
        let movements = self.load_rows::<MovementEntry>("movements").await?;
        match (records, movements) {
            (Some(records), Some(movements)) => Ok(LedgerSnapshot { records, movements }),
            _ => Ok(LedgerSnapshot::default()),
        }
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM stock_records")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM movements").execute(&mut *tx).await?;
        for (pos, record) in snapshot.records.iter().enumerate() {
            sqlx::query("INSERT INTO stock_records (pos, payload) VALUES (?1, ?2)")
                .bind(pos as i64)
                .bind(serde_json::to_string(record)?)
                .execute(&mut *tx)
                .await?;
        }
        for (pos, movement) in snapshot.movements.iter().enumerate() {
            sqlx::query("INSERT INTO movements (pos, payload) VALUES (?1, ?2)")
                .bind(pos as i64)
                .bind(serde_json::to_string(movement)?)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
