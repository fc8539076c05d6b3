//! Persisted sync bookkeeping.
//!
//! Manages the single-row `sync_state` table shared by the foreground
//! coordinator and the background agent, so both observe one view of the
//! last sync regardless of which context performed it.

use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Point-in-time copy of the `sync_state` row.
#[derive(Debug, Clone)]
pub struct SyncStateSnapshot {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_pushed_readings: u64,
    pub last_pushed_exceptions: u64,
    pub last_failed_readings: u64,
}

/// Manages sync state persistence in the database
pub struct StateManager {
    pool: SqlitePool,
}

impl StateManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a successful push and clear any previous error.
    pub async fn record_success(
        &self,
        pushed_readings: usize,
        pushed_exceptions: usize,
        failed_readings: usize,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            "UPDATE sync_state SET
                last_sync_at = ?,
                last_error = NULL,
                last_pushed_readings = ?,
                last_pushed_exceptions = ?,
                last_failed_readings = ?,
                updated_at = ?
            WHERE id = 1",
        )
        .bind(now)
        .bind(pushed_readings as i64)
        .bind(pushed_exceptions as i64)
        .bind(failed_readings as i64)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(meterline_store::StoreError::from)?;

        Ok(())
    }

    /// Record a failed attempt; `last_sync_at` keeps its previous value.
    pub async fn record_error(&self, message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE sync_state SET
                last_error = ?,
                updated_at = ?
            WHERE id = 1",
        )
        .bind(message)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(meterline_store::StoreError::from)?;

        Ok(())
    }

    /// Read the current bookkeeping row.
    pub async fn snapshot(&self) -> Result<SyncStateSnapshot> {
        let row = sqlx::query(
            "SELECT last_sync_at, last_error, last_pushed_readings,
                    last_pushed_exceptions, last_failed_readings
             FROM sync_state WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(meterline_store::StoreError::from)?;

        let last_sync_at = row
            .get::<Option<i64>, _>("last_sync_at")
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Ok(SyncStateSnapshot {
            last_sync_at,
            last_error: row.get("last_error"),
            last_pushed_readings: row.get::<i64, _>("last_pushed_readings") as u64,
            last_pushed_exceptions: row.get::<i64, _>("last_pushed_exceptions") as u64,
            last_failed_readings: row.get::<i64, _>("last_failed_readings") as u64,
        })
    }
}
