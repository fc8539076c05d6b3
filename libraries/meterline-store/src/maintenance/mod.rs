//! Cross-collection maintenance: aggregate stats and full reset.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::warn;

/// Aggregate storage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_readings: u64,
    pub pending_readings: u64,
    pub synced_readings: u64,
    pub total_exceptions: u64,
    pub pending_exceptions: u64,
    pub meter_count: u64,
}

/// One consistent snapshot of every counter.
///
/// All counts come from a single SELECT with scalar subqueries, so they
/// cannot disagree with each other the way separately issued counts could.
pub async fn storage_stats(pool: &SqlitePool) -> Result<StorageStats> {
    let row = sqlx::query(
        "SELECT
            (SELECT COUNT(*) FROM readings)                    AS total_readings,
            (SELECT COUNT(*) FROM readings WHERE synced = 0)   AS pending_readings,
            (SELECT COUNT(*) FROM readings WHERE synced = 1)   AS synced_readings,
            (SELECT COUNT(*) FROM exceptions)                  AS total_exceptions,
            (SELECT COUNT(*) FROM exceptions WHERE synced = 0) AS pending_exceptions,
            (SELECT COUNT(*) FROM meters)                      AS meter_count",
    )
    .fetch_one(pool)
    .await?;

    Ok(StorageStats {
        total_readings: row.get::<i64, _>("total_readings") as u64,
        pending_readings: row.get::<i64, _>("pending_readings") as u64,
        synced_readings: row.get::<i64, _>("synced_readings") as u64,
        total_exceptions: row.get::<i64, _>("total_exceptions") as u64,
        pending_exceptions: row.get::<i64, _>("pending_exceptions") as u64,
        meter_count: row.get::<i64, _>("meter_count") as u64,
    })
}

/// Wipe every collection and reset sync bookkeeping.
///
/// Only for an explicit, user-confirmed reset.
pub async fn clear_all_data(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM readings").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM exceptions").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM meters").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM routes").execute(&mut *tx).await?;
    sqlx::query(
        "UPDATE sync_state SET
            last_sync_at = NULL,
            last_error = NULL,
            last_pushed_readings = 0,
            last_pushed_exceptions = 0,
            last_failed_readings = 0,
            updated_at = NULL
         WHERE id = 1",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    warn!("All local data cleared");

    Ok(())
}
