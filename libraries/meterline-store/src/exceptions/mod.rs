//! Exception reports collection.

use crate::error::{Result, StoreError};
use crate::readings::timestamp;
use meterline_core::types::{ExceptionKind, MeterException, PhotoAttachment};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Upsert an exception report by `local_id`.
pub async fn save(pool: &SqlitePool, exception: &MeterException) -> Result<()> {
    sqlx::query(
        "INSERT INTO exceptions (
            local_id, meter_id, meter_code, operator_id, kind, description,
            latitude, longitude, photo_base64, photo_filename,
            synced, requires_followup, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(local_id) DO UPDATE SET
            kind = excluded.kind,
            description = excluded.description,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            photo_base64 = excluded.photo_base64,
            photo_filename = excluded.photo_filename,
            synced = excluded.synced,
            requires_followup = excluded.requires_followup",
    )
    .bind(&exception.local_id)
    .bind(&exception.meter_id)
    .bind(&exception.meter_code)
    .bind(&exception.operator_id)
    .bind(exception.kind.as_str())
    .bind(&exception.description)
    .bind(exception.latitude)
    .bind(exception.longitude)
    .bind(exception.photo.as_ref().map(|p| p.data_base64.as_str()))
    .bind(exception.photo.as_ref().map(|p| p.filename.as_str()))
    .bind(i64::from(exception.synced))
    .bind(i64::from(exception.requires_followup))
    .bind(exception.created_at.timestamp())
    .execute(pool)
    .await?;

    debug!(local_id = %exception.local_id, kind = exception.kind.as_str(), "Saved exception");

    Ok(())
}

/// All exception reports not yet acknowledged by the backend.
pub async fn get_pending(pool: &SqlitePool) -> Result<Vec<MeterException>> {
    let rows = sqlx::query(
        "SELECT * FROM exceptions WHERE synced = 0 ORDER BY created_at, local_id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_exception).collect()
}

/// Number of exception reports still waiting for sync.
pub async fn count_pending(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exceptions WHERE synced = 0")
        .fetch_one(pool)
        .await?;

    Ok(count as u64)
}

/// Flip `synced` for the given ids; missing ids are silently skipped.
pub async fn mark_synced(pool: &SqlitePool, local_ids: &[String]) -> Result<()> {
    if local_ids.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; local_ids.len()].join(", ");
    let sql = format!("UPDATE exceptions SET synced = 1 WHERE local_id IN ({placeholders})");

    let mut query = sqlx::query(&sql);
    for id in local_ids {
        query = query.bind(id);
    }
    query.execute(pool).await?;

    Ok(())
}

fn map_exception(row: &SqliteRow) -> Result<MeterException> {
    let kind_str: String = row.get("kind");
    let kind = ExceptionKind::from_str(&kind_str)
        .ok_or_else(|| StoreError::invalid_column("kind", kind_str))?;

    let photo = match (
        row.get::<Option<String>, _>("photo_base64"),
        row.get::<Option<String>, _>("photo_filename"),
    ) {
        (Some(data_base64), Some(filename)) => Some(PhotoAttachment {
            data_base64,
            filename,
        }),
        _ => None,
    };

    Ok(MeterException {
        local_id: row.get("local_id"),
        meter_id: row.get("meter_id"),
        meter_code: row.get("meter_code"),
        operator_id: row.get("operator_id"),
        kind,
        description: row.get("description"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        photo,
        synced: row.get::<i64, _>("synced") != 0,
        requires_followup: row.get::<i64, _>("requires_followup") != 0,
        created_at: timestamp(row, "created_at")?,
    })
}
