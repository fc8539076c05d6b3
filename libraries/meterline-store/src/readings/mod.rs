//! Readings collection: capture, pending lookup, sync bookkeeping,
//! retention sweep.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Duration, Utc};
use meterline_core::types::{DeviceInfo, PhotoAttachment, Reading, ValidationStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// Synced readings older than this many days are swept by
/// [`cleanup_old_synced`]. Unsynced readings are never swept.
const RETENTION_DAYS: i64 = 7;

/// Upsert a reading by `local_id`; last write wins.
///
/// Always refreshes `updated_at`. Duplicate saves are not an error: the
/// capture UI may retry freely and retries deduplicate on `local_id`.
/// No validation happens here; the validator stamps the record before it
/// reaches the store.
pub async fn save(pool: &SqlitePool, reading: &Reading) -> Result<()> {
    let now = Utc::now().timestamp();
    let messages = serde_json::to_string(&reading.validation_messages)?;

    sqlx::query(
        "INSERT INTO readings (
            local_id, meter_id, meter_code, value, captured_at,
            operator_id, operator_name, latitude, longitude,
            photo_base64, photo_filename, note,
            device_platform, device_user_agent, device_app_version,
            synced, sync_attempts, validation_status, validation_messages,
            consumption, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(local_id) DO UPDATE SET
            meter_id = excluded.meter_id,
            meter_code = excluded.meter_code,
            value = excluded.value,
            captured_at = excluded.captured_at,
            operator_id = excluded.operator_id,
            operator_name = excluded.operator_name,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            photo_base64 = excluded.photo_base64,
            photo_filename = excluded.photo_filename,
            note = excluded.note,
            device_platform = excluded.device_platform,
            device_user_agent = excluded.device_user_agent,
            device_app_version = excluded.device_app_version,
            synced = excluded.synced,
            sync_attempts = excluded.sync_attempts,
            validation_status = excluded.validation_status,
            validation_messages = excluded.validation_messages,
            consumption = excluded.consumption,
            updated_at = excluded.updated_at",
    )
    .bind(&reading.local_id)
    .bind(&reading.meter_id)
    .bind(&reading.meter_code)
    .bind(reading.value)
    .bind(reading.captured_at.timestamp())
    .bind(&reading.operator_id)
    .bind(&reading.operator_name)
    .bind(reading.latitude)
    .bind(reading.longitude)
    .bind(reading.photo.as_ref().map(|p| p.data_base64.as_str()))
    .bind(reading.photo.as_ref().map(|p| p.filename.as_str()))
    .bind(reading.note.as_deref())
    .bind(&reading.device.platform)
    .bind(&reading.device.user_agent)
    .bind(&reading.device.app_version)
    .bind(i64::from(reading.synced))
    .bind(i64::from(reading.sync_attempts))
    .bind(reading.validation_status.as_str())
    .bind(messages)
    .bind(reading.consumption)
    .bind(reading.created_at.timestamp())
    .bind(now)
    .execute(pool)
    .await?;

    debug!(local_id = %reading.local_id, "Saved reading");

    Ok(())
}

/// Get a single reading by its `local_id`.
pub async fn get(pool: &SqlitePool, local_id: &str) -> Result<Option<Reading>> {
    let row = sqlx::query("SELECT * FROM readings WHERE local_id = ?")
        .bind(local_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_reading).transpose()
}

/// All readings not yet acknowledged by the backend, in capture order.
pub async fn get_pending(pool: &SqlitePool) -> Result<Vec<Reading>> {
    let rows = sqlx::query(
        "SELECT * FROM readings WHERE synced = 0 ORDER BY created_at, local_id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_reading).collect()
}

/// All readings captured for a given meter, newest first.
pub async fn get_for_meter(pool: &SqlitePool, meter_id: &str) -> Result<Vec<Reading>> {
    let rows = sqlx::query(
        "SELECT * FROM readings WHERE meter_id = ? ORDER BY captured_at DESC",
    )
    .bind(meter_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_reading).collect()
}

/// Number of readings still waiting for sync.
pub async fn count_pending(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readings WHERE synced = 0")
        .fetch_one(pool)
        .await?;

    Ok(count as u64)
}

/// Flip `synced` for the given ids and refresh their `updated_at`.
///
/// Ids that no longer exist are silently skipped: the record may have been
/// deleted locally between the snapshot and the backend acknowledgment.
pub async fn mark_synced(pool: &SqlitePool, local_ids: &[String]) -> Result<()> {
    if local_ids.is_empty() {
        return Ok(());
    }

    let now = Utc::now().timestamp();
    let placeholders = vec!["?"; local_ids.len()].join(", ");
    let sql = format!(
        "UPDATE readings SET synced = 1, updated_at = ? WHERE local_id IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql).bind(now);
    for id in local_ids {
        query = query.bind(id);
    }
    query.execute(pool).await?;

    Ok(())
}

/// Bump the attempt counter after a failed push.
pub async fn increment_sync_attempts(pool: &SqlitePool, local_ids: &[String]) -> Result<()> {
    if local_ids.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; local_ids.len()].join(", ");
    let sql = format!(
        "UPDATE readings SET sync_attempts = sync_attempts + 1 WHERE local_id IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql);
    for id in local_ids {
        query = query.bind(id);
    }
    query.execute(pool).await?;

    Ok(())
}

/// Hard delete; succeeds even if the reading is absent.
pub async fn delete(pool: &SqlitePool, local_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM readings WHERE local_id = ?")
        .bind(local_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete synced readings whose `updated_at` is older than the retention
/// window. Returns the number deleted. Unsynced readings are never
/// touched, regardless of age.
pub async fn cleanup_old_synced(pool: &SqlitePool) -> Result<u64> {
    let cutoff = (Utc::now() - Duration::days(RETENTION_DAYS)).timestamp();

    let result = sqlx::query("DELETE FROM readings WHERE synced = 1 AND updated_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    let count = result.rows_affected();
    if count > 0 {
        info!("Swept {} synced readings past retention", count);
    }

    Ok(count)
}

fn map_reading(row: &SqliteRow) -> Result<Reading> {
    let status_str: String = row.get("validation_status");
    let validation_status = ValidationStatus::from_str(&status_str)
        .ok_or_else(|| StoreError::invalid_column("validation_status", status_str))?;

    let messages_json: String = row.get("validation_messages");
    let validation_messages: Vec<String> = serde_json::from_str(&messages_json)?;

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

    Ok(Reading {
        local_id: row.get("local_id"),
        meter_id: row.get("meter_id"),
        meter_code: row.get("meter_code"),
        value: row.get("value"),
        captured_at: timestamp(row, "captured_at")?,
        operator_id: row.get("operator_id"),
        operator_name: row.get("operator_name"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        photo,
        note: row.get("note"),
        device: DeviceInfo {
            platform: row.get("device_platform"),
            user_agent: row.get("device_user_agent"),
            app_version: row.get("device_app_version"),
        },
        synced: row.get::<i64, _>("synced") != 0,
        sync_attempts: row.get::<i64, _>("sync_attempts") as u32,
        validation_status,
        validation_messages,
        consumption: row.get("consumption"),
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

pub(crate) fn timestamp(row: &SqliteRow, column: &'static str) -> Result<DateTime<Utc>> {
    let secs: i64 = row.get(column);
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::invalid_column(column, secs.to_string()))
}
