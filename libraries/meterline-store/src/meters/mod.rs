//! Cached meter mirror: bulk overwrite from the backend, QR lookup.

use crate::error::{Result, StoreError};
use chrono::DateTime;
use meterline_core::types::{Meter, ServiceKind};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Replace the cached mirror with a fresh download from the backend.
///
/// Runs in one transaction so readers never observe a half-written cache.
pub async fn cache_all(pool: &SqlitePool, meters: &[Meter]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM meters").execute(&mut *tx).await?;

    for meter in meters {
        sqlx::query(
            "INSERT INTO meters (
                id, qr_code, service, customer_id, customer_name,
                last_reading_value, last_reading_date, average_consumption,
                latitude, longitude, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&meter.id)
        .bind(&meter.qr_code)
        .bind(meter.service.as_str())
        .bind(&meter.customer_id)
        .bind(&meter.customer_name)
        .bind(meter.last_reading_value)
        .bind(meter.last_reading_date.map(|d| d.timestamp()))
        .bind(meter.average_consumption)
        .bind(meter.latitude)
        .bind(meter.longitude)
        .bind(&meter.status)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!("Cached {} meters", meters.len());

    Ok(())
}

/// Look up a meter by its QR code (unique index).
pub async fn get_by_qr(pool: &SqlitePool, qr_code: &str) -> Result<Option<Meter>> {
    let row = sqlx::query("SELECT * FROM meters WHERE qr_code = ?")
        .bind(qr_code)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_meter).transpose()
}

/// All cached meters.
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Meter>> {
    let rows = sqlx::query("SELECT * FROM meters ORDER BY qr_code")
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_meter).collect()
}

/// Number of meters in the cache.
pub async fn count(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meters")
        .fetch_one(pool)
        .await?;

    Ok(count as u64)
}

/// Clear the cache wholesale.
pub async fn clear(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM meters").execute(pool).await?;

    Ok(())
}

fn map_meter(row: &SqliteRow) -> Result<Meter> {
    let service_str: String = row.get("service");
    let service = ServiceKind::from_str(&service_str)
        .ok_or_else(|| StoreError::invalid_column("service", service_str))?;

    let last_reading_date = row
        .get::<Option<i64>, _>("last_reading_date")
        .map(|secs| {
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| StoreError::invalid_column("last_reading_date", secs.to_string()))
        })
        .transpose()?;

    Ok(Meter {
        id: row.get("id"),
        qr_code: row.get("qr_code"),
        service,
        customer_id: row.get("customer_id"),
        customer_name: row.get("customer_name"),
        last_reading_value: row.get("last_reading_value"),
        last_reading_date,
        average_consumption: row.get("average_consumption"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        status: row.get("status"),
    })
}
