//! Route assignments: written by the download step, queried by
//! operator and date.

use crate::error::{Result, StoreError};
use chrono::NaiveDate;
use meterline_core::types::{Route, RouteStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Upsert a route by id.
pub async fn save(pool: &SqlitePool, route: &Route) -> Result<()> {
    sqlx::query(
        "INSERT INTO routes (id, operator_id, date, status, total_meters)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            operator_id = excluded.operator_id,
            date = excluded.date,
            status = excluded.status,
            total_meters = excluded.total_meters",
    )
    .bind(&route.id)
    .bind(&route.operator_id)
    .bind(route.date.to_string())
    .bind(route.status.as_str())
    .bind(i64::from(route.total_meters))
    .execute(pool)
    .await?;

    Ok(())
}

/// The operator's active route for a given day, if any.
///
/// Filters to `pending`/`in_progress` and returns at most one (first match).
pub async fn get_active(
    pool: &SqlitePool,
    operator_id: &str,
    date: NaiveDate,
) -> Result<Option<Route>> {
    let row = sqlx::query(
        "SELECT * FROM routes
         WHERE operator_id = ? AND date = ? AND status IN ('pending', 'in_progress')
         ORDER BY id
         LIMIT 1",
    )
    .bind(operator_id)
    .bind(date.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_route).transpose()
}

fn map_route(row: &SqliteRow) -> Result<Route> {
    let status_str: String = row.get("status");
    let status = RouteStatus::from_str(&status_str)
        .ok_or_else(|| StoreError::invalid_column("status", status_str))?;

    let date_str: String = row.get("date");
    let date = date_str
        .parse::<NaiveDate>()
        .map_err(|_| StoreError::invalid_column("date", date_str))?;

    Ok(Route {
        id: row.get("id"),
        operator_id: row.get("operator_id"),
        date,
        status,
        total_meters: row.get::<i64, _>("total_meters") as u32,
    })
}
