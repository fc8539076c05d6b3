//! Meterline Store
//!
//! Offline-first `SQLite` persistence for field-captured meter readings.
//!
//! This crate owns every client-side collection: readings, exception
//! reports, the cached meter mirror, route assignments, and the shared
//! sync bookkeeping row. Each collection is a vertical slice module that
//! owns its own queries.
//!
//! # Example
//!
//! ```rust,no_run
//! use meterline_store::{create_pool, run_migrations, readings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://meterline.db").await?;
//! run_migrations(&pool).await?;
//!
//! let pending = readings::get_pending(&pool).await?;
//! println!("{} readings waiting for sync", pending.len());
//! # Ok(())
//! # }
//! ```

mod error;

// Vertical slices
pub mod exceptions;
pub mod maintenance;
pub mod meters;
pub mod readings;
pub mod routes;

pub use error::StoreError;
pub use maintenance::StorageStats;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into the binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations.
///
/// Call once at startup (and once per background-agent invocation) so the
/// schema is up to date before any collection is touched.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://meterline.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
