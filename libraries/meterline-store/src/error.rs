/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StoreError`
pub(crate) type Result<T> = std::result::Result<T, StoreError>;

/// Storage error types.
///
/// Every store operation surfaces failures of the underlying engine
/// (locked database, quota, corrupt schema) instead of silently no-oping;
/// callers treat these as local-infrastructure errors, distinct from
/// network errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Serialization/deserialization error for JSON columns
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Stored value that no longer maps to a domain enum
    #[error("Invalid stored value for {column}: {value}")]
    InvalidColumn { column: &'static str, value: String },
}

impl StoreError {
    pub(crate) fn invalid_column(column: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidColumn {
            column,
            value: value.into(),
        }
    }
}
