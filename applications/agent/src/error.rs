/// Agent error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] meterline_store::StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] meterline_sync::SyncError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
