use thiserror::Error;

/// Errors that can occur during sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Store(#[from] meterline_store::StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] meterline_client::ClientError),

    #[error("Sync already in progress")]
    AlreadySyncing,

    #[error("No network connectivity")]
    Offline,

    /// The backend answered 2xx but flagged the whole batch as rejected.
    #[error("Backend rejected the batch: {0}")]
    BackendRejected(String),
}

impl SyncError {
    /// True for failures that leave local data untouched and are worth
    /// retrying under any of the trigger strategies.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Offline | Self::BackendRejected(_) => true,
            Self::Transport(e) => e.is_network(),
            Self::AlreadySyncing | Self::Store(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
