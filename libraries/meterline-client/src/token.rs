//! Bearer-credential sources.
//!
//! The foreground app holds its token in memory; the background agent has
//! no access to that state and reads its credential from a file side
//! channel instead. Both sit behind the same trait.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Where a bearer token comes from.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// A fixed in-memory token, handed over by the auth layer.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// A token read from a file on every request.
///
/// Used by the background agent, which runs outside the foreground app's
/// process and can only share a credential through the filesystem.
pub struct FileTokenSource {
    path: PathBuf,
}

impl FileTokenSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AccessTokenSource for FileTokenSource {
    async fn access_token(&self) -> Result<String> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| {
                ClientError::TokenUnavailable(format!("{}: {e}", self.path.display()))
            })?;

        let token = raw.trim();
        if token.is_empty() {
            return Err(ClientError::TokenUnavailable(format!(
                "{} is empty",
                self.path.display()
            )));
        }

        Ok(token.to_string())
    }
}
