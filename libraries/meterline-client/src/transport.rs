//! Bulk sync transport: the trait the coordinator depends on, plus the
//! reqwest implementation.

use crate::error::{ClientError, Result};
use crate::token::AccessTokenSource;
use crate::types::{BackendConfig, BulkSyncRequest, BulkSyncResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// The one network operation the sync engine performs.
#[async_trait]
pub trait BulkSyncTransport: Send + Sync {
    /// Push one bulk payload; a non-success HTTP status is a hard failure
    /// for the attempt (no partial commit).
    async fn push_bulk(&self, request: &BulkSyncRequest) -> Result<BulkSyncResponse>;
}

/// HTTP implementation against the backend's bulk endpoint.
pub struct HttpBulkTransport {
    http: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl std::fmt::Debug for HttpBulkTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBulkTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpBulkTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: BackendConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = config.url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Meterline/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }
}

#[async_trait]
impl BulkSyncTransport for HttpBulkTransport {
    async fn push_bulk(&self, request: &BulkSyncRequest) -> Result<BulkSyncResponse> {
        let url = format!("{}/api/readings/bulk-sync", self.base_url);
        let token = self.tokens.access_token().await?;

        debug!(
            url = %url,
            readings = request.readings.len(),
            exceptions = request.exceptions.len(),
            "Pushing bulk payload"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ClientError::Unreachable(e.to_string())
                } else {
                    ClientError::Request(e)
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let body: BulkSyncResponse = response.json().await.map_err(|e| {
                ClientError::ParseError(format!("Failed to parse bulk sync response: {e}"))
            })?;

            info!(
                success = body.success,
                failed = body.failed_readings.len(),
                "Bulk push acknowledged"
            );

            Ok(body)
        } else if status.as_u16() == 401 {
            Err(ClientError::AuthRequired)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ClientError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }
}
