//! Meterline Client
//!
//! HTTP client for the meter-billing backend's bulk sync API.
//!
//! The backend is treated as a black box: one authenticated endpoint that
//! accepts a bulk payload of readings and exception reports and answers
//! with an overall success flag plus per-reading failures. Everything the
//! sync coordinator needs from the network sits behind the
//! [`BulkSyncTransport`] trait so tests can swap in an in-memory fake.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use meterline_client::{BackendConfig, HttpBulkTransport, StaticTokenSource};
//!
//! let transport = HttpBulkTransport::new(
//!     BackendConfig::new("https://portal.example.com"),
//!     Arc::new(StaticTokenSource::new("bearer-token")),
//! )?;
//! let response = transport.push_bulk(&request).await?;
//! ```

mod error;
mod token;
mod transport;
mod types;

pub use error::{ClientError, Result};
pub use token::{AccessTokenSource, FileTokenSource, StaticTokenSource};
pub use transport::{BulkSyncTransport, HttpBulkTransport};
pub use types::{
    BackendConfig, BulkSyncRequest, BulkSyncResponse, ExceptionPayload, FailedReading,
    ReadingPayload,
};
