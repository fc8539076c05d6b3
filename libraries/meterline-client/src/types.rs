//! Wire types for the backend bulk sync API.

use chrono::{DateTime, NaiveDate, Utc};
use meterline_core::types::{DeviceInfo, MeterException, PhotoAttachment, Reading};
use serde::{Deserialize, Serialize};

/// Configuration for connecting to the billing backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g., "https://portal.example.com")
    pub url: String,
}

impl BackendConfig {
    /// Create a new backend config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One reading as the backend expects it.
///
/// Purely local bookkeeping (`synced`, `sync_attempts`, `updated_at`) is
/// stripped; `local_id` stays because the backend deduplicates on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub local_id: String,
    pub meter_id: String,
    pub meter_code: String,
    pub value: f64,
    pub captured_at: DateTime<Utc>,
    pub operator_id: String,
    pub operator_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<PhotoAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub validation_status: String,
    pub validation_messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption: Option<f64>,
}

impl From<&Reading> for ReadingPayload {
    fn from(reading: &Reading) -> Self {
        Self {
            local_id: reading.local_id.clone(),
            meter_id: reading.meter_id.clone(),
            meter_code: reading.meter_code.clone(),
            value: reading.value,
            captured_at: reading.captured_at,
            operator_id: reading.operator_id.clone(),
            operator_name: reading.operator_name.clone(),
            latitude: reading.latitude,
            longitude: reading.longitude,
            photo: reading.photo.clone(),
            note: reading.note.clone(),
            validation_status: reading.validation_status.as_str().to_string(),
            validation_messages: reading.validation_messages.clone(),
            consumption: reading.consumption,
        }
    }
}

/// One exception report as the backend expects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionPayload {
    pub local_id: String,
    pub meter_id: String,
    pub meter_code: String,
    pub operator_id: String,
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<PhotoAttachment>,
    pub requires_followup: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&MeterException> for ExceptionPayload {
    fn from(exception: &MeterException) -> Self {
        Self {
            local_id: exception.local_id.clone(),
            meter_id: exception.meter_id.clone(),
            meter_code: exception.meter_code.clone(),
            operator_id: exception.operator_id.clone(),
            kind: exception.kind.as_str().to_string(),
            description: exception.description.clone(),
            latitude: exception.latitude,
            longitude: exception.longitude,
            photo: exception.photo.clone(),
            requires_followup: exception.requires_followup,
            created_at: exception.created_at,
        }
    }
}

/// Full bulk payload sent per sync attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSyncRequest {
    pub operator_id: String,
    pub date: NaiveDate,
    pub readings: Vec<ReadingPayload>,
    pub exceptions: Vec<ExceptionPayload>,
    pub device_info: DeviceInfo,
}

/// One reading the backend rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedReading {
    pub local_id: String,
    pub reason: String,
}

/// Backend response to a bulk push.
///
/// `failed_readings` may be absent entirely; the backend contract has no
/// per-record failure channel for exceptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSyncResponse {
    pub success: bool,
    #[serde(default)]
    pub failed_readings: Vec<FailedReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
