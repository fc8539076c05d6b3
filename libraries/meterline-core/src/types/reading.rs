//! Reading: one field-captured meter observation.

use super::device::{DeviceInfo, PhotoAttachment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validation verdict stamped on a reading at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pending,
    Valid,
    Anomaly,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Anomaly => "anomaly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "valid" => Some(Self::Valid),
            "anomaly" => Some(Self::Anomaly),
            _ => None,
        }
    }
}

/// A meter reading captured in the field.
///
/// `local_id` is client-generated, globally unique, and immutable. It is
/// the sole deduplication key across sync retries; the backend is expected
/// to be idempotent on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub local_id: String,
    pub meter_id: String,
    pub meter_code: String,
    pub value: f64,
    pub captured_at: DateTime<Utc>,
    pub operator_id: String,
    pub operator_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo: Option<PhotoAttachment>,
    pub note: Option<String>,
    pub device: DeviceInfo,
    pub synced: bool,
    pub sync_attempts: u32,
    pub validation_status: ValidationStatus,
    pub validation_messages: Vec<String>,
    /// Current value minus the last known value, when known at capture time.
    pub consumption: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reading {
    /// Create a new unsynced reading with a fresh `local_id`.
    pub fn new(
        meter_id: impl Into<String>,
        meter_code: impl Into<String>,
        value: f64,
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        device: DeviceInfo,
    ) -> Self {
        let now = Utc::now();
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            meter_id: meter_id.into(),
            meter_code: meter_code.into(),
            value,
            captured_at: now,
            operator_id: operator_id.into(),
            operator_name: operator_name.into(),
            latitude: None,
            longitude: None,
            photo: None,
            note: None,
            device,
            synced: false,
            sync_attempts: 0,
            validation_status: ValidationStatus::Pending,
            validation_messages: Vec::new(),
            consumption: None,
            created_at: now,
            updated_at: now,
        }
    }
}
