//! Exception reports: a meter that could not be read.

use super::device::PhotoAttachment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a meter could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    DamagedMeter,
    MeterNotFound,
    AccessBlocked,
    IllegibleDisplay,
    CustomerRefused,
    DogHazard,
    Other,
}

impl ExceptionKind {
    /// Kinds that are safety or operationally critical and need a
    /// follow-up visit regardless of what the backend decides.
    pub fn requires_followup(self) -> bool {
        matches!(self, Self::DamagedMeter | Self::MeterNotFound)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DamagedMeter => "damaged_meter",
            Self::MeterNotFound => "meter_not_found",
            Self::AccessBlocked => "access_blocked",
            Self::IllegibleDisplay => "illegible_display",
            Self::CustomerRefused => "customer_refused",
            Self::DogHazard => "dog_hazard",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "damaged_meter" => Some(Self::DamagedMeter),
            "meter_not_found" => Some(Self::MeterNotFound),
            "access_blocked" => Some(Self::AccessBlocked),
            "illegible_display" => Some(Self::IllegibleDisplay),
            "customer_refused" => Some(Self::CustomerRefused),
            "dog_hazard" => Some(Self::DogHazard),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A report that a meter could not be read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterException {
    pub local_id: String,
    pub meter_id: String,
    pub meter_code: String,
    pub operator_id: String,
    pub kind: ExceptionKind,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo: Option<PhotoAttachment>,
    pub synced: bool,
    pub requires_followup: bool,
    pub created_at: DateTime<Utc>,
}

impl MeterException {
    /// Create a new unsynced exception report with a fresh `local_id`.
    pub fn new(
        meter_id: impl Into<String>,
        meter_code: impl Into<String>,
        operator_id: impl Into<String>,
        kind: ExceptionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            meter_id: meter_id.into(),
            meter_code: meter_code.into(),
            operator_id: operator_id.into(),
            kind,
            description: description.into(),
            latitude: None,
            longitude: None,
            photo: None,
            synced: false,
            requires_followup: kind.requires_followup(),
            created_at: Utc::now(),
        }
    }
}
