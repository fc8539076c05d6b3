//! Cached meter state, mirrored from the backend for offline validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service a meter measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Water,
    Electricity,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Electricity => "electricity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "water" => Some(Self::Water),
            "electricity" => Some(Self::Electricity),
            _ => None,
        }
    }
}

/// Read-only local mirror of backend meter state.
///
/// Populated in bulk by a download sync and never mutated locally, so the
/// validator can run against it with no network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meter {
    pub id: String,
    pub qr_code: String,
    pub service: ServiceKind,
    pub customer_id: String,
    pub customer_name: String,
    pub last_reading_value: Option<f64>,
    pub last_reading_date: Option<DateTime<Utc>>,
    pub average_consumption: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: String,
}
