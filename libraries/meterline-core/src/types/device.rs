//! Capture-device metadata and shared geo/connectivity types.

use serde::{Deserialize, Serialize};

/// Metadata about the device a record was captured on.
///
/// Sent with every bulk upload so the backend can trace submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub platform: String,
    pub user_agent: String,
    pub app_version: String,
}

/// A photo attached to a reading or exception.
///
/// The binary payload is carried base64-encoded so it can travel inside
/// the JSON bulk payload and be stored in a TEXT column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAttachment {
    pub data_base64: String,
    pub filename: String,
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Coarse classification of the current network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionClass {
    Offline,
    Cellular,
    Wifi,
}

impl ConnectionClass {
    pub fn is_online(self) -> bool {
        self != Self::Offline
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Cellular => "cellular",
            Self::Wifi => "wifi",
        }
    }
}
