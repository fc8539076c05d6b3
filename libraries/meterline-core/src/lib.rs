//! Meterline Core
//!
//! Platform-agnostic domain types and validation logic for the Meterline
//! offline-first meter-reading engine.
//!
//! This crate defines:
//! - **Domain Types**: `Reading`, `MeterException`, `Meter`, `Route`, etc.
//! - **Validation**: the pure, offline reading validator
//!
//! The validator takes only a candidate value and a plain meter-history
//! record, so it can be exercised in unit tests without any store or
//! network dependency.
//!
//! # Example
//!
//! ```rust
//! use meterline_core::types::{DeviceInfo, Reading};
//! use meterline_core::validation::{validate_reading, MeterHistory};
//!
//! let history = MeterHistory {
//!     last_value: Some(120.0),
//!     average_consumption: Some(10.0),
//!     latitude: None,
//!     longitude: None,
//! };
//!
//! let outcome = validate_reading(128.0, None, Some(&history));
//! assert!(outcome.is_valid);
//! ```

#![forbid(unsafe_code)]

pub mod types;
pub mod validation;

// Re-export commonly used types
pub use types::{
    ConnectionClass, DeviceInfo, ExceptionKind, GeoPoint, Meter, MeterException, PhotoAttachment,
    Reading, Route, RouteStatus, ServiceKind, ValidationStatus,
};
pub use validation::{
    validate_reading, Anomaly, AnomalyKind, MeterHistory, ReviewLevel, Severity,
    ValidationOutcome,
};
