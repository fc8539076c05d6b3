//! Predictive reading validation.
//!
//! Classifies a candidate reading against the cached meter history without
//! any store or network dependency. Anomalies are data, never errors: the
//! validator is infallible and always returns a full [`ValidationOutcome`].

use crate::types::{GeoPoint, Meter, ValidationStatus};
use serde::{Deserialize, Serialize};

/// Earth radius in meters, used for the great-circle distance check.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Maximum tolerated distance between a capture and the meter's
/// registered location before a GPS mismatch is raised.
const GPS_TOLERANCE_M: f64 = 50.0;

/// Consumption above this percentage of the historical average is critical.
const HIGH_CONSUMPTION_CRITICAL_PCT: f64 = 300.0;

/// Consumption above this percentage of the historical average is suspect.
const HIGH_CONSUMPTION_WARNING_PCT: f64 = 150.0;

/// Consumption below this percentage of the historical average is suspect.
const LOW_CONSUMPTION_WARNING_PCT: f64 = 30.0;

/// How severe a single anomaly is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

/// How much human review the reading needs before billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewLevel {
    AutoApproved,
    LightReview,
    DeepReview,
}

/// What kind of anomaly was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    UnknownMeter,
    NegativeConsumption,
    ZeroConsumption,
    HighConsumption,
    LowConsumption,
    GpsMismatch,
}

/// A single detected anomaly with operator guidance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    pub suggested_action: String,
}

/// The meter history the validator needs, decoupled from storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterHistory {
    pub last_value: Option<f64>,
    pub average_consumption: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<&Meter> for MeterHistory {
    fn from(meter: &Meter) -> Self {
        Self {
            last_value: meter.last_reading_value,
            average_consumption: meter.average_consumption,
            latitude: meter.latitude,
            longitude: meter.longitude,
        }
    }
}

/// Complete validation verdict for a candidate reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub level: ReviewLevel,
    pub messages: Vec<String>,
    pub anomalies: Vec<Anomaly>,
    /// Current value minus last known value, when a prior reading exists.
    pub consumption: Option<f64>,
}

impl ValidationOutcome {
    /// Status to stamp on the stored reading.
    pub fn status(&self) -> ValidationStatus {
        if self.anomalies.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Anomaly
        }
    }

    fn finish(messages: Vec<String>, anomalies: Vec<Anomaly>, consumption: Option<f64>) -> Self {
        let max_severity = anomalies.iter().map(|a| a.severity).max();
        let level = match max_severity {
            Some(Severity::Critical | Severity::Error) => ReviewLevel::DeepReview,
            Some(Severity::Warning) => ReviewLevel::LightReview,
            None => ReviewLevel::AutoApproved,
        };
        // Uniform policy: warnings alone leave the reading valid, anything
        // at error severity or above does not.
        let is_valid = !matches!(max_severity, Some(Severity::Error | Severity::Critical));

        Self {
            is_valid,
            level,
            messages,
            anomalies,
            consumption,
        }
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Validate a candidate reading value against the cached meter history.
///
/// `meter` is `None` when the meter could not be found in the local cache;
/// `gps` is the capture location when the device provided one.
pub fn validate_reading(
    value: f64,
    gps: Option<GeoPoint>,
    meter: Option<&MeterHistory>,
) -> ValidationOutcome {
    let mut messages = Vec::new();
    let mut anomalies = Vec::new();

    let Some(meter) = meter else {
        messages.push("Meter not found in the local cache".to_string());
        anomalies.push(Anomaly {
            kind: AnomalyKind::UnknownMeter,
            severity: Severity::Error,
            message: "Meter is not present in the offline cache".to_string(),
            suggested_action: "Refresh the meter cache before capturing readings".to_string(),
        });
        return ValidationOutcome::finish(messages, anomalies, None);
    };

    let Some(last_value) = meter.last_value else {
        messages.push("First reading for this meter".to_string());
        return ValidationOutcome::finish(messages, anomalies, None);
    };

    let consumption = value - last_value;

    if consumption < 0.0 {
        messages.push(format!(
            "Reading {value} is below the last recorded value {last_value}"
        ));
        anomalies.push(Anomaly {
            kind: AnomalyKind::NegativeConsumption,
            severity: Severity::Critical,
            message: "Negative consumption: possible meter replacement or capture error"
                .to_string(),
            suggested_action: "Re-take the reading; a photo is required".to_string(),
        });
    } else if consumption == 0.0 {
        messages.push("Zero consumption since the last reading".to_string());
        anomalies.push(Anomaly {
            kind: AnomalyKind::ZeroConsumption,
            severity: Severity::Warning,
            message: "Zero consumption since the last reading".to_string(),
            suggested_action: "Verify the meter works and whether the customer is absent"
                .to_string(),
        });
    } else if let Some(average) = meter.average_consumption {
        if average > 0.0 {
            let percentage = consumption / average * 100.0;

            if percentage > HIGH_CONSUMPTION_CRITICAL_PCT {
                messages.push(format!(
                    "Consumption {consumption:.1} is over 3x the historical average {average:.1}"
                ));
                anomalies.push(Anomaly {
                    kind: AnomalyKind::HighConsumption,
                    severity: Severity::Critical,
                    message: "Consumption is more than three times the historical average"
                        .to_string(),
                    suggested_action: "Re-take the reading; a photo is mandatory".to_string(),
                });
            } else if percentage > HIGH_CONSUMPTION_WARNING_PCT {
                messages.push(format!(
                    "Consumption {consumption:.1} is over 50% above the average {average:.1}"
                ));
                anomalies.push(Anomaly {
                    kind: AnomalyKind::HighConsumption,
                    severity: Severity::Warning,
                    message: "Consumption is more than 50% above the historical average"
                        .to_string(),
                    suggested_action: "Confirm the reading with the customer".to_string(),
                });
            } else if percentage < LOW_CONSUMPTION_WARNING_PCT {
                messages.push(format!(
                    "Consumption {consumption:.1} is over 70% below the average {average:.1}"
                ));
                anomalies.push(Anomaly {
                    kind: AnomalyKind::LowConsumption,
                    severity: Severity::Warning,
                    message: "Consumption is more than 70% below the historical average"
                        .to_string(),
                    suggested_action: "Check for customer absence or a faulty meter".to_string(),
                });
            }
        }
    }

    if let (Some(capture), Some(lat), Some(lon)) = (gps, meter.latitude, meter.longitude) {
        let registered = GeoPoint::new(lat, lon);
        let distance = haversine_distance_m(capture, registered);

        if distance > GPS_TOLERANCE_M {
            messages.push(format!(
                "Capture location is {distance:.0} m from the registered meter location"
            ));
            anomalies.push(Anomaly {
                kind: AnomalyKind::GpsMismatch,
                severity: Severity::Error,
                message: "Capture location does not match the registered meter location"
                    .to_string(),
                suggested_action: "Confirm you are at the right meter".to_string(),
            });
        }
    }

    ValidationOutcome::finish(messages, anomalies, Some(consumption))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(last: f64, average: Option<f64>) -> MeterHistory {
        MeterHistory {
            last_value: Some(last),
            average_consumption: average,
            latitude: None,
            longitude: None,
        }
    }

    fn kinds(outcome: &ValidationOutcome) -> Vec<AnomalyKind> {
        outcome.anomalies.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn unknown_meter_requires_deep_review() {
        let outcome = validate_reading(100.0, None, None);

        assert!(!outcome.is_valid);
        assert_eq!(outcome.level, ReviewLevel::DeepReview);
        assert_eq!(kinds(&outcome), vec![AnomalyKind::UnknownMeter]);
        assert_eq!(outcome.consumption, None);
    }

    #[test]
    fn first_reading_is_auto_approved() {
        let meter = MeterHistory::default();
        let outcome = validate_reading(42.0, None, Some(&meter));

        assert!(outcome.is_valid);
        assert_eq!(outcome.level, ReviewLevel::AutoApproved);
        assert!(outcome.anomalies.is_empty());
        assert_eq!(outcome.status(), ValidationStatus::Valid);
    }

    #[test]
    fn negative_consumption_is_critical() {
        let meter = history(100.0, None);
        let outcome = validate_reading(90.0, None, Some(&meter));

        assert!(!outcome.is_valid);
        assert_eq!(outcome.level, ReviewLevel::DeepReview);
        assert_eq!(kinds(&outcome), vec![AnomalyKind::NegativeConsumption]);
        assert_eq!(outcome.anomalies[0].severity, Severity::Critical);
        assert_eq!(outcome.consumption, Some(-10.0));
    }

    #[test]
    fn zero_consumption_is_a_warning() {
        let meter = history(100.0, None);
        let outcome = validate_reading(100.0, None, Some(&meter));

        // Warnings keep the reading valid but ask for a light review.
        assert!(outcome.is_valid);
        assert_eq!(outcome.level, ReviewLevel::LightReview);
        assert_eq!(kinds(&outcome), vec![AnomalyKind::ZeroConsumption]);
        assert_eq!(outcome.anomalies[0].severity, Severity::Warning);
        assert_eq!(outcome.status(), ValidationStatus::Anomaly);
    }

    #[test]
    fn consumption_bands_against_average() {
        let meter = history(1000.0, Some(100.0));

        // 301% of average: critical.
        let outcome = validate_reading(1301.0, None, Some(&meter));
        assert_eq!(kinds(&outcome), vec![AnomalyKind::HighConsumption]);
        assert_eq!(outcome.anomalies[0].severity, Severity::Critical);
        assert!(!outcome.is_valid);

        // 200% of average: warning band.
        let outcome = validate_reading(1200.0, None, Some(&meter));
        assert_eq!(kinds(&outcome), vec![AnomalyKind::HighConsumption]);
        assert_eq!(outcome.anomalies[0].severity, Severity::Warning);
        assert!(outcome.is_valid);

        // 120% of average: normal.
        let outcome = validate_reading(1120.0, None, Some(&meter));
        assert!(outcome.anomalies.is_empty());
        assert_eq!(outcome.level, ReviewLevel::AutoApproved);

        // 29% of average: low-consumption warning.
        let outcome = validate_reading(1029.0, None, Some(&meter));
        assert_eq!(kinds(&outcome), vec![AnomalyKind::LowConsumption]);
        assert_eq!(outcome.anomalies[0].severity, Severity::Warning);
    }

    #[test]
    fn consumption_band_edges() {
        let meter = history(0.0, Some(100.0));

        // Exactly 300%: still the warning band, not critical.
        let outcome = validate_reading(300.0, None, Some(&meter));
        assert_eq!(outcome.anomalies[0].severity, Severity::Warning);

        // Exactly 150%: normal.
        let outcome = validate_reading(150.0, None, Some(&meter));
        assert!(outcome.anomalies.is_empty());

        // Exactly 30%: normal.
        let outcome = validate_reading(30.0, None, Some(&meter));
        assert!(outcome.anomalies.is_empty());
    }

    #[test]
    fn gps_mismatch_beyond_tolerance() {
        // Move due north by a known arc length; haversine degenerates to
        // R * delta_lat for a pure latitude offset.
        let meters_to_lat = |m: f64| (m / EARTH_RADIUS_M).to_degrees();

        let mut meter = history(100.0, None);
        meter.latitude = Some(10.0);
        meter.longitude = Some(20.0);

        let near = GeoPoint::new(10.0 + meters_to_lat(49.9), 20.0);
        let outcome = validate_reading(150.0, Some(near), Some(&meter));
        assert!(!kinds(&outcome).contains(&AnomalyKind::GpsMismatch));

        let far = GeoPoint::new(10.0 + meters_to_lat(51.0), 20.0);
        let outcome = validate_reading(150.0, Some(far), Some(&meter));
        assert!(kinds(&outcome).contains(&AnomalyKind::GpsMismatch));
        let gps = outcome
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::GpsMismatch)
            .unwrap();
        assert_eq!(gps.severity, Severity::Error);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.level, ReviewLevel::DeepReview);
    }

    #[test]
    fn gps_check_skipped_without_both_locations() {
        let meter = history(100.0, None);
        let capture = GeoPoint::new(45.0, 7.0);

        // Meter has no registered location: no GPS anomaly possible.
        let outcome = validate_reading(150.0, Some(capture), Some(&meter));
        assert!(!kinds(&outcome).contains(&AnomalyKind::GpsMismatch));
    }

    #[test]
    fn haversine_known_distance() {
        // One degree of latitude at the equator.
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        let d = haversine_distance_m(a, b);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn most_severe_anomaly_wins() {
        // Zero consumption (warning) plus GPS mismatch (error): overall
        // level must follow the error.
        let mut meter = history(100.0, None);
        meter.latitude = Some(0.0);
        meter.longitude = Some(0.0);

        let far = GeoPoint::new(1.0, 0.0);
        let outcome = validate_reading(100.0, Some(far), Some(&meter));

        assert_eq!(outcome.anomalies.len(), 2);
        assert_eq!(outcome.level, ReviewLevel::DeepReview);
        assert!(!outcome.is_valid);
    }
}
