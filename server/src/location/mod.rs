//! Vendor location data model.
//!
//! Wire shape matches what the mobile clients already send:
//! `{ "uid", "lat", "lng", "accuracy"?, "speed"?, "heading"?, "updatedAt"? }`.
//! `updatedAt` is always stamped server-side; a caller-supplied value is
//! discarded by the ingress handler before persistence.

pub mod ingress;
pub mod store;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AppError;

/// A single position report for one vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationUpdate {
    /// Opaque vendor identifier. Not interpreted beyond map keying.
    #[serde(rename = "uid")]
    pub entity_id: String,

    pub lat: f64,
    pub lng: f64,

    /// GPS accuracy radius in meters, if the device reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    /// Ground speed in m/s, if the device reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Compass heading in degrees, if the device reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    /// Server receive time, epoch milliseconds. Stamped on ingest.
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl LocationUpdate {
    /// Range-check all fields. Runs before persistence or broadcast —
    /// a rejected update leaves no trace.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.entity_id.is_empty() {
            return Err(AppError::Validation("uid must not be empty".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::Validation(format!(
                "lat {} out of range [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::Validation(format!(
                "lng {} out of range [-180, 180]",
                self.lng
            )));
        }
        if let Some(accuracy) = self.accuracy {
            if accuracy < 0.0 {
                return Err(AppError::Validation(format!(
                    "accuracy {} must be >= 0",
                    accuracy
                )));
            }
        }
        if let Some(speed) = self.speed {
            if speed < 0.0 {
                return Err(AppError::Validation(format!(
                    "speed {} must be >= 0",
                    speed
                )));
            }
        }
        if let Some(heading) = self.heading {
            if !(0.0..=360.0).contains(&heading) {
                return Err(AppError::Validation(format!(
                    "heading {} out of range [0, 360]",
                    heading
                )));
            }
        }
        Ok(())
    }
}

/// Current time in epoch milliseconds, as stamped into `updatedAt`.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
