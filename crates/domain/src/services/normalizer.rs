//! Turns one raw vendor response into a typed fix and health delta.

use chrono::{DateTime, Utc};
use serde_json::Value;

use shared::validation::{validate_latitude, validate_longitude};

use super::descriptor::parse_descriptors;
use crate::models::location::DEFAULT_FIX_ACCURACY;
use crate::models::telemetry::{ElockResponse, RawDeviceResponse};
use crate::models::{DeviceHealthUpdate, NewGpsFix};

/// Why a response produced no fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoLocation,
    UnparsableCoordinates,
    CoordinatesOutOfRange,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoLocation => "no_location",
            SkipReason::UnparsableCoordinates => "unparsable_coordinates",
            SkipReason::CoordinatesOutOfRange => "coordinates_out_of_range",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedUpdate {
    pub fix: NewGpsFix,
    pub health: DeviceHealthUpdate,
    pub elock: Option<ElockResponse>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Update(NormalizedUpdate),
    Skip(SkipReason),
}

/// Reads a JSON number or a numeric string as a finite `f64`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn optional_f64(value: Option<&Value>) -> f64 {
    value.and_then(coerce_f64).unwrap_or(0.0)
}

/// Normalizes one response received at `received_at`.
///
/// The fix timestamp is the ingestion time, not the vendor's `gpsTime`.
pub fn normalize(raw: &RawDeviceResponse, received_at: DateTime<Utc>) -> Normalized {
    let Some(gps) = raw.gps_location.as_ref() else {
        return Normalized::Skip(SkipReason::NoLocation);
    };

    let (Some(latitude), Some(longitude)) = (
        gps.lat.as_ref().and_then(coerce_f64),
        gps.lon.as_ref().and_then(coerce_f64),
    ) else {
        tracing::warn!(lat = ?gps.lat, lon = ?gps.lon, "Unparsable GPS coordinates");
        return Normalized::Skip(SkipReason::UnparsableCoordinates);
    };

    if validate_latitude(latitude).is_err() || validate_longitude(longitude).is_err() {
        tracing::warn!(latitude, longitude, "GPS coordinates out of range");
        return Normalized::Skip(SkipReason::CoordinatesOutOfRange);
    }

    let readings = parse_descriptors(&raw.extra_info_desc_arr);

    Normalized::Update(NormalizedUpdate {
        fix: NewGpsFix {
            latitude,
            longitude,
            altitude: optional_f64(gps.altitude.as_ref()),
            speed: optional_f64(gps.speed.as_ref()),
            heading: optional_f64(gps.direction.as_ref()),
            accuracy: DEFAULT_FIX_ACCURACY,
            timestamp: received_at,
        },
        health: DeviceHealthUpdate {
            last_communication: received_at,
            battery_level: readings.battery_level,
            signal_strength: readings.signal_strength,
        },
        elock: raw.elock_response.as_ref().and_then(ElockResponse::from_value),
    })
}
