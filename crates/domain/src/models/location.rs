//! GPS fix domain model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::device::DeviceIdentifier;

/// Accuracy recorded for vendor fixes, in meters. The vendor does not report one.
pub const DEFAULT_FIX_ACCURACY: f64 = 10.0;

/// A stored position sample attributed to a device owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsFix {
    pub id: i64,
    pub user_id: Uuid,
    pub device_id: DeviceIdentifier,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A normalized fix ready to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Last known location for a device.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<GpsFix> for LastFix {
    fn from(fix: GpsFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            altitude: fix.altitude,
            speed: fix.speed,
            heading: fix.heading,
            accuracy: fix.accuracy,
            timestamp: fix.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_fix_from_gps_fix() {
        let now = Utc::now();
        let fix = GpsFix {
            id: 7,
            user_id: Uuid::new_v4(),
            device_id: DeviceIdentifier::parse("000019246001").unwrap(),
            latitude: 5.6037,
            longitude: -0.187,
            altitude: 12.0,
            speed: 3.5,
            heading: 90.0,
            accuracy: DEFAULT_FIX_ACCURACY,
            timestamp: now,
            created_at: now,
        };

        let last = LastFix::from(fix);
        let json = serde_json::to_value(&last).unwrap();
        assert_eq!(json["latitude"], 5.6037);
        assert_eq!(json["heading"], 90.0);
        assert_eq!(json["accuracy"], 10.0);
        assert!(json.get("timestamp").is_some());
    }
}
