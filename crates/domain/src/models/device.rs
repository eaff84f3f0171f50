//! Tracker device domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::command::CommandError;
use super::location::LastFix;

/// Hardware device identifier: exactly 12 ASCII decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceIdentifier(String);

impl DeviceIdentifier {
    pub fn parse(value: &str) -> Result<Self, CommandError> {
        if shared::validation::is_valid_device_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(CommandError::InvalidDeviceId(format!(
                "'{}' must be exactly 12 decimal digits",
                value
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceIdentifier {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceIdentifier {
    type Error = CommandError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceIdentifier> for String {
    fn from(id: DeviceIdentifier) -> Self {
        id.0
    }
}

/// Kind of tracking hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[default]
    GpsTracker,
    Smartphone,
    Satellite,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::GpsTracker => "gps_tracker",
            DeviceType::Smartphone => "smartphone",
            DeviceType::Satellite => "satellite",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gps_tracker" => Ok(DeviceType::GpsTracker),
            "smartphone" => Ok(DeviceType::Smartphone),
            "satellite" => Ok(DeviceType::Satellite),
            other => Err(format!(
                "Unknown device type '{}'. Expected gps_tracker, smartphone or satellite",
                other
            )),
        }
    }
}

/// A registered tracker and its last known health.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerDevice {
    pub id: i64,
    pub device_id: DeviceIdentifier,
    pub device_type: DeviceType,
    pub owner_user_id: Uuid,
    pub imei: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub last_communication: Option<DateTime<Utc>>,
    pub battery_level: Option<i32>,
    pub signal_strength: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackerDevice {
    /// Whether `user_id` owns this device.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_user_id == user_id
    }
}

/// Health fields refreshed after a successful telemetry response.
///
/// Applying an update always marks the device active and stamps
/// `last_communication`; battery and signal are only written when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHealthUpdate {
    pub last_communication: DateTime<Utc>,
    pub battery_level: Option<i32>,
    pub signal_strength: Option<i32>,
}

impl DeviceHealthUpdate {
    pub fn seen_at(at: DateTime<Utc>) -> Self {
        Self {
            last_communication: at,
            battery_level: None,
            signal_strength: None,
        }
    }
}

/// Input for registering a device.
#[derive(Debug, Clone)]
pub struct NewTrackerDevice {
    pub device_id: DeviceIdentifier,
    pub device_type: DeviceType,
    pub owner_user_id: Uuid,
    pub imei: Option<String>,
    pub phone_number: Option<String>,
}

/// Request payload for device registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub device_id: String,

    pub device_type: Option<String>,

    #[validate(length(max = 20, message = "IMEI must be at most 20 characters"))]
    pub imei: Option<String>,

    #[validate(length(max = 20, message = "Phone number must be at most 20 characters"))]
    pub phone_number: Option<String>,
}

/// Response payload for device registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceResponse {
    pub id: i64,
    pub device_id: DeviceIdentifier,
    pub device_type: DeviceType,
    pub imei: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TrackerDevice> for CreateDeviceResponse {
    fn from(device: TrackerDevice) -> Self {
        Self {
            id: device.id,
            device_id: device.device_id,
            device_type: device.device_type,
            imei: device.imei,
            phone_number: device.phone_number,
            is_active: device.is_active,
            created_at: device.created_at,
        }
    }
}

/// Response payload for the device status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusResponse {
    pub device_id: DeviceIdentifier,
    pub device_type: DeviceType,
    pub is_active: bool,
    pub last_communication: Option<DateTime<Utc>>,
    pub battery_level: Option<i32>,
    pub signal_strength: Option<i32>,
    pub last_location: Option<LastFix>,
}

impl DeviceStatusResponse {
    pub fn new(device: TrackerDevice, last_location: Option<LastFix>) -> Self {
        Self {
            device_id: device.device_id,
            device_type: device.device_type,
            is_active: device.is_active,
            last_communication: device.last_communication,
            battery_level: device.battery_level,
            signal_strength: device.signal_strength,
            last_location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_identifier_parse() {
        let id = DeviceIdentifier::parse("000019246001").unwrap();
        assert_eq!(id.as_str(), "000019246001");
        assert_eq!(id.to_string(), "000019246001");
    }

    #[test]
    fn test_device_identifier_rejects_invalid() {
        for value in ["", "123", "00001924600a", "0000192460011", "invalid"] {
            let err = DeviceIdentifier::parse(value).unwrap_err();
            assert!(matches!(err, CommandError::InvalidDeviceId(_)), "{}", value);
        }
    }

    #[test]
    fn test_device_identifier_serde() {
        let id: DeviceIdentifier = serde_json::from_value(json!("123456789012")).unwrap();
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("123456789012"));

        let bad: Result<DeviceIdentifier, _> = serde_json::from_value(json!("12345"));
        assert!(bad.is_err());
    }

    #[test]
    fn test_device_type_from_str() {
        assert_eq!("gps_tracker".parse::<DeviceType>().unwrap(), DeviceType::GpsTracker);
        assert_eq!("satellite".parse::<DeviceType>().unwrap(), DeviceType::Satellite);
        assert!("walkie_talkie".parse::<DeviceType>().is_err());
        assert_eq!(DeviceType::default(), DeviceType::GpsTracker);
    }

    #[test]
    fn test_create_device_request_validation() {
        let request: CreateDeviceRequest = serde_json::from_value(json!({
            "deviceId": "000019246001",
            "imei": "860000000000001"
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert!(request.device_type.is_none());

        let request: CreateDeviceRequest =
            serde_json::from_value(json!({ "deviceId": "1234" })).unwrap();
        assert!(request.validate().is_err());

        let request: CreateDeviceRequest = serde_json::from_value(json!({
            "deviceId": "000019246001",
            "phoneNumber": "+2330000000000000000000000"
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_status_response_serialization() {
        let now = Utc::now();
        let device = TrackerDevice {
            id: 1,
            device_id: DeviceIdentifier::parse("000019246001").unwrap(),
            device_type: DeviceType::GpsTracker,
            owner_user_id: Uuid::new_v4(),
            imei: None,
            phone_number: None,
            is_active: true,
            last_communication: Some(now),
            battery_level: Some(20),
            signal_strength: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(DeviceStatusResponse::new(device, None)).unwrap();
        assert_eq!(json["deviceId"], "000019246001");
        assert_eq!(json["deviceType"], "gps_tracker");
        assert_eq!(json["batteryLevel"], 20);
        assert!(json["signalStrength"].is_null());
        assert!(json["lastLocation"].is_null());
    }
}
