//! Alert domain model.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Alert severity levels raised by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    System,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::System => "system",
        }
    }
}

/// Alert lifecycle status. New alerts always start active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
        }
    }
}

/// An alert to be recorded against a device owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub owner_user_id: Uuid,
    pub category: AlertCategory,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub title: String,
    pub message: String,
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alert_event_serialization() {
        let event = AlertEvent {
            owner_user_id: Uuid::nil(),
            category: AlertCategory::System,
            severity: AlertSeverity::High,
            status: AlertStatus::Active,
            title: "ELock alert - 000019246001".to_string(),
            message: "Device 000019246001: LOCK_FAILURE".to_string(),
            metadata: json!({ "deviceId": "000019246001" }),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["category"], "system");
        assert_eq!(json["status"], "active");
        assert_eq!(json["metadata"]["deviceId"], "000019246001");
    }

    #[test]
    fn test_severity_strings() {
        assert_eq!(AlertSeverity::Medium.as_str(), "medium");
        assert_eq!(AlertSeverity::High.as_str(), "high");
        assert_eq!(AlertCategory::System.as_str(), "system");
    }
}
