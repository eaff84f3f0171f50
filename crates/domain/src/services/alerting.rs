//! ELock alert derivation.

use serde_json::json;

use crate::models::telemetry::ElockResponse;
use crate::models::{AlertCategory, AlertEvent, AlertSeverity, AlertStatus, TrackerDevice};

/// Lock acknowledgments of commands this gateway sends. They never alert.
const ACKNOWLEDGED_CMD_TYPES: [&str; 3] = ["SEAL", "UNSEAL", "CANCEL_ALARM"];

/// Severity for a vendor `cmdType`, or `None` when it does not warrant an alert.
///
/// Known acknowledgments are classified first. Anything else falls back to a
/// case-sensitive substring rule: "Failure" is high, "Alarm" is medium.
pub fn classify_cmd_type(cmd_type: &str) -> Option<AlertSeverity> {
    if ACKNOWLEDGED_CMD_TYPES.contains(&cmd_type) {
        return None;
    }

    if cmd_type.contains("Failure") {
        Some(AlertSeverity::High)
    } else if cmd_type.contains("Alarm") {
        Some(AlertSeverity::Medium)
    } else {
        None
    }
}

/// Builds the alert for an ELock response, if any.
pub fn derive_alert(device: &TrackerDevice, elock: &ElockResponse) -> Option<AlertEvent> {
    let cmd_type = elock.cmd_type.as_deref()?;
    let severity = classify_cmd_type(cmd_type)?;

    let mut message = format!("Device {}: {}", device.device_id, cmd_type);
    if let Some(elock_id) = &elock.elock_id {
        message.push_str(&format!(" (ELock ID: {})", elock_id));
    }

    Some(AlertEvent {
        owner_user_id: device.owner_user_id,
        category: AlertCategory::System,
        severity,
        status: AlertStatus::Active,
        title: format!("ELock alert - {}", device.device_id),
        message,
        metadata: json!({
            "elockResponse": elock.raw,
            "deviceId": device.device_id,
            "cmdType": cmd_type,
        }),
    })
}
