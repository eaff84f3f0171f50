//! Telemetry webhook payload types.
//!
//! A delivery is a JSON object mapping device ids to arrays of response
//! objects. Fields are decoded leniently: the vendor sends coordinates as
//! strings or numbers and omits fields freely, so most of them stay as raw
//! JSON values until the normalizer coerces them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Required value of the `data-source-id` header.
pub const WEBHOOK_SOURCE_ID: &str = "TGP";

/// Required value of the `data-type` header.
pub const WEBHOOK_DATA_TYPE: &str = "HDR";

/// One delivery: device id (unvalidated) to its raw responses, in payload
/// order. Each value should be an array; that is checked per device.
pub type TelemetryBatch = serde_json::Map<String, Value>;

/// Errors that reject a whole delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("Invalid webhook headers")]
    InvalidHeaders,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Authentication headers of a webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub data_source_id: Option<String>,
    pub data_type: Option<String>,
}

impl WebhookHeaders {
    pub fn new(data_source_id: Option<&str>, data_type: Option<&str>) -> Self {
        Self {
            data_source_id: data_source_id.map(str::to_string),
            data_type: data_type.map(str::to_string),
        }
    }

    pub fn is_authentic(&self) -> bool {
        self.data_source_id.as_deref() == Some(WEBHOOK_SOURCE_ID)
            && self.data_type.as_deref() == Some(WEBHOOK_DATA_TYPE)
    }
}

/// One vendor response object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceResponse {
    pub response_type: Option<String>,
    pub msg_seq_no: Option<Value>,
    pub gps_location: Option<GpsLocationPayload>,
    #[serde(default)]
    pub extra_info_desc_arr: Vec<Value>,
    pub elock_response: Option<Value>,
}

/// The `gpsLocation` sub-object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GpsLocationPayload {
    pub lat: Option<Value>,
    pub lon: Option<Value>,
    pub altitude: Option<Value>,
    pub speed: Option<Value>,
    pub direction: Option<Value>,
}

/// Lock subsystem response carried alongside a location report.
#[derive(Debug, Clone, PartialEq)]
pub struct ElockResponse {
    pub cmd_type: Option<String>,
    pub status: Option<Value>,
    pub elock_id: Option<String>,
    /// The sub-object as received, kept for alert metadata.
    pub raw: Value,
}

impl ElockResponse {
    /// Reads the sub-object. Returns `None` when it is not a JSON object.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;

        let elock_id = match object.get("elockId") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Some(Self {
            cmd_type: object
                .get("cmdType")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: object.get("status").cloned(),
            elock_id,
            raw: raw.clone(),
        })
    }
}

/// Summary of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    /// Devices with at least one recorded fix, in first-success order.
    pub processed_device_ids: Vec<String>,
    pub errors: Vec<String>,
    pub fixes_recorded: usize,
    pub responses_skipped: usize,
    pub alerts_raised: usize,
}

/// Webhook acknowledgment body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub status: &'static str,
    pub processed_device_ids: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl From<IngestResult> for WebhookAck {
    fn from(result: IngestResult) -> Self {
        let message = format!(
            "Processed {} devices",
            result.processed_device_ids.len()
        );
        Self {
            status: "success",
            processed_device_ids: result.processed_device_ids,
            message,
            errors: if result.errors.is_empty() {
                None
            } else {
                Some(result.errors)
            },
        }
    }
}
