//! Outbound command dispatch.
//!
//! [`CommandDispatcher`] is implemented over HTTP in the api crate. This module
//! owns the wire envelope and the mapping from vendor status codes to
//! [`DispatchError`] categories so both can be tested without a network.

use std::sync::Mutex;

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{DeviceIdentifier, ValidatedCommand};

/// Categorized failure of a single vendor call. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Vendor rejected the API token")]
    Authentication,

    #[error("Vendor rejected the command: {0}")]
    BadRequest(String),

    #[error("Device not accessible with this API token")]
    DeviceForbidden,

    #[error("Vendor returned status {status}: {body}")]
    Vendor { status: u16, body: String },

    #[error("Vendor request timed out")]
    Timeout,

    #[error("Could not connect to vendor: {0}")]
    Connection(String),

    #[error("Vendor returned a non-JSON response: {0}")]
    MalformedResponse(String),

    #[error("Vendor request failed: {0}")]
    Transport(String),

    #[error("Vendor client misconfigured: {0}")]
    Configuration(String),
}

impl DispatchError {
    /// Machine-readable category, used for metrics labels and error codes.
    pub fn category(&self) -> &'static str {
        match self {
            DispatchError::Authentication => "vendor_authentication",
            DispatchError::BadRequest(_) => "vendor_bad_request",
            DispatchError::DeviceForbidden => "vendor_device_forbidden",
            DispatchError::Vendor { .. } => "vendor_error",
            DispatchError::Timeout => "vendor_timeout",
            DispatchError::Connection(_) => "vendor_connection",
            DispatchError::MalformedResponse(_) => "vendor_malformed_response",
            DispatchError::Transport(_) => "vendor_transport",
            DispatchError::Configuration(_) => "vendor_configuration",
        }
    }
}

/// Builds the vendor request body for one command to one device.
pub fn vendor_envelope(
    device_id: &DeviceIdentifier,
    command: &ValidatedCommand,
    cache_when_offline: bool,
) -> Value {
    let mut commands = serde_json::Map::new();
    commands.insert(
        device_id.to_string(),
        Value::Array(vec![command.as_value().clone()]),
    );

    json!({
        "cacheCommandsWhenOffline": cache_when_offline,
        "commands": commands,
    })
}

/// Maps a vendor HTTP status and body to the call outcome.
pub fn classify_vendor_response(status: u16, body: &str) -> Result<Value, DispatchError> {
    match status {
        200 => serde_json::from_str(body)
            .map_err(|e| DispatchError::MalformedResponse(e.to_string())),
        401 => Err(DispatchError::Authentication),
        400 => Err(DispatchError::BadRequest(body.to_string())),
        403 => Err(DispatchError::DeviceForbidden),
        status => Err(DispatchError::Vendor {
            status,
            body: body.to_string(),
        }),
    }
}

/// Sends one validated command to one device.
#[async_trait::async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn send(
        &self,
        device_id: &DeviceIdentifier,
        command: &ValidatedCommand,
        cache_when_offline: bool,
    ) -> Result<Value, DispatchError>;

    /// Whether the dispatcher has the credentials it needs.
    fn is_configured(&self) -> bool {
        true
    }
}

/// A dispatch recorded by [`MockCommandDispatcher`].
#[derive(Debug, Clone)]
pub struct SentCommand {
    pub device_id: DeviceIdentifier,
    pub command: Value,
    pub cache_when_offline: bool,
}

/// Dispatcher double that records every call and returns a fixed outcome.
#[derive(Debug)]
pub struct MockCommandDispatcher {
    outcome: Result<Value, DispatchError>,
    sent: Mutex<Vec<SentCommand>>,
}

impl MockCommandDispatcher {
    /// Succeeds with a vendor-style acknowledgment.
    pub fn new() -> Self {
        Self::with_outcome(Ok(json!({ "success": true })))
    }

    /// Fails every call with `error`.
    pub fn failing(error: DispatchError) -> Self {
        Self::with_outcome(Err(error))
    }

    pub fn with_outcome(outcome: Result<Value, DispatchError>) -> Self {
        Self {
            outcome,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockCommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CommandDispatcher for MockCommandDispatcher {
    async fn send(
        &self,
        device_id: &DeviceIdentifier,
        command: &ValidatedCommand,
        cache_when_offline: bool,
    ) -> Result<Value, DispatchError> {
        tracing::info!(
            device_id = %device_id,
            command_type = command.command_type(),
            "[MOCK] Dispatching command"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentCommand {
                device_id: device_id.clone(),
                command: command.as_value().clone(),
                cache_when_offline,
            });
        }
        self.outcome.clone()
    }
}
