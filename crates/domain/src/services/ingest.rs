//! Telemetry webhook ingestion.
//!
//! A delivery is rejected as a whole only when its headers or envelope are
//! wrong. Past that gate, devices and responses are isolated from each other:
//! unknown devices are skipped, and a failing response is recorded in the
//! result's error list while processing carries on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::alerting::derive_alert;
use super::normalizer::{normalize, Normalized, NormalizedUpdate};
use super::store::{AlertSink, DeviceRegistry, LocationStore, SessionTracker, StoreError};
use crate::models::telemetry::RawDeviceResponse;
use crate::models::{
    DeviceIdentifier, IngestError, IngestResult, TelemetryBatch, TrackerDevice, WebhookHeaders,
};

#[derive(Debug)]
enum ResponseOutcome {
    Recorded { alert_raised: bool },
    Skipped,
}

#[derive(Debug, thiserror::Error)]
enum ResponseError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct TelemetryIngestor {
    registry: Arc<dyn DeviceRegistry>,
    locations: Arc<dyn LocationStore>,
    alerts: Arc<dyn AlertSink>,
    sessions: Arc<dyn SessionTracker>,
}

impl TelemetryIngestor {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        locations: Arc<dyn LocationStore>,
        alerts: Arc<dyn AlertSink>,
        sessions: Arc<dyn SessionTracker>,
    ) -> Self {
        Self {
            registry,
            locations,
            alerts,
            sessions,
        }
    }

    /// Authenticates and decodes a delivery, then processes every device in it.
    pub async fn ingest(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<IngestResult, IngestError> {
        tracing::info!(
            data_source_id = ?headers.data_source_id,
            data_type = ?headers.data_type,
            "Telemetry webhook received"
        );

        if !headers.is_authentic() {
            tracing::warn!(
                data_source_id = ?headers.data_source_id,
                data_type = ?headers.data_type,
                "Rejecting webhook with invalid headers"
            );
            return Err(IngestError::InvalidHeaders);
        }

        let batch: TelemetryBatch = serde_json::from_slice(body).map_err(|e| {
            tracing::error!(error = %e, "Malformed webhook payload");
            IngestError::MalformedPayload(e.to_string())
        })?;

        let result = self.process_batch(batch, Utc::now()).await;

        tracing::info!(
            processed = result.processed_device_ids.len(),
            fixes = result.fixes_recorded,
            skipped = result.responses_skipped,
            alerts = result.alerts_raised,
            errors = result.errors.len(),
            "Telemetry webhook processed"
        );

        Ok(result)
    }

    /// Processes an already decoded batch.
    pub async fn process_batch(
        &self,
        batch: TelemetryBatch,
        received_at: DateTime<Utc>,
    ) -> IngestResult {
        let mut result = IngestResult::default();
        tracing::debug!(devices = batch.len(), "Processing telemetry batch");

        for (raw_id, value) in batch {
            let device_id = match DeviceIdentifier::parse(&raw_id) {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!(device_id = %raw_id, "Skipping invalid device id");
                    continue;
                }
            };

            let device = match self.registry.find_active_by_device_id(&device_id).await {
                Ok(Some(device)) => device,
                Ok(None) => {
                    tracing::warn!(device_id = %device_id, "Skipping unknown or inactive device");
                    continue;
                }
                Err(e) => {
                    tracing::error!(device_id = %device_id, error = %e, "Device lookup failed");
                    result.errors.push(format!("device {}: {}", device_id, e));
                    continue;
                }
            };

            let Value::Array(responses) = value else {
                tracing::warn!(device_id = %device_id, "Device responses are not an array");
                result
                    .errors
                    .push(format!("device {}: responses must be an array", device_id));
                continue;
            };

            for raw in &responses {
                match self.process_response(&device, raw, received_at).await {
                    Ok(ResponseOutcome::Recorded { alert_raised }) => {
                        metrics::counter!("telemetry_responses_total", "outcome" => "recorded")
                            .increment(1);
                        result.fixes_recorded += 1;
                        if alert_raised {
                            result.alerts_raised += 1;
                        }
                        if !result.processed_device_ids.contains(&raw_id) {
                            result.processed_device_ids.push(raw_id.clone());
                        }
                    }
                    Ok(ResponseOutcome::Skipped) => {
                        metrics::counter!("telemetry_responses_total", "outcome" => "skipped")
                            .increment(1);
                        result.responses_skipped += 1;
                    }
                    Err(e) => {
                        metrics::counter!("telemetry_responses_total", "outcome" => "error")
                            .increment(1);
                        tracing::error!(device_id = %device_id, error = %e, "Failed to process response");
                        result.errors.push(format!("device {}: {}", device_id, e));
                    }
                }
            }
        }

        result
    }

    async fn process_response(
        &self,
        device: &TrackerDevice,
        raw: &Value,
        received_at: DateTime<Utc>,
    ) -> Result<ResponseOutcome, ResponseError> {
        if !raw.is_object() {
            return Err(ResponseError::NotAnObject);
        }
        let response: RawDeviceResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ResponseError::Decode(e.to_string()))?;

        tracing::debug!(
            device_id = %device.device_id,
            response_type = ?response.response_type,
            "Normalizing device response"
        );

        let update = match normalize(&response, received_at) {
            Normalized::Update(update) => update,
            Normalized::Skip(reason) => {
                tracing::warn!(
                    device_id = %device.device_id,
                    reason = reason.as_str(),
                    "Skipping device response"
                );
                return Ok(ResponseOutcome::Skipped);
            }
        };

        let alert_raised = self.apply(device, update, received_at).await?;
        Ok(ResponseOutcome::Recorded { alert_raised })
    }

    async fn apply(
        &self,
        device: &TrackerDevice,
        update: NormalizedUpdate,
        received_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let fix = self
            .locations
            .append_fix(device.owner_user_id, &device.device_id, &update.fix)
            .await?;
        self.registry
            .patch_health(&device.device_id, &update.health)
            .await?;
        self.sessions
            .mark_active(device.owner_user_id, received_at)
            .await?;

        tracing::info!(
            device_id = %device.device_id,
            fix_id = fix.id,
            latitude = fix.latitude,
            longitude = fix.longitude,
            "Recorded GPS fix"
        );

        let Some(elock) = update.elock else {
            return Ok(false);
        };

        tracing::info!(
            device_id = %device.device_id,
            cmd_type = ?elock.cmd_type,
            status = ?elock.status,
            "ELock response received"
        );

        let Some(event) = derive_alert(device, &elock) else {
            return Ok(false);
        };

        let alert_id = self.alerts.create_alert(&event).await?;
        metrics::counter!("elock_alerts_total", "severity" => event.severity.as_str())
            .increment(1);
        tracing::info!(
            device_id = %device.device_id,
            alert_id,
            severity = event.severity.as_str(),
            "ELock alert created"
        );
        Ok(true)
    }
}
