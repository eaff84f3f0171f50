//! Vendor command endpoint client.
//!
//! One HTTPS POST per command, single attempt, no retry. Every failure is
//! logged with the device id and command type before it is returned.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::{info, warn};

use domain::models::{DeviceIdentifier, ValidatedCommand};
use domain::services::{classify_vendor_response, vendor_envelope, CommandDispatcher, DispatchError};

use crate::config::VendorConfig;

pub struct VendorClient {
    client: Client,
    api_url: String,
    api_token: String,
}

impl std::fmt::Debug for VendorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorClient")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl VendorClient {
    pub fn new(config: &VendorConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DispatchError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    async fn post(&self, body: &Value) -> Result<Value, DispatchError> {
        if self.api_token.is_empty() {
            return Err(DispatchError::Configuration(
                "vendor API token is not configured".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.api_url)
            .header(header::AUTHORIZATION, &self.api_token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        classify_vendor_response(status, &text)
    }
}

fn transport_error(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Timeout
    } else if err.is_connect() {
        DispatchError::Connection(err.to_string())
    } else {
        DispatchError::Transport(err.to_string())
    }
}

#[async_trait]
impl CommandDispatcher for VendorClient {
    async fn send(
        &self,
        device_id: &DeviceIdentifier,
        command: &ValidatedCommand,
        cache_when_offline: bool,
    ) -> Result<Value, DispatchError> {
        let command_type = command.command_type().to_string();
        let body = vendor_envelope(device_id, command, cache_when_offline);

        let outcome = self.post(&body).await;

        match &outcome {
            Ok(_) => {
                info!(
                    device_id = %device_id,
                    command_type = %command_type,
                    "Command accepted by vendor"
                );
            }
            Err(e) => {
                warn!(
                    device_id = %device_id,
                    command_type = %command_type,
                    category = e.category(),
                    error = %e,
                    "Vendor command failed"
                );
            }
        }

        let label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.category(),
        };
        counter!(
            "vendor_commands_total",
            "command_type" => command_type,
            "outcome" => label
        )
        .increment(1);

        outcome
    }

    fn is_configured(&self) -> bool {
        !self.api_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: &str) -> VendorConfig {
        VendorConfig {
            api_url: "http://127.0.0.1:9/api/send-command".to_string(),
            api_token: token.to_string(),
            timeout_secs: 1,
            cache_commands_when_offline: false,
        }
    }

    #[test]
    fn test_is_configured_requires_token() {
        assert!(VendorClient::new(&config("secret")).unwrap().is_configured());
        assert!(!VendorClient::new(&config("")).unwrap().is_configured());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = VendorClient::new(&config("super-secret")).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_network() {
        let client = VendorClient::new(&config("")).unwrap();
        let device = DeviceIdentifier::parse("000019246001").unwrap();
        let command = ValidatedCommand::from_value(serde_json::json!({"type": "RebootDevice"}))
            .unwrap();

        let err = client.send(&device, &command, false).await.unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }
}
