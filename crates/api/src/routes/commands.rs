//! Outbound device command endpoints.
//!
//! Both endpoints validate the command completely before the device is
//! looked up, so malformed requests never cost a database or vendor round trip.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use domain::models::{CommandAction, DeviceIdentifier, ValidatedCommand};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;
use crate::routes::devices::load_managed_device;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommandRequest {
    pub device_id: Option<String>,
    pub command: Option<Value>,
    pub cache_when_offline: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptions {
    pub cache_when_offline: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: &'static str,
    pub result: Value,
    pub message: String,
}

/// POST /api/v1/tracking/commands
///
/// Sends a raw vendor command object after the structural check.
pub async fn send_command(
    State(state): State<AppState>,
    auth: UserAuth,
    payload: Result<Json<SendCommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(request) = payload?;

    let (Some(device_id), Some(command)) = (request.device_id, request.command) else {
        return Err(ApiError::Validation(
            "deviceId and command are required".to_string(),
        ));
    };

    let device_id = DeviceIdentifier::parse(&device_id)?;
    let command = ValidatedCommand::from_value(command)?;

    dispatch(&state, &auth, device_id, command, request.cache_when_offline).await
}

/// POST /api/v1/tracking/devices/:device_id/actions
///
/// Body is a tagged action, e.g. `{"action":"seal","lockId":"L1","key":"123456"}`.
/// An optional `cacheWhenOffline` flag sits beside the action fields.
pub async fn device_action(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(device_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(body) = payload?;
    let device_id = DeviceIdentifier::parse(&device_id)?;

    let options: ActionOptions = serde_json::from_value(body.clone())
        .map_err(|e| ApiError::Validation(format!("Invalid action options: {}", e)))?;
    let action: CommandAction = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("Invalid action: {}", e)))?;
    let command = action.into_command()?.into_validated()?;

    dispatch(&state, &auth, device_id, command, options.cache_when_offline).await
}

async fn dispatch(
    state: &AppState,
    auth: &UserAuth,
    device_id: DeviceIdentifier,
    command: ValidatedCommand,
    cache_when_offline: Option<bool>,
) -> Result<Json<CommandResponse>, ApiError> {
    load_managed_device(state, auth, &device_id).await?;

    let cache = cache_when_offline.unwrap_or(state.config.vendor.cache_commands_when_offline);
    let result = state.dispatcher.send(&device_id, &command, cache).await?;

    tracing::info!(
        device_id = %device_id,
        command_type = command.command_type(),
        user_id = %auth.user_id,
        "Command dispatched"
    );

    Ok(Json(CommandResponse {
        status: "success",
        result,
        message: format!(
            "Command {} sent to device {}",
            command.command_type(),
            device_id
        ),
    }))
}
