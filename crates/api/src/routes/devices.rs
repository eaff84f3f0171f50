//! Tracker device endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use metrics::counter;
use tracing::info;
use validator::Validate;

use domain::models::device::{CreateDeviceRequest, CreateDeviceResponse, DeviceStatusResponse};
use domain::models::{DeviceIdentifier, DeviceType, LastFix, NewTrackerDevice, TrackerDevice};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;

/// Looks up a device the caller may act on.
///
/// Unknown devices are 404; devices owned by someone else are 403 unless
/// the caller's role is privileged.
pub(crate) async fn load_managed_device(
    state: &AppState,
    auth: &UserAuth,
    device_id: &DeviceIdentifier,
) -> Result<TrackerDevice, ApiError> {
    let device = state
        .registry
        .find_by_device_id(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Device {} not found", device_id)))?;

    if !(device.is_owned_by(auth.user_id) || auth.role.is_privileged()) {
        return Err(ApiError::Forbidden(
            "You do not have access to this device".to_string(),
        ));
    }

    Ok(device)
}

/// GET /api/v1/tracking/devices/:device_id/status
pub async fn get_device_status(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceStatusResponse>, ApiError> {
    let device_id = DeviceIdentifier::parse(&device_id)?;
    let device = load_managed_device(&state, &auth, &device_id).await?;

    let last_location = state
        .locations
        .latest_for_device(&device_id)
        .await?
        .map(LastFix::from);

    Ok(Json(DeviceStatusResponse::new(device, last_location)))
}

/// POST /api/v1/tracking/devices
///
/// The caller becomes the owner. Duplicate ids are rejected with 409.
pub async fn create_device(
    State(state): State<AppState>,
    auth: UserAuth,
    payload: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateDeviceResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let device_id = DeviceIdentifier::parse(&request.device_id)?;
    let device_type = match request.device_type.as_deref() {
        None => DeviceType::default(),
        Some(value) => value.parse::<DeviceType>().map_err(ApiError::Validation)?,
    };

    let device = state
        .registry
        .create_device(&NewTrackerDevice {
            device_id,
            device_type,
            owner_user_id: auth.user_id,
            imei: request.imei,
            phone_number: request.phone_number,
        })
        .await?;

    counter!("devices_registered_total", "device_type" => device.device_type.as_str()).increment(1);
    info!(
        device_id = %device.device_id,
        owner = %auth.user_id,
        "Tracker device registered"
    );

    Ok((StatusCode::CREATED, Json(device.into())))
}
