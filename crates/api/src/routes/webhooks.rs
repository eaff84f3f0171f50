//! Vendor telemetry webhook.
//!
//! POST /api/v1/tracking/webhook/totarget
//!
//! Unauthenticated by JWT; the vendor identifies itself with the
//! `data-source-id` and `data-type` headers.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use domain::models::telemetry::WebhookAck;
use domain::models::WebhookHeaders;

use crate::app::AppState;
use crate::error::ApiError;

pub const DATA_SOURCE_ID_HEADER: &str = "data-source-id";
pub const DATA_TYPE_HEADER: &str = "data-type";

pub async fn receive_totarget(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let webhook_headers = WebhookHeaders::new(header(DATA_SOURCE_ID_HEADER), header(DATA_TYPE_HEADER));

    let result = state.ingestor.ingest(&webhook_headers, &body).await?;

    Ok(Json(result.into()))
}
