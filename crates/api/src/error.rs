use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain::models::{CommandError, IngestError};
use domain::services::{DispatchError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Field-level failures from a `validator` derive.
    #[error("Validation error: {message}")]
    InvalidFields {
        message: String,
        details: Vec<ValidationDetail>,
    },

    /// A 400 carrying a specific machine-readable code.
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Rate limit of {limit} requests/minute exceeded")]
    RateLimited { limit: u32, retry_after: u64 },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

fn dispatch_status(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        DispatchError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut details = None;
        let mut retry_after = None;
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::InvalidFields {
                message,
                details: fields,
            } => {
                details = Some(fields);
                (StatusCode::BAD_REQUEST, "validation_error", message)
            }
            ApiError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiError::RateLimited { limit, retry_after: secs } => {
                retry_after = Some(secs);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    format!("Rate limit of {} requests/minute exceeded", limit),
                )
            }
            ApiError::Dispatch(err) => (dispatch_status(&err), err.category(), err.to_string()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        let code = match &err {
            CommandError::InvalidDeviceId(_) => "invalid_device_id",
            CommandError::InvalidCommand(_) => "invalid_command",
            CommandError::InvalidParameter { .. } => "invalid_parameter",
        };
        ApiError::BadRequest {
            code,
            message: err.to_string(),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let code = match &err {
            IngestError::InvalidHeaders => "invalid_headers",
            IngestError::MalformedPayload(_) => "malformed_payload",
        };
        ApiError::BadRequest {
            code,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Backend(msg) => ApiError::Internal(format!("Storage error: {}", msg)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::InvalidFields { message, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_api_error_statuses() {
        let cases = [
            (ApiError::Unauthorized("t".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("t".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("t".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("t".into()), StatusCode::CONFLICT),
            (ApiError::Validation("t".into()), StatusCode::BAD_REQUEST),
            (ApiError::Internal("t".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_dispatch_error_statuses() {
        let cases = [
            (DispatchError::Authentication, StatusCode::BAD_GATEWAY),
            (DispatchError::BadRequest("x".into()), StatusCode::BAD_GATEWAY),
            (DispatchError::DeviceForbidden, StatusCode::BAD_GATEWAY),
            (
                DispatchError::Vendor {
                    status: 500,
                    body: "x".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (DispatchError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (DispatchError::Connection("x".into()), StatusCode::BAD_GATEWAY),
            (
                DispatchError::MalformedResponse("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (DispatchError::Transport("x".into()), StatusCode::BAD_GATEWAY),
            (
                DispatchError::Configuration("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_dispatch_error_body_names_category() {
        let (status, body) = body_json(DispatchError::DeviceForbidden.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "vendor_device_forbidden");
        assert!(body["message"].as_str().unwrap().contains("Device"));
    }

    #[tokio::test]
    async fn test_command_error_body() {
        let (status, body) = body_json(
            CommandError::InvalidParameter {
                parameter: "gate",
                reason: "Lock gate must be between 1 and 255".into(),
            }
            .into(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_parameter");
        assert!(body["message"].as_str().unwrap().contains("gate"));
    }

    #[tokio::test]
    async fn test_ingest_error_codes() {
        let (_, body) = body_json(IngestError::InvalidHeaders.into()).await;
        assert_eq!(body["error"], "invalid_headers");

        let (_, body) = body_json(IngestError::MalformedPayload("eof".into()).into()).await;
        assert_eq!(body["error"], "malformed_payload");
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ApiError::from(StoreError::Conflict("dup".into())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::NotFound("x".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Backend("x".into())),
            ApiError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            limit: 100,
            retry_after: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "rate_limited");
        assert!(body["message"].as_str().unwrap().contains("100"));
    }

    #[tokio::test]
    async fn test_field_errors_listed_in_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut error = validator::ValidationError::new("length");
        error.message = Some("IMEI must be at most 20 characters".into());
        errors.add("imei", error);

        let (status, body) = body_json(errors.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "IMEI must be at most 20 characters");
        assert_eq!(body["details"][0]["field"], "imei");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (_, body) = body_json(ApiError::Internal("db password wrong".into())).await;
        assert_eq!(body["message"], "An internal error occurred");
    }
}
