//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
    pub vendor: VendorHealth,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct VendorHealth {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl HealthResponse {
    fn new(db_latency_ms: Option<u64>, vendor_configured: bool) -> Self {
        let connected = db_latency_ms.is_some();
        Self {
            status: if connected && vendor_configured {
                "healthy"
            } else if connected {
                "degraded"
            } else {
                "unhealthy"
            },
            version: env!("CARGO_PKG_VERSION"),
            database: DatabaseHealth {
                connected,
                latency_ms: db_latency_ms,
            },
            vendor: VendorHealth {
                configured: vendor_configured,
            },
        }
    }
}

async fn ping_database(state: &AppState) -> Option<u64> {
    let start = std::time::Instant::now();
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .ok()
        .map(|_| start.elapsed().as_millis() as u64)
}

/// GET /api/health
///
/// 503 when the database is unreachable. A missing vendor token reports
/// `degraded` but keeps the webhook path serving.
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse::new(ping_database(&state).await, state.dispatcher.is_configured());

    let status = if response.database.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// GET /api/health/live
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse { status: "alive" })
}

/// GET /api/health/ready
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match ping_database(&state).await {
        Some(_) => Ok(Json(StatusResponse { status: "ready" })),
        None => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_statuses() {
        assert_eq!(HealthResponse::new(Some(3), true).status, "healthy");
        assert_eq!(HealthResponse::new(Some(3), false).status, "degraded");
        assert_eq!(HealthResponse::new(None, true).status, "unhealthy");
    }

    #[test]
    fn test_health_serialization() {
        let json = serde_json::to_value(HealthResponse::new(Some(7), false)).unwrap();
        assert_eq!(json["database"]["connected"], true);
        assert_eq!(json["database"]["latency_ms"], 7);
        assert_eq!(json["vendor"]["configured"], false);
    }
}
