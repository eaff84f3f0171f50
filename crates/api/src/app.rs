use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{
    AlertSink, CommandDispatcher, DeviceRegistry, LocationStore, SessionTracker,
    TelemetryIngestor,
};
use persistence::repositories::{
    AlertRepository, DeviceRepository, LocationRepository, UserRepository,
};
use shared::jwt::JwtConfig;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_user_auth,
    security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{commands, devices, health, webhooks};
use crate::services::VendorClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub locations: Arc<dyn LocationStore>,
    pub dispatcher: Arc<dyn CommandDispatcher>,
    pub ingestor: Arc<TelemetryIngestor>,
}

/// Collaborators behind the gateway.
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<dyn DeviceRegistry>,
    pub locations: Arc<dyn LocationStore>,
    pub alerts: Arc<dyn AlertSink>,
    pub sessions: Arc<dyn SessionTracker>,
    pub dispatcher: Arc<dyn CommandDispatcher>,
}

impl Services {
    /// Postgres repositories plus the vendor HTTP client.
    pub fn production(pool: &PgPool, config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            registry: Arc::new(DeviceRepository::new(pool.clone())),
            locations: Arc::new(LocationRepository::new(pool.clone())),
            alerts: Arc::new(AlertRepository::new(pool.clone())),
            sessions: Arc::new(UserRepository::new(pool.clone())),
            dispatcher: Arc::new(VendorClient::new(&config.vendor)?),
        })
    }
}

pub fn create_app(config: Config, pool: PgPool) -> anyhow::Result<Router> {
    let services = Services::production(&pool, &config)?;
    create_app_with_services(config, pool, services)
}

pub fn create_app_with_services(
    config: Config,
    pool: PgPool,
    services: Services,
) -> anyhow::Result<Router> {
    let config = Arc::new(config);
    let jwt = Arc::new(config.jwt.build()?);

    let rate_limiter = (config.security.rate_limit_per_minute > 0).then(|| {
        Arc::new(RateLimiterState::new(config.security.rate_limit_per_minute))
    });

    let ingestor = Arc::new(TelemetryIngestor::new(
        services.registry.clone(),
        services.locations.clone(),
        services.alerts,
        services.sessions,
    ));

    let state = AppState {
        pool,
        config: config.clone(),
        jwt,
        rate_limiter,
        registry: services.registry,
        locations: services.locations,
        dispatcher: services.dispatcher,
        ingestor,
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Auth runs first (outermost route_layer), then the per-user rate limit.
    let tracking_routes = Router::new()
        .route("/api/v1/tracking/commands", post(commands::send_command))
        .route(
            "/api/v1/tracking/devices/:device_id/actions",
            post(commands::device_action),
        )
        .route(
            "/api/v1/tracking/devices/:device_id/status",
            get(devices::get_device_status),
        )
        .route("/api/v1/tracking/devices", post(devices::create_device))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    let webhook_routes = Router::new()
        .route(
            "/api/v1/tracking/webhook/totarget",
            post(webhooks::receive_totarget),
        )
        .layer(DefaultBodyLimit::max(config.server.max_body_size));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Ok(Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .merge(tracking_routes)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state))
}
