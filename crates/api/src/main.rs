use anyhow::Result;
use tracing::{info, warn};

use fleet_gateway_api::{app, config, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging);
    if let Err(e) = middleware::init_metrics() {
        warn!(error = %e, "Prometheus recorder not installed");
    }

    info!("Starting Fleet Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(vendor = ?config.vendor, "Vendor endpoint configured");

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let addr = config.socket_addr()?;
    let app = app::create_app(config, pool)?;

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
