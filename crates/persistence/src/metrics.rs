//! Database metrics.
//!
//! Repositories wrap every query in a [`QueryTimer`]; the connection pool
//! gauges are refreshed whenever `/metrics` is scraped.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Records one query duration under `database_query_duration_seconds{query}`.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Publishes connection pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times a repository query.
///
/// ```ignore
/// let timer = QueryTimer::new("find_tracker_device");
/// let result = sqlx::query_as::<_, TrackerDeviceEntity>(sql).fetch_optional(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    /// Records the elapsed time. Consumes the timer.
    pub fn record(self) {
        record_query_duration(&self.query_name, self.start.elapsed().as_secs_f64());
    }
}
