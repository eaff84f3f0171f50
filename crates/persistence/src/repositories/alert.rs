//! Alert repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use domain::models::AlertEvent;
use domain::services::{AlertSink, StoreError};

use super::store_error;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertSink for AlertRepository {
    async fn create_alert(&self, event: &AlertEvent) -> Result<i64, StoreError> {
        let timer = QueryTimer::new("insert_alert");
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO alerts (user_id, alert_type, title, message, severity, status, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(event.owner_user_id)
        .bind(event.category.as_str())
        .bind(&event.title)
        .bind(&event.message)
        .bind(event.severity.as_str())
        .bind(event.status.as_str())
        .bind(&event.metadata)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.0)
    }
}
