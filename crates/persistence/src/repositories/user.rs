//! User activity repository.
//!
//! The users table belongs to the external user system; only the session
//! activity columns are written here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::services::{SessionTracker, StoreError};

use super::store_error;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionTracker for UserRepository {
    async fn mark_active(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let timer = QueryTimer::new("mark_user_active");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active_session = true, last_location_update = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await;
        timer.record();

        if result.map_err(store_error)?.rows_affected() == 0 {
            tracing::warn!(user_id = %user_id, "Device owner not found while marking session active");
        }
        Ok(())
    }
}
