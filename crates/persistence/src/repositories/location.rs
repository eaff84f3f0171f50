//! Location repository for database operations.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{DeviceIdentifier, GpsFix, NewGpsFix};
use domain::services::{LocationStore, StoreError};

use super::store_error;
use crate::entities::LocationEntity;
use crate::metrics::QueryTimer;

/// Repository for GPS fix database operations.
#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Creates a new LocationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for LocationRepository {
    async fn append_fix(
        &self,
        user_id: Uuid,
        device_id: &DeviceIdentifier,
        fix: &NewGpsFix,
    ) -> Result<GpsFix, StoreError> {
        let timer = QueryTimer::new("insert_location");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            INSERT INTO locations
                (user_id, device_id, latitude, longitude, altitude, speed, heading, accuracy, timestamp, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, device_id, latitude, longitude, altitude, speed, heading,
                      accuracy, timestamp, created_at
            "#,
        )
        .bind(user_id)
        .bind(device_id.as_str())
        .bind(fix.latitude)
        .bind(fix.longitude)
        .bind(fix.altitude)
        .bind(fix.speed)
        .bind(fix.heading)
        .bind(fix.accuracy)
        .bind(fix.timestamp)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map_err(store_error)?.try_into()
    }

    async fn latest_for_device(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<GpsFix>, StoreError> {
        let timer = QueryTimer::new("latest_location_for_device");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, user_id, device_id, latitude, longitude, altitude, speed, heading,
                   accuracy, timestamp, created_at
            FROM locations
            WHERE device_id = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(device_id.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(GpsFix::try_from)
            .transpose()
    }
}
