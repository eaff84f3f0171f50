//! Tracker device repository for database operations.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use domain::models::{DeviceHealthUpdate, DeviceIdentifier, NewTrackerDevice, TrackerDevice};
use domain::services::{DeviceRegistry, StoreError};

use super::store_error;
use crate::entities::TrackerDeviceEntity;
use crate::metrics::QueryTimer;

const DEVICE_COLUMNS: &str = "id, device_id, device_type, owner_user_id, imei, phone_number, \
     is_active, last_communication, battery_level, signal_strength, created_at, updated_at";

/// Repository for tracker device database operations.
#[derive(Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by_id(
        &self,
        query_name: &str,
        device_id: &DeviceIdentifier,
        active_only: bool,
    ) -> Result<Option<TrackerDevice>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tracker_devices WHERE device_id = $1{}",
            DEVICE_COLUMNS,
            if active_only { " AND is_active = true" } else { "" }
        );

        let timer = QueryTimer::new(query_name);
        let result = sqlx::query_as::<_, TrackerDeviceEntity>(&sql)
            .bind(device_id.as_str())
            .fetch_optional(&self.pool)
            .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(TrackerDevice::try_from)
            .transpose()
    }
}

#[async_trait]
impl DeviceRegistry for DeviceRepository {
    async fn find_by_device_id(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<TrackerDevice>, StoreError> {
        self.fetch_one_by_id("find_tracker_device", device_id, false)
            .await
    }

    async fn find_active_by_device_id(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<TrackerDevice>, StoreError> {
        self.fetch_one_by_id("find_active_tracker_device", device_id, true)
            .await
    }

    async fn patch_health(
        &self,
        device_id: &DeviceIdentifier,
        update: &DeviceHealthUpdate,
    ) -> Result<(), StoreError> {
        let timer = QueryTimer::new("patch_tracker_device_health");
        let result = sqlx::query(
            r#"
            UPDATE tracker_devices
            SET is_active = true,
                last_communication = $2,
                battery_level = COALESCE($3, battery_level),
                signal_strength = COALESCE($4, signal_strength),
                updated_at = $5
            WHERE device_id = $1
            "#,
        )
        .bind(device_id.as_str())
        .bind(update.last_communication)
        .bind(update.battery_level)
        .bind(update.signal_strength)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;
        timer.record();

        if result.map_err(store_error)?.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("device {}", device_id)));
        }
        Ok(())
    }

    async fn create_device(&self, device: &NewTrackerDevice) -> Result<TrackerDevice, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO tracker_devices
                (device_id, device_type, owner_user_id, imei, phone_number, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, true, $6, $6)
            RETURNING {}
            "#,
            DEVICE_COLUMNS
        );

        let timer = QueryTimer::new("create_tracker_device");
        let result = sqlx::query_as::<_, TrackerDeviceEntity>(&sql)
            .bind(device.device_id.as_str())
            .bind(device.device_type.as_str())
            .bind(device.owner_user_id)
            .bind(device.imei.as_deref())
            .bind(device.phone_number.as_deref())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await;
        timer.record();

        result.map_err(|e| match store_error(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict(format!("Device {} already exists", device.device_id))
            }
            other => other,
        })?
        .try_into()
    }
}
