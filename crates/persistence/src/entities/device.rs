//! Tracker device entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{DeviceIdentifier, DeviceType, TrackerDevice};
use domain::services::StoreError;

/// Database row mapping for the tracker_devices table.
#[derive(Debug, Clone, FromRow)]
pub struct TrackerDeviceEntity {
    pub id: i64,
    pub device_id: String,
    pub device_type: String,
    pub owner_user_id: Uuid,
    pub imei: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub last_communication: Option<DateTime<Utc>>,
    pub battery_level: Option<i32>,
    pub signal_strength: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TrackerDeviceEntity> for TrackerDevice {
    type Error = StoreError;

    fn try_from(entity: TrackerDeviceEntity) -> Result<Self, Self::Error> {
        let device_id = DeviceIdentifier::parse(&entity.device_id)
            .map_err(|e| StoreError::Backend(format!("corrupt tracker_devices row {}: {}", entity.id, e)))?;
        let device_type = entity
            .device_type
            .parse::<DeviceType>()
            .map_err(|e| StoreError::Backend(format!("corrupt tracker_devices row {}: {}", entity.id, e)))?;

        Ok(Self {
            id: entity.id,
            device_id,
            device_type,
            owner_user_id: entity.owner_user_id,
            imei: entity.imei,
            phone_number: entity.phone_number,
            is_active: entity.is_active,
            last_communication: entity.last_communication,
            battery_level: entity.battery_level,
            signal_strength: entity.signal_strength,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
