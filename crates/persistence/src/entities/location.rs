//! Location entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{DeviceIdentifier, GpsFix};
use domain::services::StoreError;

/// Database row mapping for the locations table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationEntity {
    pub id: i64,
    pub user_id: Uuid,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LocationEntity> for GpsFix {
    type Error = StoreError;

    fn try_from(entity: LocationEntity) -> Result<Self, Self::Error> {
        let device_id = DeviceIdentifier::parse(&entity.device_id)
            .map_err(|e| StoreError::Backend(format!("corrupt locations row {}: {}", entity.id, e)))?;

        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            device_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            altitude: entity.altitude,
            speed: entity.speed,
            heading: entity.heading,
            accuracy: entity.accuracy,
            timestamp: entity.timestamp,
            created_at: entity.created_at,
        })
    }
}
