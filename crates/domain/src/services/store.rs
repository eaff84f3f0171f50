//! Storage collaborators used by the gateway.
//!
//! The Postgres repositories in the persistence crate and
//! [`InMemoryStore`](super::memory::InMemoryStore) both implement these.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AlertEvent, DeviceHealthUpdate, DeviceIdentifier, GpsFix, NewGpsFix, NewTrackerDevice,
    TrackerDevice,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Registered tracker devices.
#[async_trait::async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn find_by_device_id(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<TrackerDevice>, StoreError>;

    /// Like [`find_by_device_id`](Self::find_by_device_id) but ignores inactive devices.
    async fn find_active_by_device_id(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<TrackerDevice>, StoreError>;

    /// Applies a health patch. Last write wins.
    async fn patch_health(
        &self,
        device_id: &DeviceIdentifier,
        update: &DeviceHealthUpdate,
    ) -> Result<(), StoreError>;

    /// Registers a device. Fails with [`StoreError::Conflict`] when the id is taken.
    async fn create_device(&self, device: &NewTrackerDevice) -> Result<TrackerDevice, StoreError>;
}

/// Append-only store of GPS fixes.
#[async_trait::async_trait]
pub trait LocationStore: Send + Sync {
    async fn append_fix(
        &self,
        user_id: Uuid,
        device_id: &DeviceIdentifier,
        fix: &NewGpsFix,
    ) -> Result<GpsFix, StoreError>;

    async fn latest_for_device(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<GpsFix>, StoreError>;
}

/// Destination of derived alerts.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    /// Records the alert and returns its id.
    async fn create_alert(&self, event: &AlertEvent) -> Result<i64, StoreError>;
}

/// Marks device owners as recently active.
#[async_trait::async_trait]
pub trait SessionTracker: Send + Sync {
    async fn mark_active(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}
