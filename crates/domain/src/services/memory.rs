//! In-memory implementation of the storage collaborators.
//!
//! Used by tests and local tooling. All maps sit behind `tokio::sync::RwLock`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{AlertSink, DeviceRegistry, LocationStore, SessionTracker, StoreError};
use crate::models::{
    AlertEvent, DeviceHealthUpdate, DeviceIdentifier, GpsFix, NewGpsFix, NewTrackerDevice,
    TrackerDevice,
};

pub struct InMemoryStore {
    devices: Arc<RwLock<HashMap<DeviceIdentifier, TrackerDevice>>>,
    fixes: Arc<RwLock<Vec<GpsFix>>>,
    alerts: Arc<RwLock<Vec<(i64, AlertEvent)>>>,
    sessions: Arc<RwLock<HashMap<Uuid, DateTime<Utc>>>>,
    next_id: AtomicI64,
    fail_location_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            fixes: Arc::new(RwLock::new(Vec::new())),
            alerts: Arc::new(RwLock::new(Vec::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicI64::new(1),
            fail_location_writes: AtomicBool::new(false),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Registers an active device owned by `owner` and returns it.
    pub async fn insert_device(&self, device_id: DeviceIdentifier, owner: Uuid) -> TrackerDevice {
        let now = Utc::now();
        let device = TrackerDevice {
            id: self.next_id(),
            device_id,
            device_type: Default::default(),
            owner_user_id: owner,
            imei: None,
            phone_number: None,
            is_active: true,
            last_communication: None,
            battery_level: None,
            signal_strength: None,
            created_at: now,
            updated_at: now,
        };
        self.devices
            .write()
            .await
            .insert(device.device_id.clone(), device.clone());
        device
    }

    pub async fn set_active(&self, device_id: &DeviceIdentifier, active: bool) {
        if let Some(device) = self.devices.write().await.get_mut(device_id) {
            device.is_active = active;
        }
    }

    /// Makes subsequent `append_fix` calls fail with a backend error.
    pub fn fail_location_writes(&self, fail: bool) {
        self.fail_location_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn device(&self, device_id: &DeviceIdentifier) -> Option<TrackerDevice> {
        self.devices.read().await.get(device_id).cloned()
    }

    pub async fn fixes(&self) -> Vec<GpsFix> {
        self.fixes.read().await.clone()
    }

    pub async fn alerts(&self) -> Vec<AlertEvent> {
        self.alerts
            .read()
            .await
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn last_active(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.sessions.read().await.get(&user_id).copied()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryStore {
    async fn find_by_device_id(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<TrackerDevice>, StoreError> {
        Ok(self.devices.read().await.get(device_id).cloned())
    }

    async fn find_active_by_device_id(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<TrackerDevice>, StoreError> {
        Ok(self
            .devices
            .read()
            .await
            .get(device_id)
            .filter(|d| d.is_active)
            .cloned())
    }

    async fn patch_health(
        &self,
        device_id: &DeviceIdentifier,
        update: &DeviceHealthUpdate,
    ) -> Result<(), StoreError> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| StoreError::NotFound(format!("device {}", device_id)))?;

        device.is_active = true;
        device.last_communication = Some(update.last_communication);
        if let Some(level) = update.battery_level {
            device.battery_level = Some(level);
        }
        if let Some(level) = update.signal_strength {
            device.signal_strength = Some(level);
        }
        device.updated_at = Utc::now();
        Ok(())
    }

    async fn create_device(&self, new: &NewTrackerDevice) -> Result<TrackerDevice, StoreError> {
        let mut devices = self.devices.write().await;
        if devices.contains_key(&new.device_id) {
            return Err(StoreError::Conflict(format!(
                "Device {} already exists",
                new.device_id
            )));
        }

        let now = Utc::now();
        let device = TrackerDevice {
            id: self.next_id(),
            device_id: new.device_id.clone(),
            device_type: new.device_type,
            owner_user_id: new.owner_user_id,
            imei: new.imei.clone(),
            phone_number: new.phone_number.clone(),
            is_active: true,
            last_communication: None,
            battery_level: None,
            signal_strength: None,
            created_at: now,
            updated_at: now,
        };
        devices.insert(device.device_id.clone(), device.clone());
        Ok(device)
    }
}

#[async_trait]
impl LocationStore for InMemoryStore {
    async fn append_fix(
        &self,
        user_id: Uuid,
        device_id: &DeviceIdentifier,
        fix: &NewGpsFix,
    ) -> Result<GpsFix, StoreError> {
        if self.fail_location_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("location store unavailable".to_string()));
        }

        let stored = GpsFix {
            id: self.next_id(),
            user_id,
            device_id: device_id.clone(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            altitude: fix.altitude,
            speed: fix.speed,
            heading: fix.heading,
            accuracy: fix.accuracy,
            timestamp: fix.timestamp,
            created_at: Utc::now(),
        };
        self.fixes.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn latest_for_device(
        &self,
        device_id: &DeviceIdentifier,
    ) -> Result<Option<GpsFix>, StoreError> {
        // Insertion order breaks timestamp ties.
        Ok(self
            .fixes
            .read()
            .await
            .iter()
            .filter(|f| &f.device_id == device_id)
            .fold(None::<&GpsFix>, |best, f| match best {
                Some(b) if b.timestamp > f.timestamp => Some(b),
                _ => Some(f),
            })
            .cloned())
    }
}

#[async_trait]
impl AlertSink for InMemoryStore {
    async fn create_alert(&self, event: &AlertEvent) -> Result<i64, StoreError> {
        let id = self.next_id();
        self.alerts.write().await.push((id, event.clone()));
        Ok(id)
    }
}

#[async_trait]
impl SessionTracker for InMemoryStore {
    async fn mark_active(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.sessions.write().await.insert(user_id, at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceType;

    fn id(s: &str) -> DeviceIdentifier {
        DeviceIdentifier::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_device_conflict() {
        let store = InMemoryStore::new();
        let new = NewTrackerDevice {
            device_id: id("000019246001"),
            device_type: DeviceType::GpsTracker,
            owner_user_id: Uuid::new_v4(),
            imei: None,
            phone_number: None,
        };

        let created = store.create_device(&new).await.unwrap();
        assert!(created.is_active);

        let err = store.create_device(&new).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_active_ignores_inactive() {
        let store = InMemoryStore::new();
        let device = store.insert_device(id("000019246001"), Uuid::new_v4()).await;
        store.set_active(&device.device_id, false).await;

        assert!(store
            .find_active_by_device_id(&device.device_id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_by_device_id(&device.device_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_patch_health_keeps_unset_fields() {
        let store = InMemoryStore::new();
        let device = store.insert_device(id("000019246001"), Uuid::new_v4()).await;
        let now = Utc::now();

        store
            .patch_health(
                &device.device_id,
                &DeviceHealthUpdate {
                    last_communication: now,
                    battery_level: Some(80),
                    signal_strength: Some(4),
                },
            )
            .await
            .unwrap();
        store
            .patch_health(&device.device_id, &DeviceHealthUpdate::seen_at(now))
            .await
            .unwrap();

        let patched = store.device(&device.device_id).await.unwrap();
        assert_eq!(patched.battery_level, Some(80));
        assert_eq!(patched.signal_strength, Some(4));
        assert_eq!(patched.last_communication, Some(now));
    }

    #[tokio::test]
    async fn test_latest_for_device() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let device = id("000019246001");
        let earlier = Utc::now() - chrono::Duration::minutes(5);

        for (lat, ts) in [(1.0, earlier), (2.0, Utc::now())] {
            let fix = NewGpsFix {
                latitude: lat,
                longitude: 0.0,
                altitude: 0.0,
                speed: 0.0,
                heading: 0.0,
                accuracy: 10.0,
                timestamp: ts,
            };
            store.append_fix(user, &device, &fix).await.unwrap();
        }

        let latest = store.latest_for_device(&device).await.unwrap().unwrap();
        assert_eq!(latest.latitude, 2.0);
        assert!(store
            .latest_for_device(&id("999999999999"))
            .await
            .unwrap()
            .is_none());
    }
}
