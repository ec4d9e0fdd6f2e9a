//! In-memory device storage
//!
//! Records are lost on restart. `DashMap` entry locks give each mutation the
//! per-record atomicity the verifiers rely on.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{DeviceStore, StoreError, StoreResult};
use crate::device::{Device, TransitionError};

/// Thread-safe in-memory device storage
#[derive(Default)]
pub struct InMemoryDeviceStore {
    devices: DashMap<String, Device>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered devices
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn create_device(&self, user_uuid: &str) -> StoreResult<Device> {
        let device = Device::new(uuid::Uuid::new_v4().to_string(), user_uuid.to_string());
        self.devices.insert(device.uuid.clone(), device.clone());
        Ok(device)
    }

    async fn get_device(&self, device_uuid: &str) -> StoreResult<Option<Device>> {
        Ok(self.devices.get(device_uuid).map(|entry| entry.value().clone()))
    }

    async fn update_challenge(&self, device_uuid: &str, challenge: &str) -> StoreResult<()> {
        let mut entry = self
            .devices
            .get_mut(device_uuid)
            .ok_or_else(|| StoreError::NotFound(device_uuid.to_string()))?;
        entry.issue_challenge(challenge.to_string());
        Ok(())
    }

    async fn set_key_info(
        &self,
        device_uuid: &str,
        key_id: &str,
        public_key_pem: &str,
        next_challenge: &str,
    ) -> StoreResult<()> {
        let mut entry = self
            .devices
            .get_mut(device_uuid)
            .ok_or_else(|| StoreError::NotFound(device_uuid.to_string()))?;
        entry
            .bind_key(key_id.to_string(), public_key_pem.to_string())
            .map_err(|_| StoreError::KeyAlreadyBound(device_uuid.to_string()))?;
        entry.issue_challenge(next_challenge.to_string());
        Ok(())
    }

    async fn consume_challenge(&self, device_uuid: &str, expected: &str) -> StoreResult<bool> {
        let mut entry = self
            .devices
            .get_mut(device_uuid)
            .ok_or_else(|| StoreError::NotFound(device_uuid.to_string()))?;
        Ok(entry.consume_challenge(expected).is_ok())
    }

    async fn get_user_for_device(&self, device_uuid: &str) -> StoreResult<Option<String>> {
        Ok(self
            .devices
            .get(device_uuid)
            .map(|entry| entry.user_uuid.clone()))
    }

    async fn activate_session(&self, device_uuid: &str) -> StoreResult<bool> {
        let mut entry = self
            .devices
            .get_mut(device_uuid)
            .ok_or_else(|| StoreError::NotFound(device_uuid.to_string()))?;
        match entry.activate_session() {
            Ok(()) => Ok(true),
            Err(TransitionError::NotAsserted) | Err(TransitionError::KeyNotBound) => Ok(false),
            Err(other) => Err(StoreError::Backend(format!(
                "unexpected transition failure: {other:?}"
            ))),
        }
    }
}

impl std::fmt::Debug for InMemoryDeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDeviceStore")
            .field("devices", &self.devices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceState;

    #[tokio::test]
    async fn test_create_and_get_device() {
        let store = InMemoryDeviceStore::new();
        let device = store.create_device("user-1").await.unwrap();

        let loaded = store.get_device(&device.uuid).await.unwrap().unwrap();
        assert_eq!(loaded.user_uuid, "user-1");
        assert_eq!(loaded.state, DeviceState::Unregistered);
        assert_eq!(store.device_count(), 1);
        assert_eq!(
            store.get_user_for_device(&device.uuid).await.unwrap(),
            Some("user-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_device() {
        let store = InMemoryDeviceStore::new();
        assert!(store.get_device("nope").await.unwrap().is_none());
        assert!(matches!(
            store.update_challenge("nope", "c0").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.set_key_info("nope", "k", "pem", "c1").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_key_info_set_once() {
        let store = InMemoryDeviceStore::new();
        let device = store.create_device("user-1").await.unwrap();

        store
            .set_key_info(&device.uuid, "k1", "pem-1", "c1")
            .await
            .unwrap();
        let err = store
            .set_key_info(&device.uuid, "k2", "pem-2", "c2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::KeyAlreadyBound(_)));

        // The rejected bind must not install its challenge either
        let loaded = store.get_device(&device.uuid).await.unwrap().unwrap();
        assert_eq!(loaded.key_id(), Some("k1"));
        assert_eq!(loaded.challenge.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_key_binding_installs_next_challenge() {
        let store = InMemoryDeviceStore::new();
        let device = store.create_device("user-1").await.unwrap();
        store.update_challenge(&device.uuid, "c0").await.unwrap();

        store
            .set_key_info(&device.uuid, "k1", "pem-1", "c1")
            .await
            .unwrap();

        let loaded = store.get_device(&device.uuid).await.unwrap().unwrap();
        assert_eq!(loaded.state, DeviceState::Attested);
        assert_eq!(loaded.challenge.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_concurrent_consume_has_single_winner() {
        let store = std::sync::Arc::new(InMemoryDeviceStore::new());
        let device = store.create_device("user-1").await.unwrap();
        store
            .set_key_info(&device.uuid, "k1", "pem", "c1")
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let uuid = device.uuid.clone();
            handles.push(tokio::spawn(async move {
                store.consume_challenge(&uuid, "c1").await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
