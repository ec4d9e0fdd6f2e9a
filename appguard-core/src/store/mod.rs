//! Device Store
//!
//! Persistence of device records lives outside this crate. Verifiers talk to
//! it through [`DeviceStore`]; every method is a single-record
//! read-modify-write that the backend must apply atomically, which is what
//! serializes concurrent attestation/assertion attempts against one device.
//!
//! [`InMemoryDeviceStore`] is the reference backend used by the server in
//! development and by the tests.

mod memory;

pub use memory::InMemoryDeviceStore;

use async_trait::async_trait;

use crate::device::Device;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Public key already bound for device {0}")]
    KeyAlreadyBound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Create a device record owned by `user_uuid` in the `Unregistered` state.
    async fn create_device(&self, user_uuid: &str) -> StoreResult<Device>;

    async fn get_device(&self, device_uuid: &str) -> StoreResult<Option<Device>>;

    /// Overwrite the outstanding challenge.
    async fn update_challenge(&self, device_uuid: &str, challenge: &str) -> StoreResult<()>;

    /// Bind the attested key and install `next_challenge` in the same record
    /// update. Fails with [`StoreError::KeyAlreadyBound`] if a key is already
    /// set, leaving the record untouched.
    async fn set_key_info(
        &self,
        device_uuid: &str,
        key_id: &str,
        public_key_pem: &str,
        next_challenge: &str,
    ) -> StoreResult<()>;

    /// Clear the challenge if it still equals `expected`. Returns `false`
    /// when it was already consumed or replaced.
    async fn consume_challenge(&self, device_uuid: &str, expected: &str) -> StoreResult<bool>;

    async fn get_user_for_device(&self, device_uuid: &str) -> StoreResult<Option<String>>;

    /// Move an asserted device to `SessionActive`. Returns `false` if the
    /// device has not yet completed an assertion.
    async fn activate_session(&self, device_uuid: &str) -> StoreResult<bool>;
}
