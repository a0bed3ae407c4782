//! 1-Wire Registries
//!
//! Persistent device registry plus the `.storage/` JSON layer shared with
//! the config entry store.

pub mod device_registry;
pub mod storage;

pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};

pub use device_registry::{DeviceEntry, DeviceIdentifier, DeviceRegistry, DeviceRegistryData};
