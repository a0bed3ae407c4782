//! Shared test helpers for the flow scenarios

#![allow(dead_code)]

pub mod mock_hub;

use std::sync::Arc;

use onewire_config_entries::ConfigEntries;
use onewire_flow::{FlowManager, HubFactory, OneWireHub};
use onewire_registries::{DeviceRegistry, Storage};
use tempfile::TempDir;

pub use mock_hub::MockHub;

/// A flow manager over a throwaway config directory
pub struct TestSetup {
    pub temp_dir: TempDir,
    pub entries: Arc<ConfigEntries>,
    pub registry: Arc<DeviceRegistry>,
    pub hub: Arc<MockHub>,
    pub manager: FlowManager,
}

impl TestSetup {
    pub fn new(hub: MockHub) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(temp_dir.path()));
        let entries = Arc::new(ConfigEntries::new(Arc::clone(&storage)));
        let registry = Arc::new(DeviceRegistry::new(storage));
        let hub = Arc::new(hub);

        let factory_hub = Arc::clone(&hub);
        let factory: HubFactory =
            Arc::new(move || Arc::clone(&factory_hub) as Arc<dyn OneWireHub>);
        let manager = FlowManager::new(
            Arc::clone(&entries),
            Some(Arc::clone(&registry)),
            factory,
        );

        Self {
            temp_dir,
            entries,
            registry,
            hub,
            manager,
        }
    }

    /// Config entries as a fresh process would load them from disk
    pub async fn reload_entries(&self) -> ConfigEntries {
        let entries = ConfigEntries::new(Arc::new(Storage::new(self.temp_dir.path())));
        entries.load().await.unwrap();
        entries
    }
}
