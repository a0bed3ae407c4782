//! Recording hub for flow tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use onewire_flow::{DeviceDescription, HubError, HubResult, OneWireHub};

/// Hub whose answers are set by the test; every call is recorded
#[derive(Default)]
pub struct MockHub {
    reachable: AtomicBool,
    valid_path: AtomicBool,
    devices: Vec<DeviceDescription>,
    calls: Mutex<Vec<String>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reachable(self) -> Self {
        self.reachable.store(true, Ordering::SeqCst);
        self
    }

    pub fn valid_path(self) -> Self {
        self.valid_path.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_device(mut self, id: &str, device_type: &str) -> Self {
        self.devices.push(DeviceDescription::new(id, device_type));
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl OneWireHub for MockHub {
    async fn connect(&self, host: &str, port: u16) -> HubResult<()> {
        self.record(format!("connect {}:{}", host, port));
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HubError::CannotConnect {
                host: host.to_string(),
                port,
                reason: "connection refused".to_string(),
            })
        }
    }

    async fn check_mount_dir(&self, path: &str) -> HubResult<()> {
        self.record(format!("check_mount_dir {}", path));
        if self.valid_path.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HubError::InvalidPath {
                path: path.to_string(),
                reason: "no such directory".to_string(),
            })
        }
    }

    async fn devices(&self) -> Vec<DeviceDescription> {
        self.devices.clone()
    }
}
