//! Hub abstraction
//!
//! The hub owns the connection to a 1-Wire bus. The flows only need to know
//! whether a gateway is reachable, whether a sysfs directory is usable, and
//! which devices the bus currently reports.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::debug;

use crate::model::DeviceDescription;

/// Errors raised while validating a connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Cannot connect to {host}:{port}: {reason}")]
    CannotConnect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Invalid mount directory {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

pub type HubResult<T> = Result<T, HubError>;

/// Connection to a 1-Wire bus as seen by the flows
#[async_trait]
pub trait OneWireHub: Send + Sync {
    /// Verify an owserver gateway answers on `host:port`
    async fn connect(&self, host: &str, port: u16) -> HubResult<()>;

    /// Verify `path` is a usable w1 device directory
    async fn check_mount_dir(&self, path: &str) -> HubResult<()>;

    /// Snapshot of the devices currently reported by the bus
    async fn devices(&self) -> Vec<DeviceDescription>;
}

/// Hub backed by the local network stack and filesystem.
///
/// Device discovery is done elsewhere; discovered devices are handed over
/// with [`Hub::set_devices`].
pub struct Hub {
    connect_timeout: Duration,
    devices: RwLock<Vec<DeviceDescription>>,
}

impl Hub {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            devices: RwLock::new(Vec::new()),
        }
    }

    pub fn with_devices(connect_timeout: Duration, devices: Vec<DeviceDescription>) -> Self {
        Self {
            connect_timeout,
            devices: RwLock::new(devices),
        }
    }

    pub async fn set_devices(&self, devices: Vec<DeviceDescription>) {
        *self.devices.write().await = devices;
    }
}

#[async_trait]
impl OneWireHub for Hub {
    async fn connect(&self, host: &str, port: u16) -> HubResult<()> {
        let cannot_connect = |reason: String| HubError::CannotConnect {
            host: host.to_string(),
            port,
            reason,
        };

        match tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                debug!("owserver at {}:{} is reachable", host, port);
                Ok(())
            }
            Ok(Err(e)) => Err(cannot_connect(e.to_string())),
            Err(_) => Err(cannot_connect(format!(
                "no answer within {:?}",
                self.connect_timeout
            ))),
        }
    }

    async fn check_mount_dir(&self, path: &str) -> HubResult<()> {
        let invalid = |reason: String| HubError::InvalidPath {
            path: path.to_string(),
            reason,
        };

        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(invalid("not a directory".to_string())),
            Err(e) => Err(invalid(e.to_string())),
        }
    }

    async fn devices(&self) -> Vec<DeviceDescription> {
        self.devices.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    fn hub() -> Hub {
        Hub::new(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_connect_to_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert_eq!(hub().connect("127.0.0.1", port).await, Ok(()));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = hub().connect("127.0.0.1", port).await;
        assert!(matches!(result, Err(HubError::CannotConnect { port: p, .. }) if p == port));
    }

    #[tokio::test]
    async fn test_mount_dir_exists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_str().unwrap();

        assert_eq!(hub().check_mount_dir(path).await, Ok(()));
    }

    #[tokio::test]
    async fn test_mount_dir_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("w1_bus_master1");
        std::fs::write(&file, "").unwrap();

        let result = hub().check_mount_dir(file.to_str().unwrap()).await;
        assert!(matches!(result, Err(HubError::InvalidPath { .. })));
    }

    #[tokio::test]
    async fn test_mount_dir_missing() {
        let result = hub().check_mount_dir("/nonexistent/w1/devices/").await;
        assert!(matches!(result, Err(HubError::InvalidPath { path, .. }) if path == "/nonexistent/w1/devices/"));
    }

    #[tokio::test]
    async fn test_device_snapshot() {
        let hub = hub();
        assert!(hub.devices().await.is_empty());

        hub.set_devices(vec![DeviceDescription::new("28.111111111111", "DS18B20")])
            .await;
        assert_eq!(hub.devices().await.len(), 1);
    }
}
