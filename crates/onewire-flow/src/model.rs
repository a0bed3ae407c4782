//! Data model shared by the setup and options flows

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::constants::{
    CONF_HOST, CONF_MOUNT_DIR, CONF_PORT, CONF_TYPE, CONF_TYPE_OWSERVER, CONF_TYPE_SYSBUS,
    DEFAULT_OWSERVER_HOST, DEFAULT_OWSERVER_PORT, DEFAULT_SYSBUS_MOUNT_DIR, DEVICE_TYPE_DS18B20,
};

/// How the integration reaches the 1-Wire bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportChoice {
    /// Network gateway service (owserver)
    #[serde(rename = "OWServer")]
    OwServer,
    /// Kernel w1 bus exposed under sysfs
    #[serde(rename = "SysBus")]
    SysBus,
}

impl TransportChoice {
    pub const ALL: [TransportChoice; 2] = [TransportChoice::OwServer, TransportChoice::SysBus];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportChoice::OwServer => CONF_TYPE_OWSERVER,
            TransportChoice::SysBus => CONF_TYPE_SYSBUS,
        }
    }
}

impl fmt::Display for TransportChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters for an owserver gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OWSERVER_HOST.to_string(),
            port: DEFAULT_OWSERVER_PORT,
        }
    }
}

/// Location of the sysfs w1 device directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemConfig {
    pub mount_dir: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            mount_dir: DEFAULT_SYSBUS_MOUNT_DIR.to_string(),
        }
    }
}

/// Finished connection record produced by the setup flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    OwServer(GatewayConfig),
    SysBus(FilesystemConfig),
}

impl ConnectionConfig {
    pub fn transport(&self) -> TransportChoice {
        match self {
            ConnectionConfig::OwServer(_) => TransportChoice::OwServer,
            ConnectionConfig::SysBus(_) => TransportChoice::SysBus,
        }
    }

    /// Entry title: the host for a gateway, the directory for sysfs
    pub fn title(&self) -> &str {
        match self {
            ConnectionConfig::OwServer(gateway) => &gateway.host,
            ConnectionConfig::SysBus(filesystem) => &filesystem.mount_dir,
        }
    }

    /// Identity used to refuse a second sysfs entry for the same directory.
    /// Gateways are deduplicated on their data instead.
    pub fn unique_id(&self) -> Option<String> {
        match self {
            ConnectionConfig::OwServer(_) => None,
            ConnectionConfig::SysBus(filesystem) => {
                Some(format!("{}:{}", CONF_TYPE_SYSBUS, filesystem.mount_dir))
            }
        }
    }

    /// Flat data record stored on the config entry
    pub fn to_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(CONF_TYPE.to_string(), json!(self.transport().as_str()));
        match self {
            ConnectionConfig::OwServer(gateway) => {
                data.insert(CONF_HOST.to_string(), json!(gateway.host));
                data.insert(CONF_PORT.to_string(), json!(gateway.port));
            }
            ConnectionConfig::SysBus(filesystem) => {
                data.insert(CONF_MOUNT_DIR.to_string(), json!(filesystem.mount_dir));
            }
        }
        data
    }
}

/// A device as reported by a hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    /// Bus id, e.g. `28.111111111111`
    pub id: String,
    /// Family code, e.g. `28`
    pub family: String,
    /// Hardware type, e.g. `DS18B20`
    pub device_type: String,
}

impl DeviceDescription {
    /// Build a description, deriving the family from the id prefix
    pub fn new(id: impl Into<String>, device_type: impl Into<String>) -> Self {
        let id = id.into();
        let family = id
            .split(|c: char| c == '.' || c == '-')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        Self {
            id,
            family,
            device_type: device_type.into(),
        }
    }

    pub fn is_ds18b20(&self) -> bool {
        self.device_type == DEVICE_TYPE_DS18B20
    }
}

/// DS18B20 resolution as offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrecisionLabel {
    #[default]
    #[serde(rename = "Default")]
    Default,
    #[serde(rename = "9 Bits")]
    Bits9,
    #[serde(rename = "10 Bits")]
    Bits10,
    #[serde(rename = "11 Bits")]
    Bits11,
    #[serde(rename = "12 Bits")]
    Bits12,
}

impl PrecisionLabel {
    pub const ALL: [PrecisionLabel; 5] = [
        PrecisionLabel::Default,
        PrecisionLabel::Bits9,
        PrecisionLabel::Bits10,
        PrecisionLabel::Bits11,
        PrecisionLabel::Bits12,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrecisionLabel::Default => "Default",
            PrecisionLabel::Bits9 => "9 Bits",
            PrecisionLabel::Bits10 => "10 Bits",
            PrecisionLabel::Bits11 => "11 Bits",
            PrecisionLabel::Bits12 => "12 Bits",
        }
    }

    /// owfs property read for this precision
    pub fn read_mode(&self) -> &'static str {
        match self {
            PrecisionLabel::Default => "temperature",
            PrecisionLabel::Bits9 => "temperature9",
            PrecisionLabel::Bits10 => "temperature10",
            PrecisionLabel::Bits11 => "temperature11",
            PrecisionLabel::Bits12 => "temperature12",
        }
    }
}

impl fmt::Display for PrecisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrecisionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown precision '{}'", s))
    }
}

/// Options stored on a config entry.
///
/// Default values are not serialized, so a cleared record is stored as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsRecord {
    /// Request to wipe the options; never stored as `true`
    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_device_config: bool,

    /// Selected DS18B20 ids in selection order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ds18b20_device_selection: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sensor_precision: BTreeMap<String, PrecisionLabel>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl OptionsRecord {
    /// Read options from a config entry; unreadable options start empty
    pub fn from_options(options: &Map<String, Value>) -> Self {
        match serde_json::from_value(Value::Object(options.clone())) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unreadable 1-Wire options: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_options(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Stored precision for a device, `Default` if none
    pub fn precision_for(&self, device_id: &str) -> PrecisionLabel {
        self.sensor_precision
            .get(device_id)
            .copied()
            .unwrap_or_default()
    }
}
