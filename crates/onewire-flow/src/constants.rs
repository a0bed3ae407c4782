//! Constants for the 1-Wire integration

pub const DOMAIN: &str = "onewire";

pub const CONF_TYPE: &str = "type";
pub const CONF_HOST: &str = "host";
pub const CONF_PORT: &str = "port";
pub const CONF_MOUNT_DIR: &str = "mount_dir";

pub const CONF_TYPE_OWSERVER: &str = "OWServer";
pub const CONF_TYPE_SYSBUS: &str = "SysBus";

pub const DEFAULT_OWSERVER_HOST: &str = "localhost";
pub const DEFAULT_OWSERVER_PORT: u16 = 4304;
pub const DEFAULT_SYSBUS_MOUNT_DIR: &str = "/sys/bus/w1/devices/";

/// Family codes the OWServer transport can expose, with the sub-types
/// required for families that are shared by several products.
pub const DEVICE_SUPPORT_OWSERVER: &[(&str, &[&str])] = &[
    ("05", &[]),
    ("10", &[]),
    ("12", &[]),
    ("1D", &[]),
    ("1F", &[]),
    ("22", &[]),
    ("26", &[]),
    ("28", &[]),
    ("29", &[]),
    ("30", &[]),
    ("3A", &[]),
    ("3B", &[]),
    ("42", &[]),
    ("7E", &["EDS0066", "EDS0068"]),
    ("EF", &["HB_HUB", "HB_MOISTURE_METER", "HobbyBoards_EF"]),
];
pub const DEVICE_SUPPORT_SYSBUS: &[&str] = &["10", "22", "28", "3B", "42"];

/// Hardware type whose precision can be configured
pub const DEVICE_TYPE_DS18B20: &str = "DS18B20";

pub const OPTION_CLEAR_DEVICE_CONFIG: &str = "clear_device_config";
pub const OPTION_DEVICE_SELECTION: &str = "ds18b20_device_selection";
pub const OPTION_SENSOR_PRECISION: &str = "sensor_precision";

pub const MANUFACTURER_MAXIM: &str = "Maxim Integrated";
pub const MANUFACTURER_HOBBYBOARDS: &str = "Hobby Boards";
pub const MANUFACTURER_EDS: &str = "Embedded Data Systems";

/// Whether `family` is served by the OWServer transport
pub fn owserver_supports(family: &str) -> bool {
    DEVICE_SUPPORT_OWSERVER.iter().any(|(f, _)| *f == family)
}

/// Whether `family` is served by the SysBus transport
pub fn sysbus_supports(family: &str) -> bool {
    DEVICE_SUPPORT_SYSBUS.contains(&family)
}

/// Manufacturer shown for a device family
pub fn manufacturer_for_family(family: &str) -> &'static str {
    match family {
        "7E" => MANUFACTURER_EDS,
        "EF" => MANUFACTURER_HOBBYBOARDS,
        _ => MANUFACTURER_MAXIM,
    }
}
