//! Device labels
//!
//! Devices are presented as `"<name given by user> (<id>)"`, or as the bare
//! id when the user never renamed them. Submitted labels are mapped back to
//! ids before anything is stored.

use std::sync::Arc;

use onewire_registries::DeviceRegistry;
use tracing::error;

use crate::constants::DOMAIN;

/// Source of user-assigned device names
pub trait DeviceNameLookup: Send + Sync {
    fn name_by_user(&self, device_id: &str) -> Option<String>;
}

impl DeviceNameLookup for DeviceRegistry {
    fn name_by_user(&self, device_id: &str) -> Option<String> {
        self.get_by_identifier(DOMAIN, device_id)
            .and_then(|device| device.name_by_user.clone())
    }
}

/// Build the label shown for a device
pub fn label_from_id(device_id: &str, name_by_user: Option<&str>) -> String {
    match name_by_user {
        Some(name) if !name.is_empty() => format!("{} ({})", name, device_id),
        _ => device_id.to_string(),
    }
}

/// Recover the id from a label.
///
/// A label without `(` is a bare id. Otherwise the id is what follows the
/// first `(`, minus the closing `)`.
pub fn id_from_label(label: &str) -> &str {
    match label.split_once('(') {
        Some((_, rest)) => rest.strip_suffix(')').unwrap_or(rest),
        None => label,
    }
}

/// Labels for the devices of one options session
#[derive(Clone)]
pub struct DeviceLabeler {
    names: Option<Arc<dyn DeviceNameLookup>>,
}

impl DeviceLabeler {
    /// A labeler without a registry falls back to bare ids
    pub fn new(names: Option<Arc<dyn DeviceNameLookup>>) -> Self {
        if names.is_none() {
            error!("No device registry available to the 1-Wire options flow, showing raw ids");
        }
        Self { names }
    }

    pub fn label(&self, device_id: &str) -> String {
        let name = self
            .names
            .as_ref()
            .and_then(|names| names.name_by_user(device_id));
        label_from_id(device_id, name.as_deref())
    }

    /// Map a submitted label back to one of `device_ids`.
    ///
    /// Exact label matches win so names containing parentheses still
    /// resolve; anything else goes through [`id_from_label`].
    pub fn resolve(&self, label: &str, device_ids: &[String]) -> String {
        device_ids
            .iter()
            .find(|id| self.label(id) == label)
            .cloned()
            .unwrap_or_else(|| id_from_label(label).to_string())
    }
}

impl std::fmt::Debug for DeviceLabeler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLabeler")
            .field("has_registry", &self.names.is_some())
            .finish()
    }
}
