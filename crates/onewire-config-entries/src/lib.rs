//! Config Entries
//!
//! A config entry is one configured 1-Wire hub. Entries are persisted in
//! `.storage/core.config_entries` and indexed by domain and unique id so
//! flows can refuse duplicates before touching the hardware.

pub mod entry;
pub mod manager;

pub use entry::{ConfigEntry, ConfigEntryUpdate};

pub use manager::{
    ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult, STORAGE_KEY,
    STORAGE_MINOR_VERSION, STORAGE_VERSION,
};
