//! Flow manager errors

use onewire_config_entries::ConfigEntriesError;
use thiserror::Error;

pub type FlowManagerResult<T> = Result<T, FlowError>;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow {0} not found")]
    UnknownFlow(String),

    #[error("No config flow for handler {0}")]
    UnknownHandler(String),

    #[error("Config entry {0} not found")]
    UnknownEntry(String),

    #[error("No hub registered for config entry {0}")]
    HubNotLoaded(String),

    #[error(transparent)]
    ConfigEntries(#[from] ConfigEntriesError),
}
