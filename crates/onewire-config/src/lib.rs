//! Settings for the 1-Wire wizard host
//!
//! # Example
//!
//! ```ignore
//! use onewire_config::WizardSettings;
//!
//! let settings = WizardSettings::load("settings.yaml")?;
//! let timeout = settings.connect_timeout();
//! ```

mod error;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::WizardSettings;
