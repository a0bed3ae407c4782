//! Command-line argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[clap(name = "onewire-wizard", version)]
#[clap(about = "Set up 1-Wire hubs and configure their DS18B20 sensors")]
pub struct CliArgs {
    /// YAML settings file
    #[clap(long, default_value = "onewire.yaml")]
    pub settings: PathBuf,

    /// Directory holding `.storage/`, overrides the settings file
    #[clap(long)]
    pub config_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a hub through the setup flow
    Setup,

    /// Edit the sensor options of a configured hub
    Options {
        /// Config entry id, as printed by `list`
        entry_id: String,
    },

    /// Print the configured hubs
    List,

    /// Record a device seen on a hub's bus
    AddDevice {
        entry_id: String,
        /// Bus id, e.g. 28.111111111111
        device_id: String,
        /// Hardware type, e.g. DS18B20
        #[clap(long, default_value = "DS18B20")]
        device_type: String,
        /// Name shown instead of the bare id
        #[clap(long)]
        name: Option<String>,
    },
}
