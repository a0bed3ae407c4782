//! 1-Wire wizard
//!
//! Terminal host for the 1-Wire setup and options flows. Config entries and
//! the device registry live under `<config_dir>/.storage/`.

mod cli;
mod prompt;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use onewire_config::WizardSettings;
use onewire_config_entries::ConfigEntries;
use onewire_flow::constants::{manufacturer_for_family, DOMAIN};
use onewire_flow::{
    ConfigFlowHandler, DeviceDescription, FlowManager, FlowResult, FlowResultType, Hub,
    HubFactory, OneWireHub,
};
use onewire_registries::{DeviceIdentifier, DeviceRegistry, Storage};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::prompt::Prompt;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut settings = WizardSettings::load(&args.settings)
        .with_context(|| format!("Failed to load settings from {:?}", args.settings))?;
    if let Some(config_dir) = args.config_dir {
        settings.config_dir = config_dir;
    }

    // Initialize tracing; RUST_LOG wins over the settings file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let storage = Arc::new(Storage::new(&settings.config_dir));
    let entries = Arc::new(ConfigEntries::new(Arc::clone(&storage)));
    entries.load().await.context("Failed to load config entries")?;
    let registry = Arc::new(DeviceRegistry::new(storage));
    registry.load().await.context("Failed to load device registry")?;

    info!(
        "Loaded {} config entries and {} devices from {:?}",
        entries.len(),
        registry.len(),
        settings.config_dir
    );

    let timeout = settings.connect_timeout();
    let hub_factory: HubFactory =
        Arc::new(move || Arc::new(Hub::new(timeout)) as Arc<dyn OneWireHub>);
    let manager = FlowManager::new(
        Arc::clone(&entries),
        Some(Arc::clone(&registry)),
        hub_factory,
    );

    match args.command {
        Command::Setup => {
            let started = manager.start_flow(DOMAIN).await?;
            let finished = Prompt::new().run(&manager, started).await?;
            report(&finished);
        }
        Command::Options { entry_id } => {
            let devices = registry_devices(&registry, &entry_id);
            if devices.is_empty() {
                warn!("No devices recorded for {}; use add-device first", entry_id);
            }
            manager
                .register_hub(&entry_id, Arc::new(Hub::with_devices(timeout, devices)))
                .await;

            let started = manager.start_options_flow(&entry_id).await?;
            let finished = Prompt::new().run(&manager, started).await?;
            report(&finished);
        }
        Command::List => {
            for entry in entries.get_by_domain(DOMAIN) {
                println!(
                    "{}  {}  {}",
                    entry.entry_id,
                    entry.title,
                    serde_json::Value::Object(entry.data)
                );
                if !entry.options.is_empty() {
                    println!("    options: {}", serde_json::Value::Object(entry.options));
                }
            }
        }
        Command::AddDevice {
            entry_id,
            device_id,
            device_type,
            name,
        } => {
            if entries.get(&entry_id).is_none() {
                bail!("Config entry {} not found", entry_id);
            }

            let description = DeviceDescription::new(&device_id, device_type);
            let device = registry.get_or_create(
                &[DeviceIdentifier::new(DOMAIN, &device_id)],
                Some(entry_id.as_str()),
                Some(device_id.as_str()),
            );
            registry.update(&device.id, |device| {
                device.model = Some(description.device_type.clone());
                device.manufacturer =
                    Some(manufacturer_for_family(&description.family).to_string());
                if name.is_some() {
                    device.name_by_user = name.clone();
                }
            });
            registry.save().await.context("Failed to save device registry")?;
            println!("Recorded {} on {}", device_id, entry_id);
        }
    }

    Ok(())
}

/// Devices recorded in the registry for one entry, as its hub would report them
fn registry_devices(registry: &DeviceRegistry, entry_id: &str) -> Vec<DeviceDescription> {
    registry
        .get_by_config_entry_id(entry_id)
        .iter()
        .filter_map(|device| {
            let id = device.identifier_for(DOMAIN)?;
            let device_type = device.model.clone().unwrap_or_default();
            Some(DeviceDescription::new(id, device_type))
        })
        .collect()
}

fn report(result: &FlowResult) {
    match result.result_type {
        FlowResultType::CreateEntry => {
            let title = result.title.as_deref().unwrap_or_default();
            if title.is_empty() {
                println!("Options saved");
            } else {
                println!("Created {}", title);
            }
        }
        FlowResultType::Abort => {
            println!("Aborted: {}", result.reason.as_deref().unwrap_or("unknown"));
        }
        FlowResultType::Form => {}
    }
}
