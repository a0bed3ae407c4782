//! Flow manager
//!
//! Keeps the active setup and options flows, hands each submission to the
//! right flow, and writes finished flows into the config entry store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use onewire_config_entries::{ConfigEntries, ConfigEntriesError, ConfigEntry, ConfigEntryUpdate};
use onewire_registries::DeviceRegistry;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::constants::DOMAIN;
use crate::error::{FlowError, FlowManagerResult};
use crate::flow_result::{ConfigFlowHandler, FlowResult, StepResult};
use crate::hub::OneWireHub;
use crate::model::OptionsRecord;
use crate::naming::{DeviceLabeler, DeviceNameLookup};
use crate::options_flow::{
    OptionsFlow, OptionsState, STEP_CONFIGURE_DEVICE, STEP_DEVICE_SELECTION, STEP_INIT,
};
use crate::setup_flow::{
    SetupContext, SetupFlow, SetupState, ABORT_ALREADY_CONFIGURED, STEP_MOUNT_DIR, STEP_OWSERVER,
    STEP_USER,
};

/// Creates the hub a new setup flow validates against
pub type HubFactory = Arc<dyn Fn() -> Arc<dyn OneWireHub> + Send + Sync>;

#[derive(Clone)]
enum FlowKind {
    Setup {
        flow: SetupFlow,
        hub: Arc<dyn OneWireHub>,
    },
    Options {
        entry_id: String,
        flow: OptionsFlow,
    },
}

/// Active flow state
#[derive(Clone)]
struct ActiveFlow {
    /// Integration domain, or the entry id for options flows
    handler: String,
    kind: FlowKind,
}

impl ActiveFlow {
    fn step_id(&self) -> &'static str {
        match &self.kind {
            FlowKind::Setup { flow, .. } => match flow.state() {
                SetupState::User | SetupState::Finished => STEP_USER,
                SetupState::Owserver => STEP_OWSERVER,
                SetupState::MountDir => STEP_MOUNT_DIR,
            },
            FlowKind::Options { flow, .. } => match flow.state() {
                OptionsState::Init | OptionsState::Finished => STEP_INIT,
                OptionsState::DeviceSelection => STEP_DEVICE_SELECTION,
                OptionsState::DeviceConfig { .. } => STEP_CONFIGURE_DEVICE,
            },
        }
    }

    fn source(&self) -> &'static str {
        match self.kind {
            FlowKind::Setup { .. } => "user",
            FlowKind::Options { .. } => "options",
        }
    }
}

/// Manages active configuration flows
pub struct FlowManager {
    entries: Arc<ConfigEntries>,
    registry: Option<Arc<DeviceRegistry>>,
    hub_factory: HubFactory,
    /// Hubs of configured entries: entry_id -> hub
    hubs: RwLock<HashMap<String, Arc<dyn OneWireHub>>>,
    /// Active flows: flow_id -> flow state
    flows: RwLock<HashMap<String, ActiveFlow>>,
}

impl FlowManager {
    pub fn new(
        entries: Arc<ConfigEntries>,
        registry: Option<Arc<DeviceRegistry>>,
        hub_factory: HubFactory,
    ) -> Self {
        Self {
            entries,
            registry,
            hub_factory,
            hubs: RwLock::new(HashMap::new()),
            flows: RwLock::new(HashMap::new()),
        }
    }

    pub fn entries(&self) -> &Arc<ConfigEntries> {
        &self.entries
    }

    /// Attach the hub serving a configured entry
    pub async fn register_hub(&self, entry_id: &str, hub: Arc<dyn OneWireHub>) {
        self.hubs.write().await.insert(entry_id.to_string(), hub);
    }

    pub async fn hub(&self, entry_id: &str) -> Option<Arc<dyn OneWireHub>> {
        self.hubs.read().await.get(entry_id).cloned()
    }

    /// Start an options flow for a configured entry
    pub async fn start_options_flow(&self, entry_id: &str) -> FlowManagerResult<FlowResult> {
        let entry = self
            .entries
            .get(entry_id)
            .ok_or_else(|| FlowError::UnknownEntry(entry_id.to_string()))?;
        let hub = self
            .hub(entry_id)
            .await
            .ok_or_else(|| FlowError::HubNotLoaded(entry_id.to_string()))?;

        let flow_id = new_flow_id();
        info!(
            "Starting options flow for {} ({}) with flow_id {}",
            entry.title, entry_id, flow_id
        );

        let names = self
            .registry
            .clone()
            .map(|registry| registry as Arc<dyn DeviceNameLookup>);
        let record = OptionsRecord::from_options(&entry.options);
        let mut flow = OptionsFlow::new(hub.as_ref(), record, DeviceLabeler::new(names)).await;
        let step = flow.step(None);

        let active = ActiveFlow {
            handler: entry_id.to_string(),
            kind: FlowKind::Options {
                entry_id: entry_id.to_string(),
                flow,
            },
        };
        Ok(self.finish_step(&flow_id, active, step).await)
    }

    /// Store a still-running flow, or log the end of a finished one
    async fn finish_step(&self, flow_id: &str, active: ActiveFlow, step: StepResult) -> FlowResult {
        let result = FlowResult::from_step(flow_id, &active.handler, step);
        if result.step_id.is_some() {
            self.flows.write().await.insert(flow_id.to_string(), active);
        } else {
            info!(
                "Flow {} completed with result type: {:?}",
                flow_id, result.result_type
            );
        }
        result
    }

    /// Persist what a finished flow produced
    async fn commit(&self, kind: &FlowKind, step: StepResult) -> FlowManagerResult<StepResult> {
        let (title, data, unique_id) = match step {
            StepResult::CreateEntry {
                title,
                data,
                unique_id,
            } => (title, data, unique_id),
            other => return Ok(other),
        };

        match kind {
            FlowKind::Setup { hub, .. } => {
                let mut entry = ConfigEntry::new(DOMAIN, title.clone()).with_data(data.clone());
                if let Some(unique_id) = &unique_id {
                    entry = entry.with_unique_id(unique_id.clone());
                }

                match self.entries.add(entry).await {
                    Ok(entry) => self.register_hub(&entry.entry_id, Arc::clone(hub)).await,
                    Err(ConfigEntriesError::AlreadyExists { domain, unique_id }) => {
                        warn!("{} entry {} was created meanwhile", domain, unique_id);
                        return Ok(StepResult::abort(ABORT_ALREADY_CONFIGURED));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            FlowKind::Options { entry_id, .. } => {
                self.entries
                    .update(entry_id, ConfigEntryUpdate::new().options(data.clone()))
                    .await?;
            }
        }

        Ok(StepResult::CreateEntry {
            title,
            data,
            unique_id,
        })
    }
}

fn new_flow_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

#[async_trait]
impl ConfigFlowHandler for FlowManager {
    async fn start_flow(&self, handler: &str) -> FlowManagerResult<FlowResult> {
        if handler != DOMAIN {
            return Err(FlowError::UnknownHandler(handler.to_string()));
        }

        let flow_id = new_flow_id();
        info!(
            "Starting config flow for {} with flow_id {}",
            handler, flow_id
        );

        let hub = (self.hub_factory)();
        let mut flow = SetupFlow::new();
        let step = {
            let ctx = SetupContext {
                hub: hub.as_ref(),
                entries: &self.entries,
            };
            flow.step(None, &ctx).await
        };

        let active = ActiveFlow {
            handler: handler.to_string(),
            kind: FlowKind::Setup { flow, hub },
        };
        Ok(self.finish_step(&flow_id, active, step).await)
    }

    async fn progress_flow(
        &self,
        flow_id: &str,
        user_input: Option<Value>,
    ) -> FlowManagerResult<FlowResult> {
        // Out of the table while the step runs
        let active = self
            .flows
            .write()
            .await
            .remove(flow_id)
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;

        debug!(
            "Progressing flow {} for {} at step {}",
            flow_id,
            active.handler,
            active.step_id()
        );

        // Step a copy so a failed commit leaves the flow where it was
        let mut next = active.clone();
        let step = match &mut next.kind {
            FlowKind::Setup { flow, hub } => {
                let ctx = SetupContext {
                    hub: hub.as_ref(),
                    entries: &self.entries,
                };
                flow.step(user_input, &ctx).await
            }
            FlowKind::Options { flow, .. } => flow.step(user_input),
        };

        match self.commit(&next.kind, step).await {
            Ok(step) => Ok(self.finish_step(flow_id, next, step).await),
            Err(e) => {
                warn!(
                    "Flow {} could not be stored, keeping step {}: {}",
                    flow_id,
                    active.step_id(),
                    e
                );
                self.flows.write().await.insert(flow_id.to_string(), active);
                Err(e)
            }
        }
    }

    async fn list_flows(&self) -> Vec<Value> {
        let flows = self.flows.read().await;
        flows
            .iter()
            .map(|(flow_id, flow)| {
                json!({
                    "flow_id": flow_id,
                    "handler": flow.handler,
                    "step_id": flow.step_id(),
                    "context": {
                        "source": flow.source()
                    }
                })
            })
            .collect()
    }
}
