//! Options flow
//!
//! Lets the user pick DS18B20 sensors and set a precision for each. The
//! selected ids are worked through as a stack, so the last selected device
//! is asked about first. Nothing is stored until the flow commits.

use std::mem;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::constants::{
    OPTION_CLEAR_DEVICE_CONFIG, OPTION_DEVICE_SELECTION, OPTION_SENSOR_PRECISION,
};
use crate::flow_result::{submitted, FormField, FormStep, StepResult};
use crate::hub::OneWireHub;
use crate::model::{OptionsRecord, PrecisionLabel};
use crate::naming::DeviceLabeler;
use crate::setup_flow::ERROR_INVALID_INPUT;

pub const STEP_INIT: &str = "init";
pub const STEP_DEVICE_SELECTION: &str = "device_selection";
pub const STEP_CONFIGURE_DEVICE: &str = "configure_device";

pub const ERROR_INVALID_DEVICE: &str = "invalid_device";

/// Where an options flow currently is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OptionsState {
    #[default]
    Init,
    DeviceSelection,
    /// Asking about `current`; `pending` still waits, last one next
    DeviceConfig {
        current: String,
        pending: Vec<String>,
    },
    Finished,
}

/// What the options steps read but never change
#[derive(Debug, Clone)]
pub struct OptionsContext {
    /// DS18B20 ids reported by the hub, in hub order
    pub devices: Vec<String>,
    pub labeler: DeviceLabeler,
}

#[derive(Debug, Deserialize)]
struct SelectionInput {
    #[serde(default)]
    clear_device_config: bool,
    /// Absent means keep the stored selection
    #[serde(default)]
    ds18b20_device_selection: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PrecisionInput {
    sensor_precision: PrecisionLabel,
}

/// Run one step of the options flow.
///
/// The record is threaded through each step and only returned to the
/// caller inside the final create-entry result.
pub fn advance(
    state: OptionsState,
    record: OptionsRecord,
    input: Option<Value>,
    ctx: &OptionsContext,
) -> (OptionsState, OptionsRecord, StepResult) {
    match state {
        // Any object at init commits, even an empty one
        OptionsState::Init => step_init(record, input.filter(|v| !v.is_null()), ctx),
        OptionsState::DeviceSelection => step_device_selection(record, submitted(input), ctx),
        OptionsState::DeviceConfig { current, pending } => {
            step_configure_device(current, pending, record, submitted(input), ctx)
        }
        OptionsState::Finished => (
            OptionsState::Finished,
            record,
            StepResult::abort("flow_finished"),
        ),
    }
}

fn step_init(
    record: OptionsRecord,
    input: Option<Value>,
    ctx: &OptionsContext,
) -> (OptionsState, OptionsRecord, StepResult) {
    let Some(input) = input else {
        let form = selection_form(&record, ctx);
        return (OptionsState::DeviceSelection, record, StepResult::Form(form));
    };

    match serde_json::from_value::<OptionsRecord>(input) {
        Ok(options) if options.clear_device_config => commit(OptionsRecord::default()),
        Ok(options) => commit(options),
        Err(e) => {
            debug!("Rejected options submitted at init: {}", e);
            let form = selection_form(&record, ctx).with_error("base", ERROR_INVALID_INPUT);
            (OptionsState::DeviceSelection, record, StepResult::Form(form))
        }
    }
}

fn step_device_selection(
    mut record: OptionsRecord,
    input: Option<Value>,
    ctx: &OptionsContext,
) -> (OptionsState, OptionsRecord, StepResult) {
    let Some(input) = input else {
        let form = selection_form(&record, ctx);
        return (OptionsState::DeviceSelection, record, StepResult::Form(form));
    };

    let selection: SelectionInput = match serde_json::from_value(input) {
        Ok(selection) => selection,
        Err(e) => {
            debug!("Rejected device selection: {}", e);
            let form = selection_form(&record, ctx).with_error("base", ERROR_INVALID_INPUT);
            return (OptionsState::DeviceSelection, record, StepResult::Form(form));
        }
    };

    if selection.clear_device_config {
        info!("Clearing 1-Wire device options");
        return commit(OptionsRecord::default());
    }

    let ids = match selection.ds18b20_device_selection {
        Some(labels) => match resolve_selection(&labels, ctx) {
            Some(ids) => ids,
            None => {
                let form = selection_form(&record, ctx)
                    .with_error(OPTION_DEVICE_SELECTION, ERROR_INVALID_DEVICE);
                return (OptionsState::DeviceSelection, record, StepResult::Form(form));
            }
        },
        // Stored ids that left the bus are dropped, not reported
        None => {
            let mut ids: Vec<String> = Vec::new();
            for id in &record.ds18b20_device_selection {
                if ctx.devices.contains(id) && !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
            ids
        }
    };

    record.clear_device_config = false;
    record.ds18b20_device_selection = ids.clone();

    next_device(ids, record, ctx)
}

/// Map submitted labels to bus ids, first occurrence wins.
/// `None` if any label names a device that is not on the bus.
fn resolve_selection(labels: &[String], ctx: &OptionsContext) -> Option<Vec<String>> {
    let mut ids: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let id = ctx.labeler.resolve(label, &ctx.devices);
        if !ctx.devices.contains(&id) {
            debug!("Selected device {} is not on the bus", id);
            return None;
        }
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Some(ids)
}

fn step_configure_device(
    current: String,
    pending: Vec<String>,
    mut record: OptionsRecord,
    input: Option<Value>,
    ctx: &OptionsContext,
) -> (OptionsState, OptionsRecord, StepResult) {
    let Some(input) = input else {
        let form = device_form(&current, &record, ctx);
        return (
            OptionsState::DeviceConfig { current, pending },
            record,
            StepResult::Form(form),
        );
    };

    match serde_json::from_value::<PrecisionInput>(input) {
        Ok(PrecisionInput { sensor_precision }) => {
            debug!("Precision for {} set to {}", current, sensor_precision);
            record.sensor_precision.insert(current, sensor_precision);
            next_device(pending, record, ctx)
        }
        Err(e) => {
            debug!("Rejected precision for {}: {}", current, e);
            let form = device_form(&current, &record, ctx).with_error("base", ERROR_INVALID_INPUT);
            (
                OptionsState::DeviceConfig { current, pending },
                record,
                StepResult::Form(form),
            )
        }
    }
}

/// Pop the next device to configure, or commit once none are left
fn next_device(
    mut pending: Vec<String>,
    record: OptionsRecord,
    ctx: &OptionsContext,
) -> (OptionsState, OptionsRecord, StepResult) {
    match pending.pop() {
        Some(current) => {
            let form = device_form(&current, &record, ctx);
            (
                OptionsState::DeviceConfig { current, pending },
                record,
                StepResult::Form(form),
            )
        }
        None => commit(record),
    }
}

fn commit(record: OptionsRecord) -> (OptionsState, OptionsRecord, StepResult) {
    let result = StepResult::CreateEntry {
        title: String::new(),
        data: record.to_options(),
        unique_id: None,
    };
    (OptionsState::Finished, record, result)
}

fn selection_form(record: &OptionsRecord, ctx: &OptionsContext) -> FormStep {
    let labels: Vec<String> = ctx.devices.iter().map(|id| ctx.labeler.label(id)).collect();

    // Hub order; ids that left the bus drop out
    let selected: Vec<String> = ctx
        .devices
        .iter()
        .filter(|id| record.ds18b20_device_selection.contains(*id))
        .map(|id| ctx.labeler.label(id))
        .collect();

    FormStep::new(
        STEP_DEVICE_SELECTION,
        vec![
            FormField::optional(OPTION_CLEAR_DEVICE_CONFIG, "boolean").with_default(false),
            FormField::optional(OPTION_DEVICE_SELECTION, "multi_select")
                .with_options(labels)
                .with_default(selected),
        ],
    )
}

fn device_form(device_id: &str, record: &OptionsRecord, ctx: &OptionsContext) -> FormStep {
    FormStep::new(
        STEP_CONFIGURE_DEVICE,
        vec![FormField::required(OPTION_SENSOR_PRECISION, "select")
            .with_options(PrecisionLabel::ALL.iter().map(|label| label.as_str()))
            .with_default(record.precision_for(device_id).as_str())],
    )
    .with_placeholder("sens_id", ctx.labeler.label(device_id))
}

/// An options flow session for one config entry
#[derive(Debug, Clone)]
pub struct OptionsFlow {
    state: OptionsState,
    record: OptionsRecord,
    context: OptionsContext,
}

impl OptionsFlow {
    /// Start from the entry's stored options and the hub's DS18B20 sensors
    pub async fn new(hub: &dyn OneWireHub, record: OptionsRecord, labeler: DeviceLabeler) -> Self {
        let devices: Vec<String> = hub
            .devices()
            .await
            .into_iter()
            .filter(|device| device.is_ds18b20())
            .map(|device| device.id)
            .collect();

        for id in &devices {
            debug!("Configurable sensor: {}", labeler.label(id));
        }

        Self {
            state: OptionsState::Init,
            record,
            context: OptionsContext { devices, labeler },
        }
    }

    pub fn state(&self) -> &OptionsState {
        &self.state
    }

    pub fn record(&self) -> &OptionsRecord {
        &self.record
    }

    pub fn devices(&self) -> &[String] {
        &self.context.devices
    }

    pub fn step(&mut self, input: Option<Value>) -> StepResult {
        let state = mem::take(&mut self.state);
        let record = mem::take(&mut self.record);
        let (state, record, result) = advance(state, record, input, &self.context);
        self.state = state;
        self.record = record;
        result
    }
}
