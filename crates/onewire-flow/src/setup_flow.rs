//! Setup flow
//!
//! `User` asks for the transport, then `Owserver` or `MountDir` collects and
//! validates the connection parameters. A connection already configured is
//! refused before the hub is contacted.

use onewire_config_entries::ConfigEntries;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constants::{CONF_HOST, CONF_MOUNT_DIR, CONF_PORT, CONF_TYPE, DOMAIN};
use crate::flow_result::{submitted, FormField, FormStep, StepResult};
use crate::hub::OneWireHub;
use crate::model::{ConnectionConfig, FilesystemConfig, GatewayConfig, TransportChoice};

pub const STEP_USER: &str = "user";
pub const STEP_OWSERVER: &str = "owserver";
pub const STEP_MOUNT_DIR: &str = "mount_dir";

pub const ERROR_CANNOT_CONNECT: &str = "cannot_connect";
pub const ERROR_INVALID_PATH: &str = "invalid_path";
pub const ERROR_INVALID_INPUT: &str = "invalid_input";
pub const ABORT_ALREADY_CONFIGURED: &str = "already_configured";

/// Where a setup flow currently is.
///
/// The transport picked at `User` is carried by the state tag itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupState {
    #[default]
    User,
    Owserver,
    MountDir,
    Finished,
}

/// Collaborators consulted by the setup steps
pub struct SetupContext<'a> {
    pub hub: &'a dyn OneWireHub,
    pub entries: &'a ConfigEntries,
}

#[derive(Debug, Deserialize)]
struct TransportInput {
    #[serde(rename = "type")]
    transport: TransportChoice,
}

/// Run one step of the setup flow
pub async fn advance(
    state: SetupState,
    input: Option<Value>,
    ctx: &SetupContext<'_>,
) -> (SetupState, StepResult) {
    let input = submitted(input);
    match state {
        SetupState::User => step_user(input),
        SetupState::Owserver => step_owserver(input, ctx).await,
        SetupState::MountDir => step_mount_dir(input, ctx).await,
        SetupState::Finished => (SetupState::Finished, StepResult::abort("flow_finished")),
    }
}

fn step_user(input: Option<Value>) -> (SetupState, StepResult) {
    let Some(input) = input else {
        return (SetupState::User, StepResult::Form(user_form()));
    };

    match serde_json::from_value::<TransportInput>(input) {
        Ok(TransportInput {
            transport: TransportChoice::OwServer,
        }) => (
            SetupState::Owserver,
            StepResult::Form(owserver_form(&GatewayConfig::default())),
        ),
        Ok(TransportInput {
            transport: TransportChoice::SysBus,
        }) => (
            SetupState::MountDir,
            StepResult::Form(mount_dir_form(&FilesystemConfig::default())),
        ),
        Err(e) => {
            debug!("Rejected transport choice: {}", e);
            (
                SetupState::User,
                StepResult::Form(user_form().with_error("base", ERROR_INVALID_INPUT)),
            )
        }
    }
}

async fn step_owserver(input: Option<Value>, ctx: &SetupContext<'_>) -> (SetupState, StepResult) {
    let Some(input) = input else {
        return (
            SetupState::Owserver,
            StepResult::Form(owserver_form(&GatewayConfig::default())),
        );
    };

    let gateway: GatewayConfig = match serde_json::from_value(input) {
        Ok(gateway) => gateway,
        Err(e) => {
            debug!("Rejected owserver parameters: {}", e);
            return (
                SetupState::Owserver,
                StepResult::Form(
                    owserver_form(&GatewayConfig::default()).with_error("base", ERROR_INVALID_INPUT),
                ),
            );
        }
    };

    let config = ConnectionConfig::OwServer(gateway.clone());
    if ctx.entries.entries_match(DOMAIN, &config.to_data()) {
        info!(
            "owserver {}:{} is already configured",
            gateway.host, gateway.port
        );
        return (
            SetupState::Finished,
            StepResult::abort(ABORT_ALREADY_CONFIGURED),
        );
    }

    if let Err(e) = ctx.hub.connect(&gateway.host, gateway.port).await {
        warn!("{}", e);
        return (
            SetupState::Owserver,
            StepResult::Form(owserver_form(&gateway).with_error("base", ERROR_CANNOT_CONNECT)),
        );
    }

    (SetupState::Finished, create_entry(config))
}

async fn step_mount_dir(input: Option<Value>, ctx: &SetupContext<'_>) -> (SetupState, StepResult) {
    let Some(input) = input else {
        return (
            SetupState::MountDir,
            StepResult::Form(mount_dir_form(&FilesystemConfig::default())),
        );
    };

    let filesystem: FilesystemConfig = match serde_json::from_value(input) {
        Ok(filesystem) => filesystem,
        Err(e) => {
            debug!("Rejected mount directory: {}", e);
            return (
                SetupState::MountDir,
                StepResult::Form(
                    mount_dir_form(&FilesystemConfig::default())
                        .with_error("base", ERROR_INVALID_INPUT),
                ),
            );
        }
    };

    let config = ConnectionConfig::SysBus(filesystem.clone());
    if let Some(unique_id) = config.unique_id() {
        if ctx.entries.get_by_unique_id(DOMAIN, &unique_id).is_some() {
            info!("{} is already configured", filesystem.mount_dir);
            return (
                SetupState::Finished,
                StepResult::abort(ABORT_ALREADY_CONFIGURED),
            );
        }
    }

    if let Err(e) = ctx.hub.check_mount_dir(&filesystem.mount_dir).await {
        warn!("{}", e);
        return (
            SetupState::MountDir,
            StepResult::Form(mount_dir_form(&filesystem).with_error("base", ERROR_INVALID_PATH)),
        );
    }

    (SetupState::Finished, create_entry(config))
}

fn create_entry(config: ConnectionConfig) -> StepResult {
    StepResult::CreateEntry {
        title: config.title().to_string(),
        data: config.to_data(),
        unique_id: config.unique_id(),
    }
}

fn user_form() -> FormStep {
    FormStep::new(
        STEP_USER,
        vec![FormField::required(CONF_TYPE, "select")
            .with_options(TransportChoice::ALL.iter().map(|choice| choice.as_str()))],
    )
}

fn owserver_form(defaults: &GatewayConfig) -> FormStep {
    FormStep::new(
        STEP_OWSERVER,
        vec![
            FormField::required(CONF_HOST, "string").with_default(defaults.host.as_str()),
            FormField::required(CONF_PORT, "integer").with_default(defaults.port),
        ],
    )
}

fn mount_dir_form(defaults: &FilesystemConfig) -> FormStep {
    FormStep::new(
        STEP_MOUNT_DIR,
        vec![FormField::required(CONF_MOUNT_DIR, "string").with_default(defaults.mount_dir.as_str())],
    )
}

/// A setup flow session
#[derive(Debug, Clone, Default)]
pub struct SetupFlow {
    state: SetupState,
}

impl SetupFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub async fn step(&mut self, input: Option<Value>, ctx: &SetupContext<'_>) -> StepResult {
        let (next, result) = advance(self.state, input, ctx).await;
        self.state = next;
        result
    }
}
