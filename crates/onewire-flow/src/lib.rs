//! 1-Wire config flows
//!
//! Setup flow: pick a transport (owserver gateway or sysfs bus), validate
//! it against the hub, and create a config entry. Options flow: pick DS18B20
//! sensors and set their precision.
//!
//! Both flows are tagged-state machines driven one submission at a time by
//! [`FlowManager`], which also persists the finished result.

pub mod constants;
pub mod error;
pub mod flow_result;
pub mod hub;
pub mod manager;
pub mod model;
pub mod naming;
pub mod options_flow;
pub mod setup_flow;

pub use error::{FlowError, FlowManagerResult};
pub use flow_result::{
    ConfigFlowHandler, FlowResult, FlowResultType, FormField, FormStep, StepResult,
};
pub use hub::{Hub, HubError, HubResult, OneWireHub};
pub use manager::{FlowManager, HubFactory};
pub use model::{
    ConnectionConfig, DeviceDescription, FilesystemConfig, GatewayConfig, OptionsRecord,
    PrecisionLabel, TransportChoice,
};
pub use naming::{id_from_label, label_from_id, DeviceLabeler, DeviceNameLookup};
pub use options_flow::{OptionsContext, OptionsFlow, OptionsState};
pub use setup_flow::{SetupContext, SetupFlow, SetupState};
