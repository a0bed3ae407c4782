//! Flow step results
//!
//! A step either shows a form, finishes with data to store, or aborts. The
//! flows produce [`StepResult`]; the manager wraps it into the
//! [`FlowResult`] handed to the frontend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FlowManagerResult;

/// Kind of flow result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowResultType {
    Form,
    CreateEntry,
    Abort,
}

/// Form field schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    /// `string`, `integer`, `boolean`, `select` or `multi_select`
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Choices for select fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FormField {
    fn new(name: &str, field_type: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            required: Some(required),
            default: None,
            options: None,
        }
    }

    pub fn required(name: &str, field_type: &str) -> Self {
        Self::new(name, field_type, true)
    }

    pub fn optional(name: &str, field_type: &str) -> Self {
        Self::new(name, field_type, false)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

/// A form to render
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormStep {
    pub step_id: String,
    pub data_schema: Vec<FormField>,
    pub errors: HashMap<String, String>,
    pub description_placeholders: HashMap<String, String>,
}

impl FormStep {
    pub fn new(step_id: &str, data_schema: Vec<FormField>) -> Self {
        Self {
            step_id: step_id.to_string(),
            data_schema,
            ..Self::default()
        }
    }

    pub fn with_error(mut self, field: &str, code: &str) -> Self {
        self.errors.insert(field.to_string(), code.to_string());
        self
    }

    pub fn with_placeholder(mut self, key: &str, value: impl Into<String>) -> Self {
        self.description_placeholders
            .insert(key.to_string(), value.into());
        self
    }

    /// Default value of a field, if the schema has one
    pub fn default_for(&self, name: &str) -> Option<&Value> {
        self.data_schema
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.default.as_ref())
    }
}

/// Outcome of one flow step
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Form(FormStep),
    CreateEntry {
        title: String,
        data: Map<String, Value>,
        unique_id: Option<String>,
    },
    Abort {
        reason: String,
    },
}

impl StepResult {
    pub fn abort(reason: &str) -> Self {
        StepResult::Abort {
            reason: reason.to_string(),
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, StepResult::Form(_))
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            StepResult::Form(form) => Some(&form.step_id),
            _ => None,
        }
    }

    /// The form, if this result shows one
    pub fn as_form(&self) -> Option<&FormStep> {
        match self {
            StepResult::Form(form) => Some(form),
            _ => None,
        }
    }
}

/// Result of a flow step as sent to the frontend
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    pub flow_id: String,
    /// Integration domain
    pub handler: String,
    #[serde(rename = "type")]
    pub result_type: FlowResultType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Always present, empty if no schema
    pub data_schema: Vec<FormField>,
    /// Errors from the previous submission, null if none
    pub errors: Option<HashMap<String, String>>,
    pub description_placeholders: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Stored data (for create_entry)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl FlowResult {
    pub fn from_step(flow_id: &str, handler: &str, step: StepResult) -> Self {
        let mut result = Self {
            flow_id: flow_id.to_string(),
            handler: handler.to_string(),
            result_type: FlowResultType::Form,
            step_id: None,
            data_schema: Vec::new(),
            errors: None,
            description_placeholders: None,
            title: None,
            reason: None,
            version: None,
            result: None,
        };

        match step {
            StepResult::Form(form) => {
                result.step_id = Some(form.step_id);
                result.data_schema = form.data_schema;
                result.errors = (!form.errors.is_empty()).then_some(form.errors);
                result.description_placeholders = (!form.description_placeholders.is_empty())
                    .then_some(form.description_placeholders);
            }
            StepResult::CreateEntry { title, data, .. } => {
                result.result_type = FlowResultType::CreateEntry;
                result.title = Some(title);
                result.version = Some(1);
                result.result = Some(Value::Object(data));
            }
            StepResult::Abort { reason } => {
                result.result_type = FlowResultType::Abort;
                result.reason = Some(reason);
            }
        }

        result
    }
}

/// Treat a missing, null or empty submission as "show the form"
pub(crate) fn submitted(input: Option<Value>) -> Option<Value> {
    match input {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        other => other,
    }
}

/// Config flow API exposed to a frontend
#[async_trait]
pub trait ConfigFlowHandler: Send + Sync {
    /// Start a new configuration flow for an integration
    ///
    /// # Returns
    /// The initial flow result (usually a form to fill out)
    async fn start_flow(&self, handler: &str) -> FlowManagerResult<FlowResult>;

    /// Continue a flow with user input
    ///
    /// # Returns
    /// The next flow result (form, create_entry, or abort)
    async fn progress_flow(
        &self,
        flow_id: &str,
        user_input: Option<Value>,
    ) -> FlowManagerResult<FlowResult>;

    /// Get list of active flows
    async fn list_flows(&self) -> Vec<Value>;
}
