use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Placeholder physical id reported when a Create fails before any
/// provider-assigned identity exists. CloudFormation requires a non-empty
/// value to correlate the follow-up Delete.
pub const FAILED_CREATE_PHYSICAL_ID: &str = "resource-not-created";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// One lifecycle notification from the deployment orchestrator. Constructed
/// by CloudFormation per stack operation and never mutated by handlers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub resource_type: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Outcome of one handler action, terminal once reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub status: ResponseStatus,
    pub physical_resource_id: String,
    pub data: BTreeMap<String, String>,
    pub reason: Option<String>,
}

impl ActionResult {
    pub fn success(physical_resource_id: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            physical_resource_id: physical_resource_id.into(),
            data: BTreeMap::new(),
            reason: None,
        }
    }

    pub fn failed(physical_resource_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            physical_resource_id: physical_resource_id.into(),
            data: BTreeMap::new(),
            reason: Some(reason.into()),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Callback body PUT to the event's `ResponseURL`, in the orchestrator's
/// wire schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackPayload {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub data: BTreeMap<String, String>,
}

impl CallbackPayload {
    pub fn from_result(event: &LifecycleEvent, result: ActionResult) -> Self {
        Self {
            status: result.status,
            reason: result.reason,
            physical_resource_id: result.physical_resource_id,
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data: result.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Malformed or missing input properties. Never retried.
    Validation(String),
    /// The provider API call failed or returned an unexpected shape.
    Upstream(String),
    /// A multi-step action succeeded partially; compensation was attempted
    /// and its per-step outcome is embedded in the message.
    Partial(String),
}

impl HandlerError {
    pub fn missing_property(name: &str) -> Self {
        Self::Validation(format!("missing property: {name}"))
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Validation(message) | Self::Upstream(message) | Self::Partial(message) => message,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Upstream(_) => "upstream_error",
            Self::Partial(_) => "partial_failure",
        }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.reason())
    }
}

impl std::error::Error for HandlerError {}

/// Deterministic physical id for lookup-only resources that never receive
/// a provider-assigned identity. Stable across retried and repeated
/// invocations for the same logical resource.
pub fn derived_physical_id(stack_id: &str, logical_resource_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stack_id.as_bytes());
    hasher.update(b"/");
    hasher.update(logical_resource_id.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..32].to_string()
}

pub fn parse_lifecycle_event(raw: Value) -> Result<LifecycleEvent, HandlerError> {
    serde_json::from_value(raw)
        .map_err(|error| HandlerError::Validation(format!("malformed lifecycle event: {error}")))
}

pub fn stable_callback_json(payload: &CallbackPayload) -> String {
    serde_json::to_string(payload).expect("callback payload serialization should not fail")
}
