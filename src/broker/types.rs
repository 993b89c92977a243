//! Types exchanged with the registry and the remote-call transport.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fully qualified action name, `"<service>.<action>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionName(String);

impl ActionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last `.`.
    pub fn service(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(service, _)| service)
    }

    /// Everything after the last `.`.
    pub fn action(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, action)| action)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Metadata the registry reports for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    /// Fully qualified name.
    pub name: ActionName,
}

/// A service as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Short action name → metadata.
    #[serde(default)]
    pub actions: BTreeMap<String, ActionInfo>,
}

/// Filter passed to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceQuery {
    pub only_available: bool,
    pub with_actions: bool,
}

impl Default for ServiceQuery {
    fn default() -> Self {
        Self {
            only_available: true,
            with_actions: true,
        }
    }
}

/// Parameters handed to an action call.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Extracted request parameters.
    Data(Value),
    /// Extraction failed. Carries the failure message.
    Invalid(String),
}

impl Params {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Params::Invalid(_))
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::Data(value) => write!(f, "{}", value),
            Params::Invalid(message) => write!(f, "<invalid: {}>", message),
        }
    }
}

/// Request-scoped metadata forwarded with a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMeta {
    /// Authenticated user, `None` for anonymous or when authentication is off.
    pub user: Option<Value>,
    /// Value of the `x-request-id` header.
    pub request_id: Option<String>,
}

/// Structured failure returned by an action.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
    /// Domain-specific code, often an HTTP status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            kind: None,
            data: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Outcome of an action call.
pub type CallResult = Result<Value, ActionError>;

/// Transport level failures.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("registry unavailable: {0}")]
    Registry(String),

    #[error("action '{0}' not found")]
    ActionNotFound(ActionName),

    #[error("service '{0}' is not available")]
    ServiceUnavailable(String),
}

impl From<BrokerError> for ActionError {
    fn from(err: BrokerError) -> Self {
        let code = match err {
            BrokerError::ActionNotFound(_) => 404,
            BrokerError::Registry(_) | BrokerError::ServiceUnavailable(_) => 503,
        };
        ActionError::new(err.to_string()).with_code(code)
    }
}
