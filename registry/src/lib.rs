//! Remote collaborators of the Cadence console.
//!
//! # Architecture
//!
//! - [`Registry`]: the config/plugin registry contract the controller drives
//! - [`HttpRegistry`]: the JSON-over-HTTP implementation of that contract
//! - [`ScheduleClient`]: the schedule manager's job listing and pause/resume API
//! - [`retry`]: backoff policy for idempotent reads
//!
//! # Error Handling
//!
//! Every call returns [`RegistryError`]. Non-2xx responses carry the status
//! and a capped copy of the body so callers can show the server's detail.

mod http;
pub mod retry;
mod schedule;
mod wire;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use cadence_types::{ConfigVersion, PluginDescriptor, Scope, VersionId};

pub use http::{HttpRegistry, HttpTimeouts};
pub use schedule::{
    DEFAULT_SCHEDULE_PATH, ScheduleClient, ScheduledJob, SchedulerEvent, ToggleState,
};

/// Error bodies are read up to this many bytes.
pub const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("not found: {path}")]
    NotFound { path: String },
    #[error("registry returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid registry URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl RegistryError {
    /// Raw response body, for errors that carry one.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            RegistryError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Schema and stored versions of one scope, as the registry reports them.
///
/// `versions` may contain an id-0 entry; it is the registry's draft template,
/// not a stored version.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSnapshot {
    pub schema: Value,
    pub versions: Vec<ConfigVersion>,
}

/// Reply to an activation toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationReply {
    /// Whether the registry accepted the toggle. A reply without a boolean
    /// `success` field counts as refused.
    pub success: bool,
    pub body: Value,
}

impl ActivationReply {
    #[must_use]
    pub fn from_body(body: Value) -> Self {
        Self {
            success: body.get("success").and_then(Value::as_bool).unwrap_or(false),
            body,
        }
    }
}

/// Config/plugin registry operations.
///
/// Mutations return the registry's JSON acknowledgement unchanged.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn list_plugins(&self) -> Result<Vec<PluginDescriptor>, RegistryError>;

    async fn fetch_scope(&self, scope: Scope) -> Result<ScopeSnapshot, RegistryError>;

    /// Store `config` as a new version of `scope`.
    async fn create_version(
        &self,
        scope: Scope,
        config: &Value,
        description: &str,
    ) -> Result<Value, RegistryError>;

    /// Overwrite stored version `id`. Never called with the draft id.
    async fn update_version(
        &self,
        id: VersionId,
        config: &Value,
        description: &str,
    ) -> Result<Value, RegistryError>;

    async fn delete_version(&self, id: VersionId) -> Result<Value, RegistryError>;

    /// Exclusive activation: turning one version on turns its siblings off
    /// server-side.
    async fn set_activation(
        &self,
        id: VersionId,
        active: bool,
    ) -> Result<ActivationReply, RegistryError>;

    /// Re-import a plugin's package.
    async fn reload_plugin(&self, package: &str) -> Result<Value, RegistryError>;
}
