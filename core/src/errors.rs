//! Scoped controller errors and their user-facing rendering.

use serde_json::Value;
use thiserror::Error;

use cadence_registry::RegistryError;
use cadence_types::{PayloadError, PluginId, Scope, VersionId, truncate_with_ellipsis};

const DETAIL_MAX_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The draft sentinel was used where a stored version is required.
    #[error("version {0} cannot be the target of this operation")]
    InvalidTarget(VersionId),
    #[error("version {0} is not in the loaded version list")]
    UnknownVersion(VersionId),
    #[error("plugin {0} is not in the plugin list")]
    UnknownPlugin(PluginId),
    #[error("the registry refused to toggle version {id}")]
    ActivationRejected { id: VersionId, body: Value },
    #[error("payload is not a JSON document: {0}")]
    InvalidPayload(#[source] PayloadError),
    #[error("no configuration is loaded")]
    NotLoaded,
}

/// A failed controller operation, tagged with the scope it ran against
/// (`None` for the plugin list).
#[derive(Debug, Error)]
#[error("{}{kind}", scope_prefix(.scope))]
pub struct ScopedError {
    pub scope: Option<Scope>,
    #[source]
    pub kind: ErrorKind,
}

fn scope_prefix(scope: &Option<Scope>) -> String {
    scope.map(|scope| format!("[{scope}] ")).unwrap_or_default()
}

impl ScopedError {
    #[must_use]
    pub fn new(scope: Scope, kind: impl Into<ErrorKind>) -> Self {
        Self {
            scope: Some(scope),
            kind: kind.into(),
        }
    }

    #[must_use]
    pub fn unscoped(kind: impl Into<ErrorKind>) -> Self {
        Self {
            scope: None,
            kind: kind.into(),
        }
    }

    /// One-line message for an operator: the server's own detail when the
    /// response carried one, otherwise the error itself.
    #[must_use]
    pub fn user_message(&self) -> String {
        match &self.kind {
            ErrorKind::Registry(err) => describe_registry_error(err),
            ErrorKind::ActivationRejected { id, body } => {
                let detail = detail_from_value(body)
                    .map(|detail| truncate_with_ellipsis(detail.trim(), DETAIL_MAX_CHARS));
                match detail {
                    Some(detail) if !detail.is_empty() => {
                        format!("Activation of version {id} was refused: {detail}")
                    }
                    _ => format!("Activation of version {id} was refused."),
                }
            }
            other => other.to_string(),
        }
    }
}

fn detail_from_value(payload: &Value) -> Option<&str> {
    payload
        .pointer("/detail")
        .and_then(Value::as_str)
        .or_else(|| payload.pointer("/detail/0/msg").and_then(Value::as_str))
        .or_else(|| payload.pointer("/error/message").and_then(Value::as_str))
        .or_else(|| payload.pointer("/error").and_then(Value::as_str))
        .or_else(|| payload.pointer("/message").and_then(Value::as_str))
        .or_else(|| payload.as_str())
}

/// Pull a human-readable message out of a JSON error body.
#[must_use]
pub fn extract_error_message(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body.trim()).ok()?;
    detail_from_value(&payload).map(ToString::to_string)
}

#[must_use]
pub fn is_auth_error(status: u16, detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    matches!(status, 401 | 403)
        || lower.contains("invalid api key")
        || (lower.contains("authorization") && lower.contains("missing"))
}

/// Render a registry or schedule-manager failure for display.
#[must_use]
pub fn describe_registry_error(err: &RegistryError) -> String {
    match err {
        RegistryError::Status { status, body } => {
            let extracted = extract_error_message(body).unwrap_or_else(|| body.clone());
            let detail = truncate_with_ellipsis(extracted.trim(), DETAIL_MAX_CHARS);
            let mut content = if detail.is_empty() {
                format!("Request failed ({status}).")
            } else {
                format!("Request failed ({status}): {detail}")
            };
            if is_auth_error(*status, &detail) {
                content.push_str(" Check the api_key under [schedule] in the config file.");
            }
            content
        }
        RegistryError::NotFound { path } => format!("Not found: {path}"),
        RegistryError::Transport { attempts, source } => {
            format!("Registry unreachable after {attempts} attempt(s): {source}")
        }
        other => other.to_string(),
    }
}
