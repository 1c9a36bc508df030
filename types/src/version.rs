//! Configuration versions and their serialized payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::VersionId;

/// Serialized configuration document.
///
/// The registry stores payloads as JSON text; the text is kept verbatim so a
/// version that is not edited is never re-serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

#[derive(Debug, Error)]
#[error("payload is not valid JSON: {source}")]
pub struct PayloadError {
    #[source]
    pub source: serde_json::Error,
}

impl Payload {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The empty document `{}`.
    #[must_use]
    pub fn empty() -> Self {
        Self("{}".to_string())
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self(value.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<Value, PayloadError> {
        serde_json::from_str(&self.0).map_err(|source| PayloadError { source })
    }

    /// Pretty-printed form, or the raw text if it does not parse.
    #[must_use]
    pub fn pretty(&self) -> String {
        self.parse()
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok())
            .unwrap_or_else(|| self.0.clone())
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored configuration of a job family.
///
/// Versions are immutable values: state transitions build new versions
/// (see [`ConfigVersion::with_active`]) instead of flipping flags in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigVersion {
    id: VersionId,
    description: String,
    active: bool,
    payload: Payload,
}

impl ConfigVersion {
    #[must_use]
    pub fn new(
        id: VersionId,
        description: impl Into<String>,
        active: bool,
        payload: Payload,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            active,
            payload,
        }
    }

    /// The unsaved "new job" template.
    #[must_use]
    pub fn draft(template: Payload) -> Self {
        Self::new(VersionId::DRAFT, String::new(), false, template)
    }

    #[must_use]
    pub fn id(&self) -> VersionId {
        self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.id.is_draft()
    }

    #[must_use]
    pub fn with_active(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }

    /// Label for lists: the description, or a placeholder when blank.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.description.trim().is_empty() {
            "Untitled job"
        } else {
            &self.description
        }
    }
}
