//! Registry response shapes.
//!
//! The registry is loose about types: activation flags arrive as `0`/`1` or
//! booleans, and stored configs as JSON text or inline objects. Everything is
//! normalized here so the rest of the crate only sees domain types.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use cadence_types::{ConfigVersion, Payload, VersionId};

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaResponse {
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub configs: Vec<WireConfig>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireConfig {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub active: bool,
    #[serde(default)]
    pub config: Value,
}

impl WireConfig {
    pub(crate) fn into_version(self) -> ConfigVersion {
        let payload = match self.config {
            Value::String(text) => Payload::new(text),
            Value::Null => Payload::empty(),
            other => Payload::from_value(&other),
        };
        ConfigVersion::new(
            VersionId::new(self.id),
            self.description.unwrap_or_default(),
            self.active,
            payload,
        )
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(value) => value,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.trim(), "1" | "true" | "True"),
        _ => false,
    })
}
