//! Push frame decoding.

use serde::de::Error as _;
use serde_json::Value;

use cadence_types::{LogLevel, LogRecord};

/// Decode one record, or `None` when it cannot be read. A bad record never
/// costs the rest of its frame.
fn record(value: Value) -> Option<LogRecord> {
    if !value.is_object() {
        tracing::warn!(record = %value, "Skipping log record that is not an object");
        return None;
    }
    if let Some(raw) = value.get("level").and_then(Value::as_str)
        && LogLevel::parse(raw).is_none()
    {
        tracing::trace!(level = raw, "Unknown log level, reading as INFO");
    }
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(error = %err, "Skipping malformed log record");
            None
        }
    }
}

/// Decode one push. A frame carries a single record object or an array of
/// them; anything else is malformed. Records inside a well-formed frame are
/// decoded one by one and unreadable ones are dropped.
pub fn decode_frame(text: &str) -> Result<Vec<LogRecord>, serde_json::Error> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => Ok(items.into_iter().filter_map(record).collect()),
        object @ Value::Object(_) => Ok(record(object).into_iter().collect()),
        _ => Err(serde_json::Error::custom(
            "frame must be a record or an array of records",
        )),
    }
}
