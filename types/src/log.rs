//! Log records pushed by running job instances.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::Scope;

/// Severity of a pushed log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Parse a severity name, accepting the common aliases emitted by
    /// logging frameworks.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" | "WARN" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" | "FATAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }

    /// Like [`LogLevel::parse`], but unknown names read as `Info`.
    #[must_use]
    pub fn parse_lossy(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    #[must_use]
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
        ]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(LogLevel::parse_lossy).unwrap_or_default())
    }
}

/// Text fields accept any JSON value: strings as-is, `null` as empty, and
/// anything else as its JSON text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// One record as delivered by the log source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: String,
    #[serde(default, alias = "timestamp", deserialize_with = "lenient_text")]
    pub time: String,
    /// Server-side job tag (`package/session`), when the source sends one.
    #[serde(default, rename = "job_id", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A buffered log record with its per-subscription identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Strictly increasing within one subscription; restarts at 0 when the
    /// scope changes or the buffer is cleared.
    pub seq: u64,
    pub scope: Scope,
    pub level: LogLevel,
    pub timestamp: String,
    pub message: String,
    pub source: Option<String>,
}

impl LogEntry {
    #[must_use]
    pub fn from_record(seq: u64, scope: Scope, record: LogRecord) -> Self {
        Self {
            seq,
            scope,
            level: record.level,
            timestamp: record.time,
            message: record.message,
            source: record.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, LogRecord};

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(LogLevel::parse("warn"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("Fatal"), Some(LogLevel::Critical));
        assert_eq!(LogLevel::parse("nope"), None);
        assert_eq!(LogLevel::parse_lossy("nope"), LogLevel::Info);
    }

    #[test]
    fn record_deserializes_wire_shape() {
        let record: LogRecord = serde_json::from_str(
            r#"{"level":"ERROR","message":"boom","time":"2025-12-18 10:57:15","job_id":"pkg/1"}"#,
        )
        .unwrap();
        assert_eq!(record.level, LogLevel::Error);
        assert_eq!(record.message, "boom");
        assert_eq!(record.time, "2025-12-18 10:57:15");
        assert_eq!(record.source.as_deref(), Some("pkg/1"));
    }

    #[test]
    fn record_tolerates_unknown_level_and_missing_fields() {
        let record: LogRecord = serde_json::from_str(r#"{"level":"NOTICE"}"#).unwrap();
        assert_eq!(record.level, LogLevel::Info);
        assert!(record.message.is_empty());
        assert!(record.source.is_none());
    }

    #[test]
    fn record_reads_null_level_and_structured_message() {
        let record: LogRecord =
            serde_json::from_str(r#"{"level":null,"message":{"k":1},"time":null}"#).unwrap();
        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(record.message, r#"{"k":1}"#);
        assert!(record.time.is_empty());

        let record: LogRecord = serde_json::from_str(r#"{"message":42}"#).unwrap();
        assert_eq!(record.message, "42");
    }
}
