//! Core domain types for Cadence.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod ids;
mod log;
mod plugin;
mod scope;
mod version;

pub use ids::{PluginId, SessionId, VersionId};
pub use log::{LogEntry, LogLevel, LogRecord};
pub use plugin::PluginDescriptor;
pub use scope::{Scope, ScopeParseError};
pub use version::{ConfigVersion, Payload, PayloadError};

/// Truncate `text` to at most `max_chars` characters, appending an ellipsis
/// when anything was cut.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::truncate_with_ellipsis;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_with_ellipsis("ééééé", 3), "éé…");
        assert_eq!(truncate_with_ellipsis("abc", 0), "");
    }
}
