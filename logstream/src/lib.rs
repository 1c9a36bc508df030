//! Live job logs for one scope at a time.
//!
//! [`LogStreamClient`] owns a single subscription from a [`LogSource`] and a
//! bounded FIFO of the entries it delivered. Changing scope tears the old
//! subscription down and clears the buffer before the new one is opened, so
//! entries from two scopes never mix.
//!
//! [`WebSocketSource`] is the shipped source: it connects to
//! `{ws-base}/ws/logs/{plugin}/{session}` and yields text frames, each
//! holding one record or an array of records.

mod buffer;
mod client;
mod decode;
mod format;
mod source;
mod ws;

use thiserror::Error;

pub use buffer::{DEFAULT_MAX_MESSAGES, LogBuffer};
pub use client::{LogStreamClient, StopReason, StreamState};
pub use decode::decode_frame;
pub use format::format_message;
pub use source::{LogFeed, LogSource};
pub use ws::WebSocketSource;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogStreamError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("log stream transport error: {0}")]
    Transport(String),
    #[error("invalid log stream URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}
