//! Scope-bound log subscription with a bounded buffer.

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;

use cadence_types::{LogEntry, Scope};

use crate::buffer::LogBuffer;
use crate::decode::decode_frame;
use crate::source::{LogFeed, LogSource};

/// Why a subscription ended. Every stop is terminal: only a scope change
/// opens a new subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    SubscribeFailed(String),
    Transport(String),
    /// The source closed the stream.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    /// No scope selected.
    Idle,
    Live(Scope),
    Stopped { scope: Scope, reason: StopReason },
}

struct Subscription {
    scope: Scope,
    feed: LogFeed,
}

/// Holds at most one live subscription and the entries it delivered.
///
/// Pull-driven: each [`recv`](Self::recv) waits for the next push and appends
/// its records. `recv` is cancellation-safe, so it can sit in a
/// `tokio::select!` next to other work.
pub struct LogStreamClient {
    source: Arc<dyn LogSource>,
    buffer: LogBuffer,
    active: Option<Subscription>,
    target: Option<Scope>,
    state: StreamState,
}

impl fmt::Debug for LogStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStreamClient")
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("max_messages", &self.buffer.max())
            .finish_non_exhaustive()
    }
}

impl LogStreamClient {
    #[must_use]
    pub fn new(source: Arc<dyn LogSource>, max_messages: usize) -> Self {
        Self {
            source,
            buffer: LogBuffer::new(max_messages),
            active: None,
            target: None,
            state: StreamState::Idle,
        }
    }

    /// Point the client at `scope`, or at nothing.
    ///
    /// The previous subscription is dropped and the buffer cleared before
    /// the new subscription is requested. Selecting the current scope again
    /// does nothing, even if its stream has stopped.
    pub async fn set_scope(&mut self, scope: Option<Scope>) {
        if scope == self.target {
            return;
        }

        self.active = None;
        self.buffer.clear();
        self.target = None;
        self.state = StreamState::Idle;

        let Some(scope) = scope else {
            tracing::debug!("Log stream detached");
            return;
        };

        match self.source.subscribe(scope).await {
            Ok(feed) => {
                self.active = Some(Subscription { scope, feed });
                self.state = StreamState::Live(scope);
                tracing::debug!(scope = %scope, "Log stream live");
            }
            Err(err) => {
                tracing::warn!(scope = %scope, error = %err, "Log stream subscribe failed");
                self.state = StreamState::Stopped {
                    scope,
                    reason: StopReason::SubscribeFailed(err.to_string()),
                };
            }
        }
        self.target = Some(scope);
    }

    /// Wait for the next push and append its records.
    ///
    /// Returns how many entries were appended, or `None` once there is no
    /// live subscription. Malformed frames are skipped.
    pub async fn recv(&mut self) -> Option<usize> {
        loop {
            let subscription = self.active.as_mut()?;
            let scope = subscription.scope;
            let frame = subscription.feed.next().await;

            match frame {
                Some(Ok(text)) => {
                    if self.target != Some(scope) {
                        tracing::debug!(scope = %scope, "Dropping frame from a superseded subscription");
                        continue;
                    }
                    match decode_frame(&text) {
                        Ok(records) => {
                            let count = records.len();
                            for record in records {
                                self.buffer.push(scope, record);
                            }
                            return Some(count);
                        }
                        Err(err) => {
                            tracing::warn!(scope = %scope, error = %err, "Skipping malformed log frame");
                        }
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(scope = %scope, error = %err, "Log stream failed");
                    self.stop(scope, StopReason::Transport(err.to_string()));
                    return None;
                }
                None => {
                    tracing::debug!(scope = %scope, "Log stream closed by source");
                    self.stop(scope, StopReason::Closed);
                    return None;
                }
            }
        }
    }

    fn stop(&mut self, scope: Scope, reason: StopReason) {
        self.active = None;
        self.state = StreamState::Stopped { scope, reason };
    }

    /// Buffered entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.buffer.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.buffer.next_seq()
    }

    /// Empty the buffer and restart sequence ids; the subscription stays.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn set_max_messages(&mut self, max: usize) {
        self.buffer.set_max(max);
    }

    #[must_use]
    pub fn max_messages(&self) -> usize {
        self.buffer.max()
    }

    #[must_use]
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.target
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.state, StreamState::Live(_))
    }
}
