//! Bounded, insertion-ordered log buffer.

use std::collections::VecDeque;

use cadence_types::{LogEntry, LogRecord, Scope};

/// Entries kept when no limit is configured.
pub const DEFAULT_MAX_MESSAGES: usize = 500;

/// FIFO of the most recent log entries of one subscription.
///
/// Sequence ids are strictly increasing from 0 and restart on [`clear`].
/// Eviction is oldest-first regardless of severity.
///
/// [`clear`]: LogBuffer::clear
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    max: usize,
    next_seq: u64,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl LogBuffer {
    /// `max` is clamped to at least 1.
    #[must_use]
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            entries: VecDeque::with_capacity(max.min(DEFAULT_MAX_MESSAGES)),
            max,
            next_seq: 0,
        }
    }

    /// Append one record, evicting the oldest entry when full. Returns the
    /// sequence id assigned to it.
    pub fn push(&mut self, scope: Scope, record: LogRecord) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.entries.len() == self.max {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry::from_record(seq, scope, record));
        seq
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }

    /// Change the limit and evict immediately if the buffer is over it.
    pub fn set_max(&mut self, max: usize) {
        self.max = max.max(1);
        while self.entries.len() > self.max {
            self.entries.pop_front();
        }
    }

    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence id the next pushed record will receive.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}
