//! Value log: an append-only per-owner record of State value publications.
//!
//! Entries are keyed by State name and stamped with a session-wide logical
//! clock, a wall-clock time and the context tag of the publication.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Value;

/// Which publications get written to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Nothing is recorded.
    #[default]
    Off,
    /// Every assignment, including construction-time ones.
    AllAssignments,
    /// Only assignments made while executing.
    Execution,
    /// Only assignments made while executing that change the value.
    ValueAssignment,
}

impl LogLevel {
    pub fn should_record(&self, context: &Context, changed: bool) -> bool {
        match self {
            LogLevel::Off => false,
            LogLevel::AllAssignments => true,
            LogLevel::Execution => context.executing,
            LogLevel::ValueAssignment => context.executing && changed,
        }
    }
}

/// Tag describing why an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Context {
    /// True during an evaluation step, false during construction.
    pub executing: bool,
    pub tag: String,
}

impl Context {
    pub fn construction(tag: impl Into<String>) -> Self {
        Self { executing: false, tag: tag.into() }
    }

    pub fn execution(tag: impl Into<String>) -> Self {
        Self { executing: true, tag: tag.into() }
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = if self.executing { "executing" } else { "constructing" };
        if self.tag.is_empty() {
            f.write_str(phase)
        } else {
            write!(f, "{phase}: {}", self.tag)
        }
    }
}

/// Logical timestamp. Strictly increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalTime(pub u64);

/// Monotonic logical clock shared by every owner in a session.
#[derive(Debug, Default)]
pub struct LogicalClock {
    next: AtomicU64,
}

impl LogicalClock {
    pub fn tick(&self) -> LogicalTime {
        LogicalTime(self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub fn now(&self) -> LogicalTime {
        LogicalTime(self.next.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub name: String,
    pub time: LogicalTime,
    pub recorded_at: DateTime<Utc>,
    pub context: String,
    pub value: Value,
}

/// Append-only log owned by one Mechanism.
#[derive(Debug, Clone, Default)]
pub struct Log {
    entries: Vec<LogEntry>,
}

impl Log {
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.name == name)
    }

    pub fn latest(&self, name: &str) -> Option<&LogEntry> {
        self.entries.iter().rev().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
