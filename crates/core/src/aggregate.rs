//! Aggregate contract for event-sourced domain models.

use serde::{Deserialize, Serialize};

/// Optimistic concurrency expectation submitted with every append.
///
/// Revisions are zero-based: the first event of a stream has revision 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "revision", rename_all = "snake_case")]
pub enum ExpectedRevision {
    /// The stream must not exist yet (creation).
    NoStream,
    /// The stream's last event must have exactly this revision.
    Exact(u64),
}

impl ExpectedRevision {
    /// Check the expectation against the stream's current last revision
    /// (`None` when the stream has no events).
    pub fn matches(self, current: Option<u64>) -> bool {
        match (self, current) {
            (ExpectedRevision::NoStream, None) => true,
            (ExpectedRevision::Exact(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }

    /// Revision the stream will have after one more event is appended.
    pub fn next(self) -> u64 {
        match self {
            ExpectedRevision::NoStream => 0,
            ExpectedRevision::Exact(v) => v + 1,
        }
    }
}

impl core::fmt::Display for ExpectedRevision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ExpectedRevision::NoStream => f.write_str("no stream"),
            ExpectedRevision::Exact(v) => write!(f, "{v}"),
        }
    }
}

/// Aggregate state evolution (pure, deterministic).
///
/// State only exists once the first event has been applied, so the
/// transition receives `None` for a fresh stream. Implementations must not
/// perform IO and must return the same state for the same input, since
/// state is rebuilt by full replay on every command.
pub trait Aggregate: Sized {
    type Event;
    type Error;

    /// Apply one event to the current state (or to nothing, for the first
    /// event of a stream).
    fn evolve(state: Option<Self>, event: &Self::Event) -> Result<Self, Self::Error>;
}
