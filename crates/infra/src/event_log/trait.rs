use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cartledger_core::ExpectedRevision;
use cartledger_events::{EventData, RecordedEvent, StreamId, Subscription};

/// Outcome of a successful append.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResult {
    /// Revision of the last appended event; submit it as the expectation of
    /// the next write.
    pub next_expected_revision: u64,
    /// Global position of the last appended event.
    pub global_position: u64,
}

/// Event log operation error.
///
/// These are **infrastructure errors** (concurrency, availability, encoding)
/// as opposed to the domain's business errors.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// The stream's current revision did not match the expectation.
    #[error("version conflict on '{stream}': expected {expected}, actual {}", describe_actual(.actual))]
    VersionConflict {
        stream: StreamId,
        expected: ExpectedRevision,
        actual: Option<u64>,
    },

    #[error("event log unavailable: {0}")]
    Unavailable(String),

    #[error("event encoding failed: {0}")]
    Encode(String),

    #[error("append to '{0}' carried no events")]
    EmptyAppend(StreamId),
}

impl EventLogError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, EventLogError::VersionConflict { .. })
    }
}

fn describe_actual(actual: &Option<u64>) -> String {
    match actual {
        Some(revision) => revision.to_string(),
        None => "no stream".to_string(),
    }
}

/// Append-only event log with per-stream optimistic concurrency and a
/// globally-ordered feed.
///
/// ## Append Semantics
///
/// `append()`:
/// - checks `expected` against the stream's current last revision
/// - assigns revisions `expected.next()..` and fresh global positions
/// - persists the batch atomically (all or nothing)
///
/// ## Read Semantics
///
/// `read_stream()` returns the stream in revision order, or an empty vector
/// when the stream does not exist.
///
/// ## Feed Semantics
///
/// `subscribe_to_all(from)` delivers every event whose global position is
/// strictly greater than `from` (all events when `None`), in global order,
/// followed by events appended later. Delivery is at-least-once.
pub trait EventLog: Send + Sync {
    fn append(
        &self,
        stream: &StreamId,
        events: Vec<EventData>,
        expected: ExpectedRevision,
    ) -> Result<AppendResult, EventLogError>;

    fn read_stream(&self, stream: &StreamId) -> Result<Vec<RecordedEvent>, EventLogError>;

    fn subscribe_to_all(&self, from: Option<u64>) -> Result<Subscription<RecordedEvent>, EventLogError>;
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn append(
        &self,
        stream: &StreamId,
        events: Vec<EventData>,
        expected: ExpectedRevision,
    ) -> Result<AppendResult, EventLogError> {
        (**self).append(stream, events, expected)
    }

    fn read_stream(&self, stream: &StreamId) -> Result<Vec<RecordedEvent>, EventLogError> {
        (**self).read_stream(stream)
    }

    fn subscribe_to_all(&self, from: Option<u64>) -> Result<Subscription<RecordedEvent>, EventLogError> {
        (**self).subscribe_to_all(from)
    }
}
