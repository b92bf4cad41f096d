use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::event::{DecodeError, Event, EventData};
use crate::stream::StreamId;

/// An event as stored in the log, with its position metadata.
///
/// Notes:
/// - **Append-only**: `stream_revision` is zero-based and monotonically
///   increasing per stream.
/// - `global_position` is monotonically increasing across all streams and is
///   what subscriptions checkpoint against.
/// - `data` is the domain-agnostic payload; decode with [`RecordedEvent::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event_id: Uuid,
    pub stream_id: StreamId,
    pub stream_revision: u64,
    pub global_position: u64,
    pub event_type: String,
    pub data: JsonValue,
    pub recorded_at: DateTime<Utc>,
}

impl RecordedEvent {
    /// Decode the payload into a typed event.
    pub fn decode<E: Event>(&self) -> Result<E, DecodeError> {
        E::from_data(&self.event_type, &self.data)
    }

    /// Wire shape without position metadata.
    pub fn event_data(&self) -> EventData {
        EventData {
            event_type: self.event_type.clone(),
            data: self.data.clone(),
        }
    }
}
