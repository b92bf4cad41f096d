use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A domain event with a stable wire representation.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **tagged** (`event_type` names the variant on the wire)
/// - designed to be **append-only**
///
/// Decoding is explicit rather than derived so that an unrecognized tag is
/// reported as [`DecodeError::UnknownEventType`] instead of a generic serde
/// failure. Consumers decide whether that is fatal (write path) or skippable
/// (read models lagging behind schema evolution).
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "shopping-cart-opened").
    fn event_type(&self) -> &'static str;

    /// Encode into the `{type, data}` wire shape.
    fn to_data(&self) -> Result<EventData, serde_json::Error>;

    /// Decode from a stored type tag and payload.
    fn from_data(event_type: &str, data: &JsonValue) -> Result<Self, DecodeError>;
}

/// Event wire shape: `{ "type": <tag>, "data": <payload> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: JsonValue,
}

impl EventData {
    /// Serialize a typed payload under the given tag.
    pub fn new<P: Serialize>(event_type: impl Into<String>, payload: &P) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: event_type.into(),
            data: serde_json::to_value(payload)?,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("malformed '{event_type}' payload: {reason}")]
    Malformed { event_type: String, reason: String },
}

impl DecodeError {
    pub fn malformed(event_type: &str, err: serde_json::Error) -> Self {
        Self::Malformed {
            event_type: event_type.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn is_unknown_type(&self) -> bool {
        matches!(self, DecodeError::UnknownEventType(_))
    }
}

/// Deserialize a payload, tagging failures with the event type.
pub fn decode_payload<P>(event_type: &str, data: &JsonValue) -> Result<P, DecodeError>
where
    P: serde::de::DeserializeOwned,
{
    P::deserialize(data).map_err(|e| DecodeError::malformed(event_type, e))
}
