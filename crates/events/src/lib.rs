//! Event contract, stream naming and recorded-event metadata.

pub mod envelope;
pub mod event;
pub mod stream;
pub mod subscription;

pub use envelope::RecordedEvent;
pub use event::{DecodeError, Event, EventData, decode_payload};
pub use stream::StreamId;
pub use subscription::Subscription;
