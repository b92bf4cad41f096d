//! Append-only event log boundary.
//!
//! Streams are named (`<category>-<id>`) and hold events at zero-based
//! revisions. Every appended event also gets a global position, and the
//! `$all` feed delivers events across streams in that order.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventLog;
pub use r#trait::{AppendResult, EventLog, EventLogError};
