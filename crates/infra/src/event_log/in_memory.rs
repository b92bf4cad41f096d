use std::collections::HashMap;
use std::sync::{RwLock, mpsc};

use uuid::Uuid;

use cartledger_core::{Clock, ExpectedRevision, SystemClock};
use cartledger_events::{EventData, RecordedEvent, StreamId, Subscription};

use super::r#trait::{AppendResult, EventLog, EventLogError};

#[derive(Debug, Default)]
struct LogState {
    /// Every event in global order; index == global position.
    all: Vec<RecordedEvent>,
    /// Per-stream indexes into `all`, in revision order.
    streams: HashMap<StreamId, Vec<usize>>,
    subscribers: Vec<mpsc::Sender<RecordedEvent>>,
}

impl LogState {
    fn current_revision(&self, stream: &StreamId) -> Option<u64> {
        self.streams
            .get(stream)
            .and_then(|idx| idx.last())
            .map(|&i| self.all[i].stream_revision)
    }

    fn publish(&mut self, event: &RecordedEvent) {
        // Drop any dead subscribers while publishing.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// In-memory append-only event log.
///
/// Intended for tests/dev. Subscribers are fed under the same lock that
/// assigns global positions, so a subscription never observes a gap or an
/// out-of-order event.
pub struct InMemoryEventLog {
    state: RwLock<LogState>,
    clock: Box<dyn Clock>,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl core::fmt::Debug for InMemoryEventLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryEventLog").finish_non_exhaustive()
    }
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `recorded_at` from `clock` instead of wall time.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            state: RwLock::new(LogState::default()),
            clock: Box::new(clock),
        }
    }

    /// Global position of the most recent event, if any.
    pub fn last_position(&self) -> Option<u64> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.all.last().map(|e| e.global_position))
    }
}

fn poisoned() -> EventLogError {
    EventLogError::Unavailable("lock poisoned".to_string())
}

impl EventLog for InMemoryEventLog {
    fn append(
        &self,
        stream: &StreamId,
        events: Vec<EventData>,
        expected: ExpectedRevision,
    ) -> Result<AppendResult, EventLogError> {
        if events.is_empty() {
            return Err(EventLogError::EmptyAppend(stream.clone()));
        }

        let mut state = self.state.write().map_err(|_| poisoned())?;

        let current = state.current_revision(stream);
        if !expected.matches(current) {
            return Err(EventLogError::VersionConflict {
                stream: stream.clone(),
                expected,
                actual: current,
            });
        }

        let recorded_at = self.clock.now();
        let mut revision = expected.next();
        let mut last = None;
        for data in events {
            let position = state.all.len() as u64;
            let recorded = RecordedEvent {
                event_id: Uuid::now_v7(),
                stream_id: stream.clone(),
                stream_revision: revision,
                global_position: position,
                event_type: data.event_type,
                data: data.data,
                recorded_at,
            };

            state.publish(&recorded);
            state.all.push(recorded);
            state
                .streams
                .entry(stream.clone())
                .or_default()
                .push(position as usize);

            last = Some(AppendResult {
                next_expected_revision: revision,
                global_position: position,
            });
            revision += 1;
        }

        last.ok_or_else(|| EventLogError::EmptyAppend(stream.clone()))
    }

    fn read_stream(&self, stream: &StreamId) -> Result<Vec<RecordedEvent>, EventLogError> {
        let state = self.state.read().map_err(|_| poisoned())?;

        Ok(state
            .streams
            .get(stream)
            .map(|idx| idx.iter().map(|&i| state.all[i].clone()).collect())
            .unwrap_or_default())
    }

    fn subscribe_to_all(&self, from: Option<u64>) -> Result<Subscription<RecordedEvent>, EventLogError> {
        let (tx, rx) = mpsc::channel();

        // Backlog and registration happen under one write lock so no append
        // can slip in between them.
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let start = from.map(|p| p as usize + 1).unwrap_or(0);
        for event in state.all.iter().skip(start) {
            // The receiver is still in hand, so this cannot fail.
            let _ = tx.send(event.clone());
        }
        state.subscribers.push(tx);

        Ok(Subscription::new(rx))
    }
}
