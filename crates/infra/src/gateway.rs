//! Command execution pipeline with optimistic concurrency.
//!
//! ```text
//! Command
//!   ↓
//! 1. Read the stream from the event log
//!   ↓
//! 2. Decode and replay it into the current state
//!   ↓
//! 3. Decide (pure handler, exactly one event or a business error)
//!   ↓
//! 4. Append with the caller's expected revision
//! ```
//!
//! The caller's revision is authoritative. The gateway never substitutes the
//! revision it just read, so a client acting on a stale view gets a
//! `VersionConflict` instead of silently overwriting someone else's change.

use thiserror::Error;
use tracing::instrument;

use cartledger_core::{Aggregate, ExpectedRevision, FoldError, replay};
use cartledger_events::{DecodeError, Event, RecordedEvent, StreamId};

use crate::event_log::{AppendResult, EventLog, EventLogError};

#[derive(Debug, Error)]
pub enum GatewayError<E> {
    /// The stream has no events.
    #[error("stream '{0}' was not found")]
    StreamNotFound(StreamId),

    /// The domain refused the command (deterministic, do not retry).
    #[error("command rejected: {0}")]
    Rejected(E),

    /// A stored event could not be decoded; the stream cannot be replayed.
    #[error("stream '{stream}' could not be decoded: {source}")]
    Decode {
        stream: StreamId,
        #[source]
        source: DecodeError,
    },

    /// The stream moved past the caller's expected revision.
    #[error("version conflict on '{stream}': expected {expected}, actual {actual:?}")]
    VersionConflict {
        stream: StreamId,
        expected: ExpectedRevision,
        actual: Option<u64>,
    },

    #[error(transparent)]
    Log(EventLogError),
}

impl<E> GatewayError<E> {
    /// Only a version conflict can succeed on a fresh read-decide-write cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::VersionConflict { .. })
    }

    pub fn rejection(&self) -> Option<&E> {
        match self {
            GatewayError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<EventLogError> for GatewayError<E> {
    fn from(value: EventLogError) -> Self {
        match value {
            EventLogError::VersionConflict {
                stream,
                expected,
                actual,
            } => GatewayError::VersionConflict {
                stream,
                expected,
                actual,
            },
            other => GatewayError::Log(other),
        }
    }
}

/// Replayed state of a stream together with its last revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<A> {
    pub state: A,
    pub revision: u64,
}

/// Reusable command execution engine over any [`EventLog`].
#[derive(Debug)]
pub struct CommandGateway<L> {
    log: L,
}

impl<L> CommandGateway<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn into_inner(self) -> L {
        self.log
    }
}

impl<L: EventLog> CommandGateway<L> {
    /// Start a stream with its first event.
    ///
    /// Fails with `VersionConflict` if the stream already exists.
    pub fn create<A>(&self, stream: &StreamId, event: &A::Event) -> Result<AppendResult, GatewayError<A::Error>>
    where
        A: Aggregate,
        A::Event: Event,
    {
        self.append_one(stream, event, ExpectedRevision::NoStream)
    }

    /// Read and replay a stream.
    #[instrument(level = "debug", skip_all, fields(stream = %stream))]
    pub fn load<A>(&self, stream: &StreamId) -> Result<Loaded<A>, GatewayError<A::Error>>
    where
        A: Aggregate,
        A::Event: Event,
    {
        let history = self.log.read_stream(stream)?;
        let revision = match history.last() {
            Some(last) => last.stream_revision,
            None => return Err(GatewayError::StreamNotFound(stream.clone())),
        };

        let events = decode_history::<A::Event, A::Error>(stream, &history)?;
        let state = replay::<A>(&events).map_err(|e| match e {
            FoldError::StreamNotFound => GatewayError::StreamNotFound(stream.clone()),
            FoldError::Transition(e) => GatewayError::Rejected(e),
        })?;

        tracing::debug!(stream = %stream, revision, events = events.len(), "replayed stream");
        Ok(Loaded { state, revision })
    }

    /// Read, replay, decide and append exactly one event at `expected_revision`.
    #[instrument(level = "debug", skip_all, fields(stream = %stream, expected_revision = expected_revision))]
    pub fn update<A, F>(
        &self,
        stream: &StreamId,
        expected_revision: u64,
        decide: F,
    ) -> Result<AppendResult, GatewayError<A::Error>>
    where
        A: Aggregate,
        A::Event: Event,
        F: FnOnce(&A) -> Result<A::Event, A::Error>,
    {
        let loaded = self.load::<A>(stream)?;
        let event = decide(&loaded.state).map_err(GatewayError::Rejected)?;
        self.append_one(stream, &event, ExpectedRevision::Exact(expected_revision))
    }

    fn append_one<Ev, Err>(
        &self,
        stream: &StreamId,
        event: &Ev,
        expected: ExpectedRevision,
    ) -> Result<AppendResult, GatewayError<Err>>
    where
        Ev: Event,
    {
        let data = event
            .to_data()
            .map_err(|e| GatewayError::Log(EventLogError::Encode(e.to_string())))?;

        match self.log.append(stream, vec![data], expected) {
            Ok(result) => {
                tracing::info!(
                    stream = %stream,
                    event_type = event.event_type(),
                    revision = result.next_expected_revision,
                    position = result.global_position,
                    "appended event"
                );
                Ok(result)
            }
            Err(err) => {
                if err.is_version_conflict() {
                    tracing::warn!(stream = %stream, expected = %expected, error = %err, "append rejected");
                } else {
                    tracing::error!(stream = %stream, error = %err, "append failed");
                }
                Err(err.into())
            }
        }
    }
}

fn decode_history<Ev, Err>(stream: &StreamId, history: &[RecordedEvent]) -> Result<Vec<Ev>, GatewayError<Err>>
where
    Ev: Event,
{
    history
        .iter()
        .map(|recorded| {
            recorded.decode::<Ev>().map_err(|source| GatewayError::Decode {
                stream: stream.clone(),
                source,
            })
        })
        .collect()
}
