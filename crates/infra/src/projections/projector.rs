//! Checkpointed, idempotent projector for `ShoppingCartDetails`.
//!
//! Per event from the `$all` feed:
//! 1. skip events of other stream categories and unknown event types
//! 2. `Opened` inserts the document; an existing document means the event
//!    was already applied
//! 3. any other event reads the document at `revision >= prior`
//!    (`prior = stream_revision - 1`), skips if it is already past `prior`,
//!    otherwise replaces it with a `revision == prior` guard
//! 4. the checkpoint is saved once the event is handled, applied or skipped
//!
//! A missing document or a guarded update that matched nothing is a race with
//! an earlier event still in flight, retried under the configured policy.
//! Exhausting the retries is fatal.

use std::sync::mpsc::TryRecvError;

use thiserror::Error;

use cartledger_cart::{CartError, STREAM_CATEGORY, ShoppingCartEvent, ShoppingCartOpened};
use cartledger_core::AggregateId;
use cartledger_events::{DecodeError, RecordedEvent, Subscription};

use crate::config::ProjectorConfig;
use crate::event_log::{EventLog, EventLogError};
use crate::projections::checkpoint_store::CheckpointStore;
use crate::projections::shopping_cart_details::ShoppingCartDetails;
use crate::read_model::{DocumentFilter, DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("event at position {position} could not be decoded: {source}")]
    Decode {
        position: u64,
        #[source]
        source: DecodeError,
    },

    #[error("event at position {position} does not apply to its document: {source}")]
    Domain {
        position: u64,
        #[source]
        source: CartError,
    },

    #[error("document '{id}' at revision >= {revision} not found")]
    DocumentNotFound { id: AggregateId, revision: u64 },

    #[error("document '{id}' was not at revision {expected_revision} for update")]
    UpdateConflict { id: AggregateId, expected_revision: u64 },

    #[error("document store failed: {0}")]
    Store(#[from] StoreError),

    #[error("checkpoint store failed: {0}")]
    Checkpoint(#[source] StoreError),

    #[error("subscription failed: {0}")]
    Subscription(#[source] EventLogError),

    #[error("projector worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The stream belongs to another category.
    OtherStream,
    /// The event type is not known to this projection.
    UnknownEventType,
    /// The document already reflects this event (redelivery).
    AlreadyApplied,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

/// Counts from one [`Projector::catch_up`] run.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CatchUpReport {
    pub applied: usize,
    pub skipped: usize,
    pub last_position: Option<u64>,
}

impl CatchUpReport {
    pub fn handled(&self) -> usize {
        self.applied + self.skipped
    }
}

pub struct Projector<L, D, C> {
    log: L,
    documents: D,
    checkpoints: C,
    config: ProjectorConfig,
}

impl<L, D, C> core::fmt::Debug for Projector<L, D, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Projector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<L, D, C> Projector<L, D, C>
where
    L: EventLog,
    D: DocumentStore<ShoppingCartDetails>,
    C: CheckpointStore,
{
    pub fn new(log: L, documents: D, checkpoints: C, config: ProjectorConfig) -> Self {
        Self {
            log,
            documents,
            checkpoints,
            config,
        }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn checkpoints(&self) -> &C {
        &self.checkpoints
    }

    /// Last handled global position of this subscription.
    pub fn checkpoint(&self) -> Result<Option<u64>, ProjectionError> {
        self.checkpoints
            .load(&self.config.subscription_name)
            .map_err(ProjectionError::Checkpoint)
    }

    /// Subscribe to the feed strictly after the saved checkpoint.
    pub fn subscribe(&self) -> Result<Subscription<RecordedEvent>, ProjectionError> {
        let from = self.checkpoint()?;
        tracing::info!(
            subscription = %self.config.subscription_name,
            from = ?from,
            "subscribing to all"
        );
        self.log.subscribe_to_all(from).map_err(ProjectionError::Subscription)
    }

    /// Handle every event currently available, then return.
    pub fn catch_up(&self) -> Result<CatchUpReport, ProjectionError> {
        let subscription = self.subscribe()?;
        let mut report = CatchUpReport::default();

        loop {
            match subscription.try_recv() {
                Ok(event) => {
                    match self.handle(&event)? {
                        Outcome::Applied => report.applied += 1,
                        Outcome::Skipped(_) => report.skipped += 1,
                    }
                    report.last_position = Some(event.global_position);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        tracing::info!(
            subscription = %self.config.subscription_name,
            applied = report.applied,
            skipped = report.skipped,
            "caught up"
        );
        Ok(report)
    }

    /// Project one event and advance the checkpoint past it.
    pub fn handle(&self, event: &RecordedEvent) -> Result<Outcome, ProjectionError> {
        let outcome = match self.project(event) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    stream = %event.stream_id,
                    revision = event.stream_revision,
                    position = event.global_position,
                    error = %err,
                    "projection failed"
                );
                return Err(err);
            }
        };

        self.checkpoints
            .save(&self.config.subscription_name, event.global_position)
            .map_err(ProjectionError::Checkpoint)?;

        tracing::debug!(
            stream = %event.stream_id,
            revision = event.stream_revision,
            position = event.global_position,
            outcome = ?outcome,
            "projected event"
        );
        Ok(outcome)
    }

    /// Project one event without touching the checkpoint.
    pub fn project(&self, event: &RecordedEvent) -> Result<Outcome, ProjectionError> {
        if event.stream_id.category() != STREAM_CATEGORY {
            return Ok(Outcome::Skipped(SkipReason::OtherStream));
        }

        let decoded = match event.decode::<ShoppingCartEvent>() {
            Ok(decoded) => decoded,
            Err(err) if err.is_unknown_type() => {
                tracing::warn!(
                    stream = %event.stream_id,
                    event_type = %event.event_type,
                    "skipping unknown event type"
                );
                return Ok(Outcome::Skipped(SkipReason::UnknownEventType));
            }
            Err(source) => {
                return Err(ProjectionError::Decode {
                    position: event.global_position,
                    source,
                });
            }
        };

        match &decoded {
            ShoppingCartEvent::Opened(opened) => self.project_opened(opened, event.stream_revision),
            change => self.project_change(change, event.stream_revision, event.global_position),
        }
    }

    fn project_opened(&self, event: &ShoppingCartOpened, revision: u64) -> Result<Outcome, ProjectionError> {
        let id = event.shopping_cart_id;
        if self.documents.find_one(&DocumentFilter::by_id(id))?.is_some() {
            return Ok(Outcome::Skipped(SkipReason::AlreadyApplied));
        }

        match self.documents.insert_one(ShoppingCartDetails::opened(event, revision)) {
            Ok(()) => Ok(Outcome::Applied),
            // Lost a race with a concurrent delivery of the same event.
            Err(err) if err.is_duplicate_key() => Ok(Outcome::Skipped(SkipReason::AlreadyApplied)),
            Err(err) => Err(err.into()),
        }
    }

    fn project_change(
        &self,
        event: &ShoppingCartEvent,
        revision: u64,
        position: u64,
    ) -> Result<Outcome, ProjectionError> {
        let id = event.shopping_cart_id();
        let Some(prior) = revision.checked_sub(1) else {
            return Err(ProjectionError::Domain {
                position,
                source: CartError::CartNotFound,
            });
        };

        let retry = &self.config.retry;
        let outcome = retry.run("update shopping cart details", |_| -> Result<Option<Outcome>, ProjectionError> {
            let current = retry
                .run("find shopping cart details", |_| {
                    self.documents.find_one(&DocumentFilter::at_least(id, prior))
                })?
                .ok_or(ProjectionError::DocumentNotFound { id, revision: prior })?;

            if current.revision > prior {
                return Ok(Some(Outcome::Skipped(SkipReason::AlreadyApplied)));
            }

            let next = current
                .apply(event, revision)
                .map_err(|source| ProjectionError::Domain { position, source })?;
            let matched = self.documents.update_one(&DocumentFilter::exactly(id, prior), next)?;
            Ok((matched > 0).then_some(Outcome::Applied))
        })?;

        outcome.ok_or(ProjectionError::UpdateConflict {
            id,
            expected_revision: prior,
        })
    }
}
