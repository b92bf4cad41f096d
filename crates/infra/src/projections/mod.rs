//! Projection implementations (read model builders).
//!
//! Projections consume the `$all` feed and build query-optimized read models.
//! All projections are:
//! - **Rebuildable**: Can be reconstructed from the event log
//! - **Checkpointed**: Resume strictly after the last handled position
//! - **Idempotent**: Safe for at-least-once delivery

pub mod checkpoint_store;
pub mod projector;
pub mod shopping_cart_details;

pub use checkpoint_store::{CheckpointStore, InMemoryCheckpointStore, PostgresCheckpointStore};
pub use projector::{CatchUpReport, Outcome, ProjectionError, Projector, SkipReason};
pub use shopping_cart_details::ShoppingCartDetails;
