//! Read-model document storage.
//!
//! Documents are keyed by aggregate id and carry the stream revision they
//! reflect. Writers use revision-guarded filters so a stale or duplicate
//! update never overwrites newer state.

pub mod document_store;
pub mod postgres;

pub use document_store::{Document, DocumentFilter, DocumentStore, InMemoryDocumentStore, RevisionFilter};
pub use postgres::PostgresDocumentStore;

use thiserror::Error;

/// Storage failure shared by document and checkpoint stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document '{0}' already exists")]
    DuplicateKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }
}
