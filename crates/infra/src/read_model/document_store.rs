use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use cartledger_core::AggregateId;

use super::StoreError;

/// A read-model document: one per aggregate, stamped with the stream
/// revision it reflects.
pub trait Document: Clone + Send + Sync + 'static {
    fn id(&self) -> AggregateId;
    fn revision(&self) -> u64;
}

/// Constraint on a document's revision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RevisionFilter {
    Any,
    AtLeast(u64),
    Exactly(u64),
}

impl RevisionFilter {
    pub fn matches(self, revision: u64) -> bool {
        match self {
            RevisionFilter::Any => true,
            RevisionFilter::AtLeast(min) => revision >= min,
            RevisionFilter::Exactly(expected) => revision == expected,
        }
    }
}

/// Selects at most one document by id and revision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    pub id: AggregateId,
    pub revision: RevisionFilter,
}

impl DocumentFilter {
    pub fn by_id(id: AggregateId) -> Self {
        Self {
            id,
            revision: RevisionFilter::Any,
        }
    }

    pub fn at_least(id: AggregateId, revision: u64) -> Self {
        Self {
            id,
            revision: RevisionFilter::AtLeast(revision),
        }
    }

    pub fn exactly(id: AggregateId, revision: u64) -> Self {
        Self {
            id,
            revision: RevisionFilter::Exactly(revision),
        }
    }

    pub fn matches<D: Document>(&self, document: &D) -> bool {
        document.id() == self.id && self.revision.matches(document.revision())
    }
}

/// Document collection abstraction for read models.
pub trait DocumentStore<D>: Send + Sync {
    fn find_one(&self, filter: &DocumentFilter) -> Result<Option<D>, StoreError>;

    /// Insert a new document; fails with [`StoreError::DuplicateKey`] if one
    /// with the same id exists.
    fn insert_one(&self, document: D) -> Result<(), StoreError>;

    /// Replace the document matching `filter`; returns the number matched (0 or 1).
    fn update_one(&self, filter: &DocumentFilter, document: D) -> Result<u64, StoreError>;
}

impl<D, S> DocumentStore<D> for Arc<S>
where
    S: DocumentStore<D> + ?Sized,
{
    fn find_one(&self, filter: &DocumentFilter) -> Result<Option<D>, StoreError> {
        (**self).find_one(filter)
    }

    fn insert_one(&self, document: D) -> Result<(), StoreError> {
        (**self).insert_one(document)
    }

    fn update_one(&self, filter: &DocumentFilter, document: D) -> Result<u64, StoreError> {
        (**self).update_one(filter, document)
    }
}

/// In-memory document store for tests/dev.
#[derive(Debug)]
pub struct InMemoryDocumentStore<D> {
    inner: RwLock<HashMap<AggregateId, D>>,
}

impl<D> InMemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<D> Default for InMemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Document> InMemoryDocumentStore<D> {
    /// Document by id regardless of revision.
    pub fn get(&self, id: AggregateId) -> Option<D> {
        self.inner.read().ok()?.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl<D: Document> DocumentStore<D> for InMemoryDocumentStore<D> {
    fn find_one(&self, filter: &DocumentFilter) -> Result<Option<D>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&filter.id).filter(|d| filter.matches(*d)).cloned())
    }

    fn insert_one(&self, document: D) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = document.id();
        if map.contains_key(&id) {
            return Err(StoreError::DuplicateKey(id.to_string()));
        }
        map.insert(id, document);
        Ok(())
    }

    fn update_one(&self, filter: &DocumentFilter, document: D) -> Result<u64, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(&filter.id) {
            Some(existing) if filter.matches(&*existing) => {
                *existing = document;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
