//! Subscription checkpoint persistence.
//!
//! A checkpoint is the global position of the last event a named
//! subscription has fully handled. This enables:
//! - Resume after crash (the feed restarts strictly after the checkpoint)
//! - Deterministic rebuilds (drop the checkpoint and replay from the start)
//!
//! Saving after every event keeps redelivery after a crash to at most one
//! event; the projection's revision guards absorb it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;

use crate::read_model::StoreError;

pub trait CheckpointStore: Send + Sync {
    /// Last handled global position of `subscription`, if any.
    fn load(&self, subscription: &str) -> Result<Option<u64>, StoreError>;

    fn save(&self, subscription: &str, position: u64) -> Result<(), StoreError>;

    /// Forget the checkpoint (rebuild from the start).
    fn clear(&self, subscription: &str) -> Result<(), StoreError>;
}

impl<S> CheckpointStore for Arc<S>
where
    S: CheckpointStore + ?Sized,
{
    fn load(&self, subscription: &str) -> Result<Option<u64>, StoreError> {
        (**self).load(subscription)
    }

    fn save(&self, subscription: &str, position: u64) -> Result<(), StoreError> {
        (**self).save(subscription, position)
    }

    fn clear(&self, subscription: &str) -> Result<(), StoreError> {
        (**self).clear(subscription)
    }
}

/// In-memory checkpoint store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    inner: RwLock<HashMap<String, u64>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, subscription: &str) -> Result<Option<u64>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(subscription).copied())
    }

    fn save(&self, subscription: &str, position: u64) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(subscription.to_string(), position);
        Ok(())
    }

    fn clear(&self, subscription: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(subscription);
        Ok(())
    }
}

/// Postgres-backed checkpoint store (`subscription_checkpoints` table).
pub struct PostgresCheckpointStore {
    pool: Arc<PgPool>,
    handle: Handle,
}

impl PostgresCheckpointStore {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self {
            pool: Arc::new(pool),
            handle,
        }
    }
}

impl core::fmt::Debug for PostgresCheckpointStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresCheckpointStore").finish_non_exhaustive()
    }
}

impl CheckpointStore for PostgresCheckpointStore {
    #[instrument(skip(self), err)]
    fn load(&self, subscription: &str) -> Result<Option<u64>, StoreError> {
        let pool = self.pool.clone();
        let subscription = subscription.to_string();

        let row = self.handle.block_on(async move {
            sqlx::query(
                r#"
                SELECT position
                FROM subscription_checkpoints
                WHERE subscription_name = $1
                "#,
            )
            .bind(&subscription)
            .fetch_optional(&*pool)
            .await
        })?;

        match row {
            Some(row) => Ok(Some(row.try_get::<i64, _>("position")? as u64)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    fn save(&self, subscription: &str, position: u64) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let subscription = subscription.to_string();

        self.handle.block_on(async move {
            sqlx::query(
                r#"
                INSERT INTO subscription_checkpoints (subscription_name, position)
                VALUES ($1, $2)
                ON CONFLICT (subscription_name)
                DO UPDATE SET
                    position = EXCLUDED.position,
                    updated_at = NOW()
                "#,
            )
            .bind(&subscription)
            .bind(position as i64)
            .execute(&*pool)
            .await
        })?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    fn clear(&self, subscription: &str) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let subscription = subscription.to_string();

        self.handle.block_on(async move {
            sqlx::query("DELETE FROM subscription_checkpoints WHERE subscription_name = $1")
                .bind(&subscription)
                .execute(&*pool)
                .await
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_are_kept_per_subscription() {
        let store = InMemoryCheckpointStore::new();
        assert_eq!(store.load("a").unwrap(), None);

        store.save("a", 3).unwrap();
        store.save("b", 7).unwrap();
        store.save("a", 4).unwrap();

        assert_eq!(store.load("a").unwrap(), Some(4));
        assert_eq!(store.load("b").unwrap(), Some(7));

        store.clear("a").unwrap();
        assert_eq!(store.load("a").unwrap(), None);
    }
}
