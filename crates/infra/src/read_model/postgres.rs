//! Postgres-backed document store.
//!
//! Documents live in a table with the shape
//! `(id UUID PRIMARY KEY, revision BIGINT, document JSONB)` (see
//! `migrations/`). The projector runs on a plain thread, so every call blocks
//! on the runtime handle the store was built with.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;

use super::document_store::{Document, DocumentFilter, DocumentStore, RevisionFilter};
use super::StoreError;

/// Document store over one Postgres table.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is thread-safe. Calls must come from
/// outside the runtime's worker threads (`Handle::block_on` panics inside an
/// async context).
pub struct PostgresDocumentStore<D> {
    pool: Arc<PgPool>,
    handle: Handle,
    table: &'static str,
    _document: PhantomData<fn() -> D>,
}

impl<D> PostgresDocumentStore<D> {
    /// `table` must be a trusted identifier; it is interpolated into SQL.
    pub fn new(pool: PgPool, handle: Handle, table: &'static str) -> Self {
        Self {
            pool: Arc::new(pool),
            handle,
            table,
            _document: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }
}

impl<D> core::fmt::Debug for PostgresDocumentStore<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresDocumentStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// SQL suffix for a revision filter, using placeholder `$n`.
fn revision_clause(filter: RevisionFilter, n: usize) -> (String, Option<i64>) {
    match filter {
        RevisionFilter::Any => (String::new(), None),
        RevisionFilter::AtLeast(r) => (format!(" AND revision >= ${n}"), Some(r as i64)),
        RevisionFilter::Exactly(r) => (format!(" AND revision = ${n}"), Some(r as i64)),
    }
}

fn map_insert_error(id: String, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey(id),
        _ => StoreError::Database(err),
    }
}

impl<D> DocumentStore<D> for PostgresDocumentStore<D>
where
    D: Document + Serialize + DeserializeOwned,
{
    #[instrument(skip_all, fields(table = self.table, id = %filter.id), err)]
    fn find_one(&self, filter: &DocumentFilter) -> Result<Option<D>, StoreError> {
        let (clause, revision) = revision_clause(filter.revision, 2);
        let sql = format!("SELECT document FROM {} WHERE id = $1{clause}", self.table);
        let pool = self.pool.clone();
        let id = *filter.id.as_uuid();

        let row = self.handle.block_on(async move {
            let mut query = sqlx::query(&sql).bind(id);
            if let Some(revision) = revision {
                query = query.bind(revision);
            }
            query.fetch_optional(&*pool).await
        })?;

        match row {
            Some(row) => {
                let Json(document) = row.try_get::<Json<D>, _>("document")?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(table = self.table, id = %document.id(), revision = document.revision()), err)]
    fn insert_one(&self, document: D) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, revision, document) VALUES ($1, $2, $3)",
            self.table
        );
        let pool = self.pool.clone();
        let id = document.id();

        self.handle
            .block_on(async move {
                sqlx::query(&sql)
                    .bind(*id.as_uuid())
                    .bind(document.revision() as i64)
                    .bind(Json(&document))
                    .execute(&*pool)
                    .await
            })
            .map_err(|e| map_insert_error(id.to_string(), e))?;

        tracing::debug!(table = self.table, id = %id, "inserted document");
        Ok(())
    }

    #[instrument(skip_all, fields(table = self.table, id = %filter.id), err)]
    fn update_one(&self, filter: &DocumentFilter, document: D) -> Result<u64, StoreError> {
        let (clause, revision) = revision_clause(filter.revision, 4);
        let sql = format!(
            "UPDATE {} SET revision = $2, document = $3, updated_at = NOW() WHERE id = $1{clause}",
            self.table
        );
        let pool = self.pool.clone();
        let id = *filter.id.as_uuid();

        let result = self.handle.block_on(async move {
            let mut query = sqlx::query(&sql)
                .bind(id)
                .bind(document.revision() as i64)
                .bind(Json(&document));
            if let Some(revision) = revision {
                query = query.bind(revision);
            }
            query.execute(&*pool).await
        })?;

        Ok(result.rows_affected())
    }
}
