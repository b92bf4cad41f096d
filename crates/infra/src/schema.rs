//! Postgres schema for the read model and checkpoints.

use sqlx::PgPool;
use tokio::runtime::Handle;

use crate::read_model::StoreError;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_shopping_cart_details",
        include_str!("../migrations/0001_shopping_cart_details.sql"),
    ),
    (
        "0002_subscription_checkpoints",
        include_str!("../migrations/0002_subscription_checkpoints.sql"),
    ),
];

/// Create missing tables. Every statement is `IF NOT EXISTS`, so this is safe
/// to run on each start.
pub fn ensure_schema(pool: &PgPool, handle: &Handle) -> Result<(), StoreError> {
    handle.block_on(async {
        for (name, sql) in MIGRATIONS {
            sqlx::raw_sql(sql).execute(pool).await?;
            tracing::debug!(migration = name, "schema applied");
        }
        Ok::<_, StoreError>(())
    })
}
