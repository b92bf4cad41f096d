//! Runs one shopping cart through its whole lifecycle and prints the
//! projected read model.
//!
//! The event log is in memory. With `DATABASE_URL` set, the read model and
//! checkpoints go to Postgres; otherwise they stay in memory too.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use sqlx::PgPool;

use cartledger_cart::{CartCommand, ClientId, ProductItem};
use cartledger_core::AggregateId;
use cartledger_infra::config::ProjectorConfig;
use cartledger_infra::event_log::InMemoryEventLog;
use cartledger_infra::projections::shopping_cart_details::TABLE;
use cartledger_infra::projections::{
    CheckpointStore, InMemoryCheckpointStore, PostgresCheckpointStore, Projector, ShoppingCartDetails,
};
use cartledger_infra::read_model::{DocumentFilter, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
use cartledger_infra::workers::ProjectorWorker;
use cartledger_infra::{CartService, schema};

const T_SHIRT: &str = "t-shirt-123";
const SHOES: &str = "shoes-87";

fn main() -> anyhow::Result<()> {
    cartledger_observability::init();

    let config = ProjectorConfig::from_env().context("invalid projector configuration")?;
    let log = Arc::new(InMemoryEventLog::new());

    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?;
            let pool = runtime
                .block_on(PgPool::connect(&url))
                .context("failed to connect to Postgres")?;
            schema::ensure_schema(&pool, runtime.handle())?;

            let documents = Arc::new(PostgresDocumentStore::<ShoppingCartDetails>::new(
                pool.clone(),
                runtime.handle().clone(),
                TABLE,
            ));
            let checkpoints = Arc::new(PostgresCheckpointStore::new(pool, runtime.handle().clone()));
            tracing::info!(table = TABLE, "using Postgres read model");
            run(log, documents, checkpoints, config)
        }
        Err(_) => run(
            log,
            Arc::new(InMemoryDocumentStore::<ShoppingCartDetails>::new()),
            Arc::new(InMemoryCheckpointStore::new()),
            config,
        ),
    }
}

fn run<D, C>(log: Arc<InMemoryEventLog>, documents: Arc<D>, checkpoints: Arc<C>, config: ProjectorConfig) -> anyhow::Result<()>
where
    D: DocumentStore<ShoppingCartDetails> + 'static,
    C: CheckpointStore + 'static,
{
    // The log starts empty on every run, so any stored position is stale.
    checkpoints.clear(&config.subscription_name)?;

    let timeout = config.poll_interval * 40;
    let projector = Projector::new(log.clone(), documents.clone(), checkpoints, config);
    let worker = ProjectorWorker::spawn("shopping-cart-details", projector)?;

    let service = CartService::new(log);
    let opened = service.open_cart(ClientId::new("client-54987"))?;
    let id = opened.id;
    let mut revision = opened.next_expected_revision;

    for command in [
        CartCommand::add_item(ProductItem::new(T_SHIRT, 12)),
        CartCommand::add_item(ProductItem::new(T_SHIRT, 8)),
        CartCommand::add_item(ProductItem::new(SHOES, 1)),
        CartCommand::remove_item(ProductItem::new(T_SHIRT, 2)),
        CartCommand::confirm(),
    ] {
        revision = service.update_cart(id, &command, revision)?.next_expected_revision;
    }

    // A stale writer is turned away.
    if let Err(err) = service.update_cart(id, &CartCommand::add_item(ProductItem::new(SHOES, 1)), 0) {
        tracing::info!(error = %err, "stale update rejected");
    }
    // So is any change to a confirmed cart.
    if let Err(err) = service.update_cart(id, &CartCommand::add_item(ProductItem::new(SHOES, 1)), revision) {
        tracing::info!(error = %err, "update of confirmed cart rejected");
    }

    let cart = service.get_cart(id)?;
    tracing::info!(cart_id = %id, status = %cart.status(), revision, "cart rebuilt from its stream");

    let details = wait_for_projection(documents.as_ref(), id, revision, timeout)?;
    worker.shutdown()?;

    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}

fn wait_for_projection<D>(documents: &D, id: AggregateId, revision: u64, timeout: Duration) -> anyhow::Result<ShoppingCartDetails>
where
    D: DocumentStore<ShoppingCartDetails>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(details) = documents.find_one(&DocumentFilter::at_least(id, revision))? {
            return Ok(details);
        }
        if Instant::now() >= deadline {
            bail!("read model for cart {id} did not reach revision {revision} within {timeout:?}");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
