use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use cartledger_events::{RecordedEvent, Subscription};

use crate::event_log::EventLog;
use crate::projections::checkpoint_store::CheckpointStore;
use crate::projections::projector::{ProjectionError, Projector};
use crate::projections::shopping_cart_details::ShoppingCartDetails;
use crate::read_model::DocumentStore;

/// Handle to control and join a background projector.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<Result<(), ProjectionError>>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker's final result.
    pub fn shutdown(self) -> Result<(), ProjectionError> {
        let _ = self.shutdown.send(());
        self.join()
    }

    /// Wait for the worker to stop on its own (fatal error or closed feed).
    pub fn join(mut self) -> Result<(), ProjectionError> {
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| ProjectionError::Worker("projector thread panicked".to_string()))?,
            None => Ok(()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }
}

/// Runs a [`Projector`] on a named thread.
///
/// - Subscribes from the saved checkpoint before the thread starts, so
///   subscription failures surface to the caller
/// - Handles events one at a time (single consumer per subscription)
/// - Stops on shutdown, on a closed feed, or on the first fatal error
#[derive(Debug)]
pub struct ProjectorWorker;

impl ProjectorWorker {
    pub fn spawn<L, D, C>(name: &str, projector: Projector<L, D, C>) -> Result<WorkerHandle, ProjectionError>
    where
        L: EventLog + 'static,
        D: DocumentStore<ShoppingCartDetails> + 'static,
        C: CheckpointStore + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let subscription = projector.subscribe()?;
        let worker = name.to_string();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(&worker, &projector, subscription, shutdown_rx))
            .map_err(|e| ProjectionError::Worker(format!("failed to spawn projector thread: {e}")))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<L, D, C>(
    name: &str,
    projector: &Projector<L, D, C>,
    subscription: Subscription<RecordedEvent>,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<(), ProjectionError>
where
    L: EventLog,
    D: DocumentStore<ShoppingCartDetails>,
    C: CheckpointStore,
{
    let tick = projector.config().poll_interval;
    tracing::info!(worker = name, subscription = %projector.config().subscription_name, "projector started");

    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match subscription.recv_timeout(tick) {
            Ok(event) => {
                if let Err(err) = projector.handle(&event) {
                    tracing::error!(worker = name, error = %err, "projector stopped on fatal error");
                    return Err(err);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!(worker = name, "projector stopped");
    Ok(())
}
