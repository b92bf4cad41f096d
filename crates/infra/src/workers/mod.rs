//! Background workers.

pub mod projector_worker;

pub use projector_worker::{ProjectorWorker, WorkerHandle};
