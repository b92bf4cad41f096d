//! Subscription handle for ordered event feeds.
//!
//! A subscription is the consuming end of a feed produced by an event log.
//! Delivery is **at-least-once**: the same event may arrive more than once
//! (redelivery after a restart, a replay overlapping the live tail), so
//! consumers must be idempotent. Within one subscription, messages arrive in
//! the order the producer sent them.

use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to an event feed.
///
/// ## Usage Pattern
///
/// ```ignore
/// let subscription = log.subscribe_to_all(checkpoint)?;
///
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(250)) {
///         Ok(event) => process(event)?,
///         Err(RecvTimeoutError::Timeout) => continue,  // Check for shutdown
///         Err(RecvTimeoutError::Disconnected) => break,  // Log closed
///     }
/// }
/// ```
///
/// Subscriptions are designed for single-threaded consumption, which is what
/// keeps a checkpoint meaningful: one consumer, one position.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
