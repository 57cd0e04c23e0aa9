//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes committed events to subscribers. It is the post-commit
//! hook of the coordinator: a publish only enqueues the message on each
//! subscriber's channel, and subscribers drain their channel on their own
//! worker thread. Publishing therefore never waits for a subscriber.
//!
//! The bus stores nothing. Messages published before a subscription exists are
//! not replayed to it.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription receives its own copy of every message published after it
/// was created (broadcast semantics), in publication order.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(250)) {
///         Ok(envelope) => handle(envelope)?,
///         Err(RecvTimeoutError::Timeout) => continue,  // check for shutdown
///         Err(RecvTimeoutError::Disconnected) => break, // bus dropped
///     }
/// }
/// ```
///
/// Subscriptions are meant to be consumed by a single thread.
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

/// Pub/sub contract used by the coordinator to hand off committed events.
///
/// `publish()` may fail (e.g. a poisoned lock). By the time it is called the
/// unit of work has already committed, so callers log the failure instead of
/// rolling anything back.
///
/// Implementations must be `Send + Sync`: request threads publish concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
