//! Post-commit event dispatch.
//!
//! The coordinator publishes committed events on a bus; the dispatcher owns
//! the subscriber workers draining that bus. Every subscriber runs on its own
//! thread, so a slow or failing subscriber never holds up the request that
//! produced the event.

pub mod worker;

pub use worker::{DispatchError, SubscriberWorker, WorkerHandle};

use tracing::info;

use ordermgmt_events::{EventBus, EventHandler};

/// Delivers committed events to zero or more subscribers.
#[derive(Debug)]
pub struct EventDispatcher<B> {
    bus: B,
    workers: Vec<WorkerHandle>,
}

impl<B> EventDispatcher<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            workers: Vec::new(),
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Names of the running subscriber workers, in registration order.
    pub fn subscribers(&self) -> Vec<&'static str> {
        self.workers.iter().map(WorkerHandle::name).collect()
    }

    /// Stop every worker, letting in-flight handlers finish.
    pub fn shutdown(self) {
        for worker in self.workers {
            let name = worker.name();
            worker.shutdown();
            info!(worker = name, "subscriber stopped");
        }
    }

    /// Start a worker for `handler`. Only events published after this call
    /// reach it.
    pub fn subscribe<M, H>(&mut self, handler: H) -> Result<(), DispatchError>
    where
        M: Send + 'static,
        B: EventBus<M>,
        H: EventHandler<M>,
    {
        let worker = SubscriberWorker::spawn(&self.bus, handler)?;
        info!(worker = worker.name(), "subscriber registered");
        self.workers.push(worker);
        Ok(())
    }
}
