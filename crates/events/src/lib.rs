//! Domain events: recording, envelopes and in-process distribution.
//!
//! Aggregates record events into an [`EventLog`] while they transition. The
//! coordinating layer drains the log once the surrounding unit of work is
//! durable and publishes [`EventEnvelope`]s on an [`EventBus`]; subscribers
//! implement [`EventHandler`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod log;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::EventHandler;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use log::EventLog;
