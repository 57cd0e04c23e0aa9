use chrono::{DateTime, Utc};

use ordermgmt_core::EventId;

/// A domain event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - recorded at most once per state transition
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Unique identifier of this event instance.
    fn event_id(&self) -> EventId;

    /// Stable event name/type identifier (e.g. "orders.order.paid").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
