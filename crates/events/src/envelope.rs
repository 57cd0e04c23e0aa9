use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ordermgmt_core::EventId;

/// Envelope for a committed event, carrying stream metadata.
///
/// This is the unit handed to the bus after the owning unit of work commits.
///
/// Notes:
/// - `aggregate_id` is the raw identifier of the aggregate that recorded the event.
/// - `sequence_number` is the aggregate revision produced by the commit, so it is
///   monotonically increasing per aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: EventId,

    aggregate_id: Uuid,
    aggregate_type: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: EventId,
        aggregate_id: Uuid,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
