//! Per-aggregate buffer of recorded, not-yet-published events.

/// Append-only buffer of events recorded by one aggregate.
///
/// Events stay pending until [`EventLog::drain`] hands them out. Draining
/// returns and empties the buffer in one step, so a batch can never be
/// handed out twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog<E> {
    pending: Vec<E>,
}

impl<E> EventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the pending buffer.
    pub fn record(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Events recorded since the last drain, oldest first.
    pub fn pending(&self) -> &[E] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending event, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}
