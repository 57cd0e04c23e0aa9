/// Reacts to committed events delivered by a bus subscription.
///
/// Handlers run on a dedicated worker thread, never on the thread that
/// published. Delivery is at-least-once from the handler's point of view
/// (a restarted worker may see an event again), so implementations should be
/// idempotent: reacting twice to the same fact must be harmless.
///
/// A handler error is logged by the worker and does not stop it.
pub trait EventHandler<M>: Send + 'static {
    type Error: core::fmt::Debug + Send + 'static;

    /// Stable name used for the worker thread and log fields.
    fn name(&self) -> &'static str;

    fn handle(&mut self, message: &M) -> Result<(), Self::Error>;
}
