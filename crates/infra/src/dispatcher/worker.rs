use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use ordermgmt_events::{EventBus, EventHandler, Subscription};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn subscriber worker '{name}': {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// Messages queued before the request, including the one being handled,
    /// are all handled before the worker exits.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Runs one [`EventHandler`] on its own named thread.
///
/// - Subscribes to the bus before returning, so nothing published afterwards
///   is missed
/// - Handler errors are logged and never reach the publisher
/// - Shutdown drains the queue instead of dropping it
#[derive(Debug)]
pub struct SubscriberWorker;

impl SubscriberWorker {
    pub fn spawn<M, B, H>(bus: &B, mut handler: H) -> Result<WorkerHandle, DispatchError>
    where
        M: Send + 'static,
        B: EventBus<M> + ?Sized,
        H: EventHandler<M>,
    {
        let name = handler.name();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &mut handler))
            .map_err(|source| DispatchError::Spawn { name, source })?;

        debug!(worker = name, "subscriber worker started");
        Ok(WorkerHandle {
            name,
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<M, H>(
    name: &'static str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: EventHandler<M>,
{
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            let drained = drain_queued(name, &sub, handler);
            if drained > 0 {
                info!(worker = name, drained, "handled queued events before stopping");
            }
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => deliver(name, handler, &msg),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker = name, "subscriber worker stopped");
}

/// Hand every message already queued on `sub` to the handler.
fn drain_queued<M, H>(name: &'static str, sub: &Subscription<M>, handler: &mut H) -> usize
where
    H: EventHandler<M>,
{
    let mut drained = 0;
    while let Ok(msg) = sub.try_recv() {
        deliver(name, handler, &msg);
        drained += 1;
    }
    drained
}

fn deliver<M, H>(name: &'static str, handler: &mut H, msg: &M)
where
    H: EventHandler<M>,
{
    if let Err(err) = handler.handle(msg) {
        warn!(worker = name, error = ?err, "subscriber handler failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use ordermgmt_events::InMemoryEventBus;

    struct Recorder {
        seen: Arc<Mutex<Vec<u32>>>,
        delay: Duration,
    }

    impl Recorder {
        fn new(seen: &Arc<Mutex<Vec<u32>>>) -> Self {
            Self {
                seen: seen.clone(),
                delay: Duration::ZERO,
            }
        }

        fn slow(seen: &Arc<Mutex<Vec<u32>>>, delay: Duration) -> Self {
            Self {
                seen: seen.clone(),
                delay,
            }
        }
    }

    impl EventHandler<u32> for Recorder {
        type Error = String;

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&mut self, message: &u32) -> Result<(), Self::Error> {
            thread::sleep(self.delay);
            if *message == 0 {
                return Err("zero is not allowed".to_string());
            }
            self.seen.lock().unwrap().push(*message);
            Ok(())
        }
    }

    fn wait_for(seen: &Arc<Mutex<Vec<u32>>>, len: usize) {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while seen.lock().unwrap().len() < len && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn handler_sees_messages_in_order_and_survives_errors() {
        let bus = InMemoryEventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = SubscriberWorker::spawn(&bus, Recorder::new(&seen)).unwrap();
        assert_eq!(worker.name(), "recorder");

        for n in [1, 0, 2, 3] {
            bus.publish(n).unwrap();
        }
        wait_for(&seen, 3);
        worker.shutdown();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn shutdown_stops_delivery() {
        let bus = InMemoryEventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = SubscriberWorker::spawn(&bus, Recorder::new(&seen)).unwrap();

        worker.shutdown();
        bus.publish(7).unwrap();
        thread::sleep(Duration::from_millis(20));

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn shutdown_handles_events_still_queued() {
        let bus = InMemoryEventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker =
            SubscriberWorker::spawn(&bus, Recorder::slow(&seen, Duration::from_millis(30)))
                .unwrap();

        for n in 1..=4 {
            bus.publish(n).unwrap();
        }
        worker.shutdown();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    }
}
