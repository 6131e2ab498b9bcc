// ── Sample fan-out ──
//
// Decouples the sampler from its consumers. Delivery is synchronous and
// in subscription order on the sampler's own task, so listeners must
// stay cheap; anything slow should hand off to its own queue.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use netpulse_proto::Sample;
use tracing::{debug, error};

/// Receives every published sample.
pub trait SampleListener: Send + Sync {
    fn on_sample(&self, sample: &Sample);
}

/// Handle returned by [`Dispatcher::subscribe`]. Pass it back to
/// [`unsubscribe`](Dispatcher::unsubscribe) to stop deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Registry = Vec<(ListenerId, Arc<dyn SampleListener>)>;

/// Insertion-ordered listener registry.
pub struct Dispatcher {
    listeners: RwLock<Registry>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener. Later subscribers are delivered to later.
    pub fn subscribe(&self, listener: Arc<dyn SampleListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push((id, listener));
        debug!(id = id.0, "listener subscribed");
        id
    }

    /// Remove a listener. Returns `false` when the id was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        let removed = listeners.len() < before;
        drop(listeners);

        if removed {
            debug!(id = id.0, "listener unsubscribed");
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.read().len()
    }

    /// Deliver one sample to every listener, in subscription order.
    ///
    /// The registry is copied before delivery, so a listener may
    /// subscribe or unsubscribe from inside its callback without
    /// deadlocking. A panic in one listener is caught and logged;
    /// the remaining listeners still receive the sample.
    pub fn publish(&self, sample: &Sample) {
        let current: Registry = self.read().clone();

        for (id, listener) in current {
            if catch_unwind(AssertUnwindSafe(|| listener.on_sample(sample))).is_err() {
                error!(id = id.0, "listener panicked; continuing delivery");
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Appends a tag to a shared log on every delivery.
    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl SampleListener for Recorder {
        fn on_sample(&self, _sample: &Sample) {
            self.log.lock().unwrap().push(self.tag);
        }
    }

    fn sample() -> Sample {
        Sample::new(1.0, 2.0, 3, 4, 30, 0)
    }

    #[test]
    fn delivers_in_subscription_order() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            dispatcher.subscribe(Arc::new(Recorder {
                tag,
                log: Arc::clone(&log),
            }));
        }

        dispatcher.publish(&sample());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn delivers_exactly_once_per_publish() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher.subscribe(Arc::new(Recorder {
            tag: "only",
            log: Arc::clone(&log),
        }));

        dispatcher.publish(&sample());
        dispatcher.publish(&sample());
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn unsubscribed_listener_receives_nothing() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let keep = dispatcher.subscribe(Arc::new(Recorder {
            tag: "keep",
            log: Arc::clone(&log),
        }));
        let gone = dispatcher.subscribe(Arc::new(Recorder {
            tag: "gone",
            log: Arc::clone(&log),
        }));

        assert!(dispatcher.unsubscribe(gone));
        assert!(!dispatcher.unsubscribe(gone), "second removal is a no-op");
        dispatcher.publish(&sample());

        assert_eq!(*log.lock().unwrap(), vec!["keep"]);
        assert!(dispatcher.unsubscribe(keep));
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        struct Panicker;
        impl SampleListener for Panicker {
            fn on_sample(&self, _sample: &Sample) {
                panic!("listener bug");
            }
        }

        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.subscribe(Arc::new(Panicker));
        dispatcher.subscribe(Arc::new(Recorder {
            tag: "after-panic",
            log: Arc::clone(&log),
        }));

        dispatcher.publish(&sample());
        assert_eq!(*log.lock().unwrap(), vec!["after-panic"]);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_delivery() {
        struct SelfRemover {
            dispatcher: Arc<Dispatcher>,
            id: Mutex<Option<ListenerId>>,
            deliveries: AtomicUsize,
        }

        impl SampleListener for SelfRemover {
            fn on_sample(&self, _sample: &Sample) {
                self.deliveries.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *self.id.lock().unwrap() {
                    self.dispatcher.unsubscribe(id);
                }
            }
        }

        let dispatcher = Arc::new(Dispatcher::new());
        let remover = Arc::new(SelfRemover {
            dispatcher: Arc::clone(&dispatcher),
            id: Mutex::new(None),
            deliveries: AtomicUsize::new(0),
        });

        let id = dispatcher.subscribe(Arc::clone(&remover) as Arc<dyn SampleListener>);
        *remover.id.lock().unwrap() = Some(id);

        dispatcher.publish(&sample());
        dispatcher.publish(&sample());

        assert_eq!(remover.deliveries.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.listener_count(), 0);
    }
}
