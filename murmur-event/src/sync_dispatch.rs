//! Thread-safe typed event dispatch.
//!
//! A reader-preferring lock guards the map from event type to
//! its discrete dispatcher: lookups take the shared lock,
//! first-touch creation upgrades to the exclusive lock with a
//! double-check. No lock is ever held while user callbacks
//! run; `dispatch` snapshots the dispatcher set first, because
//! a callback may touch an event type the map has never seen,
//! and creating that entry needs the exclusive lock.

use crate::connection::SyncConnection;
use crate::queue::SyncEventQueue;
use crate::sync_signal::SyncSignalHandler;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Capability set of a type-erased discrete dispatcher.
///
/// This is the element type of the dispatcher-level snapshot
/// that [`SyncEventDispatcher::snapshot`] hands out, and the
/// surface an external executor drives dispatch through.
pub trait SyncDispatch: Send + Sync {
    /// Drain this event type's queue and publish each event in
    /// FIFO order.
    fn dispatch(&self);

    /// Drop the queued events without invoking callbacks.
    fn clear(&self);

    /// Number of queued events.
    fn len(&self) -> usize;

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;
}

struct SyncDiscreteDispatcher<E: Send + 'static> {
    handler: SyncSignalHandler<E>,
    queue: SyncEventQueue<E>,
}

impl<E: Send + 'static> SyncDiscreteDispatcher<E> {
    fn new() -> Self {
        Self {
            handler: SyncSignalHandler::new(),
            queue: SyncEventQueue::new(),
        }
    }

    fn connect<F>(&self, callback: F) -> SyncConnection
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.handler.connect(move |event: &mut E| callback(event))
    }

    fn enqueue(&self, event: E) {
        self.queue.push(event);
    }

    fn enqueue_all(&self, events: impl IntoIterator<Item = E>) {
        self.queue.extend(events);
    }

    fn send(&self, event: E) {
        let mut event = event;
        self.handler.publish(&mut event);
    }

    fn send_all(&self, events: impl IntoIterator<Item = E>) {
        for event in events {
            self.send(event);
        }
    }
}

impl<E: Send + 'static> SyncDispatch for SyncDiscreteDispatcher<E> {
    fn dispatch(&self) {
        // The drain swaps the buffer out under the queue lock
        // and releases it before any callback runs; enqueues
        // from callbacks land in the next cycle.
        let buffer = self.queue.drain();
        for mut event in buffer {
            self.handler.publish(&mut event);
        }
    }

    fn clear(&self) {
        self.queue.clear();
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct Registry {
    dispatchers: RwLock<HashMap<TypeId, Arc<dyn SyncDispatch>>>,
}

/// Thread-safe [`EventDispatcher`](crate::EventDispatcher).
///
/// Any number of threads may connect, enqueue, send and
/// dispatch concurrently. Callbacks must be `Fn + Send + Sync`
/// and event types `Send`. Lock acquisition order is dispatcher
/// map, then queue, then signal snapshot; callbacks always run
/// with no library lock held and may therefore re-enter the
/// dispatcher freely.
#[derive(Clone, Default)]
pub struct SyncEventDispatcher {
    registry: Arc<Registry>,
}

impl SyncEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn of<E: Send + 'static>(&self) -> Arc<dyn SyncDispatch> {
        let key = TypeId::of::<E>();

        {
            let dispatchers = self.registry.dispatchers.read().unwrap();
            if let Some(dispatcher) = dispatchers.get(&key) {
                return Arc::clone(dispatcher);
            }
        }

        // Two threads may race to this point; the map entry
        // decides the winner and the loser adopts its value.
        let mut dispatchers = self.registry.dispatchers.write().unwrap();
        let dispatcher = dispatchers
            .entry(key)
            .or_insert_with(|| Arc::new(SyncDiscreteDispatcher::<E>::new()));
        Arc::clone(dispatcher)
    }

    fn with<E: Send + 'static, T>(
        &self,
        operate: impl FnOnce(&SyncDiscreteDispatcher<E>) -> T,
    ) -> T {
        let erased = self.of::<E>();
        let discrete = erased
            .as_any()
            .downcast_ref::<SyncDiscreteDispatcher<E>>()
            .expect("event type key maps to a dispatcher of the same type");
        operate(discrete)
    }

    /// Register a callback for event type `E`.
    pub fn connect<E: Send + 'static, F>(&self, callback: F) -> SyncConnection
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.with(|dispatcher: &SyncDiscreteDispatcher<E>| dispatcher.connect(callback))
    }

    /// Append `event` to its type's queue for a later dispatch.
    pub fn enqueue<E: Send + 'static>(&self, event: E) {
        self.with(|dispatcher: &SyncDiscreteDispatcher<E>| dispatcher.enqueue(event));
    }

    /// Append every event of the range to its type's queue.
    pub fn enqueue_all<E: Send + 'static>(&self, events: impl IntoIterator<Item = E>) {
        self.with(|dispatcher: &SyncDiscreteDispatcher<E>| dispatcher.enqueue_all(events));
    }

    /// Immediately invoke the callbacks for `E` with `event`,
    /// without touching the queue.
    pub fn send<E: Send + 'static>(&self, event: E) {
        self.with(|dispatcher: &SyncDiscreteDispatcher<E>| dispatcher.send(event));
    }

    /// Immediately invoke the callbacks for `E` once per event
    /// of the range.
    pub fn send_all<E: Send + 'static>(&self, events: impl IntoIterator<Item = E>) {
        self.with(|dispatcher: &SyncDiscreteDispatcher<E>| dispatcher.send_all(events));
    }

    /// Capture the current set of discrete dispatchers.
    ///
    /// The shared lock is released before the snapshot is
    /// returned, so driving `dispatch` on the entries runs no
    /// user callback under the map lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn SyncDispatch>> {
        self.registry
            .dispatchers
            .read()
            .unwrap()
            .values()
            .cloned()
            .collect()
    }

    /// Drain every event type's queue in turn, invoking the
    /// registered callbacks. Iteration order over event types is
    /// unspecified, and the drain is not atomic across types.
    pub fn dispatch(&self) {
        for dispatcher in self.snapshot() {
            dispatcher.dispatch();
        }
    }

    /// Number of queued events for `E`; 0 for a type the
    /// dispatcher has not seen.
    pub fn queue_size<E: Send + 'static>(&self) -> usize {
        let key = TypeId::of::<E>();
        self.registry
            .dispatchers
            .read()
            .unwrap()
            .get(&key)
            .map(|dispatcher| dispatcher.len())
            .unwrap_or(0)
    }

    /// Number of queued events across every event type.
    pub fn queue_size_total(&self) -> usize {
        self.registry
            .dispatchers
            .read()
            .unwrap()
            .values()
            .map(|dispatcher| dispatcher.len())
            .sum()
    }

    /// Drop the queued events of `E` without invoking callbacks.
    pub fn clear<E: Send + 'static>(&self) {
        let key = TypeId::of::<E>();
        let dispatcher = {
            let dispatchers = self.registry.dispatchers.read().unwrap();
            dispatchers.get(&key).cloned()
        };
        if let Some(dispatcher) = dispatcher {
            dispatcher.clear();
        }
    }
}

#[cfg(test)]
mod test {
    use crate::sync_dispatch::SyncEventDispatcher;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Clone)]
    struct TestEvent {
        value: i32,
    }

    struct OtherEvent {
        message: String,
    }

    #[test]
    fn test_connect_and_send() {
        let dispatcher = SyncEventDispatcher::new();
        let received = Arc::new(AtomicI64::new(0));

        let moved = received.clone();
        let _conn = dispatcher.connect(move |event: &TestEvent| {
            moved.store(event.value as i64, Ordering::SeqCst);
        });

        dispatcher.send(TestEvent { value: 42 });
        assert_eq!(received.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_enqueue_then_dispatch_in_fifo_order() {
        let dispatcher = SyncEventDispatcher::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let moved = received.clone();
        let _conn = dispatcher.connect(move |event: &TestEvent| {
            moved.lock().unwrap().push(event.value);
        });

        dispatcher.enqueue(TestEvent { value: 1 });
        dispatcher.enqueue(TestEvent { value: 2 });
        dispatcher.enqueue(TestEvent { value: 3 });
        assert!(received.lock().unwrap().is_empty());

        dispatcher.dispatch();
        assert_eq!(*received.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_multiple_event_types() {
        let dispatcher = SyncEventDispatcher::new();
        let number = Arc::new(AtomicI64::new(0));
        let message = Arc::new(Mutex::new(String::new()));

        let moved = number.clone();
        let _c1 = dispatcher.connect(move |event: &TestEvent| {
            moved.store(event.value as i64, Ordering::SeqCst);
        });
        let moved = message.clone();
        let _c2 = dispatcher.connect(move |event: &OtherEvent| {
            *moved.lock().unwrap() = event.message.clone();
        });

        dispatcher.send(TestEvent { value: 99 });
        dispatcher.send(OtherEvent {
            message: "world".to_string(),
        });

        assert_eq!(number.load(Ordering::SeqCst), 99);
        assert_eq!(*message.lock().unwrap(), "world");
    }

    #[test]
    fn test_queue_size() {
        let dispatcher = SyncEventDispatcher::new();
        let _conn = dispatcher.connect(|_: &TestEvent| {});

        assert_eq!(dispatcher.queue_size_total(), 0);

        dispatcher.enqueue(TestEvent { value: 1 });
        dispatcher.enqueue(TestEvent { value: 2 });
        assert_eq!(dispatcher.queue_size_total(), 2);
        assert_eq!(dispatcher.queue_size::<TestEvent>(), 2);
        assert_eq!(dispatcher.queue_size::<OtherEvent>(), 0);

        dispatcher.dispatch();
        assert_eq!(dispatcher.queue_size_total(), 0);
    }

    #[test]
    fn test_enqueue_all_and_send_all() {
        let dispatcher = SyncEventDispatcher::new();
        let total = Arc::new(AtomicI64::new(0));

        let moved = total.clone();
        let _conn = dispatcher.connect(move |event: &TestEvent| {
            moved.fetch_add(event.value as i64, Ordering::SeqCst);
        });

        dispatcher.enqueue_all((1..=3).map(|value| TestEvent { value }));
        dispatcher.dispatch();
        assert_eq!(total.load(Ordering::SeqCst), 6);

        dispatcher.send_all([TestEvent { value: 10 }, TestEvent { value: 20 }]);
        assert_eq!(total.load(Ordering::SeqCst), 36);
    }

    #[test]
    fn test_disconnect_removes_callback() {
        let dispatcher = SyncEventDispatcher::new();
        let count = Arc::new(AtomicI64::new(0));

        let moved = count.clone();
        let mut conn = dispatcher.connect(move |_: &TestEvent| {
            moved.fetch_add(1, Ordering::SeqCst);
        });
        conn.disconnect();

        dispatcher.send(TestEvent { value: 1 });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_enqueue_delivers_every_event() {
        let dispatcher = SyncEventDispatcher::new();
        let total = Arc::new(AtomicI64::new(0));

        let moved = total.clone();
        let _conn = dispatcher.connect(move |event: &TestEvent| {
            moved.fetch_add(event.value as i64, Ordering::Relaxed);
        });

        const NUM_THREADS: usize = 4;
        const EVENTS_PER_THREAD: usize = 5_000;

        let mut threads = Vec::new();
        for _ in 0..NUM_THREADS {
            let dispatcher = dispatcher.clone();
            threads.push(thread::spawn(move || {
                for _ in 0..EVENTS_PER_THREAD {
                    dispatcher.enqueue(TestEvent { value: 1 });
                }
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }

        dispatcher.dispatch();
        assert_eq!(
            total.load(Ordering::Relaxed),
            (NUM_THREADS * EVENTS_PER_THREAD) as i64
        );
        assert_eq!(dispatcher.queue_size_total(), 0);
    }

    #[test]
    fn test_enqueue_during_dispatch_is_deferred() {
        let dispatcher = SyncEventDispatcher::new();
        let dispatch_count = Arc::new(AtomicI64::new(0));

        let reentrant = dispatcher.clone();
        let moved = dispatch_count.clone();
        let _conn = dispatcher.connect(move |event: &TestEvent| {
            moved.fetch_add(1, Ordering::SeqCst);
            if event.value < 3 {
                reentrant.enqueue(TestEvent {
                    value: event.value + 1,
                });
            }
        });

        dispatcher.enqueue(TestEvent { value: 1 });
        dispatcher.dispatch();
        assert_eq!(dispatch_count.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.queue_size::<TestEvent>(), 1);

        dispatcher.dispatch();
        dispatcher.dispatch();
        assert_eq!(dispatch_count.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.queue_size::<TestEvent>(), 0);
    }

    #[test]
    fn test_callback_touching_new_event_type_does_not_deadlock() {
        let dispatcher = SyncEventDispatcher::new();
        let spawned = Arc::new(AtomicI64::new(0));

        // The callback's enqueue needs the map's exclusive lock
        // for first-touch creation; the dispatch-time snapshot
        // guarantees no shared lock is held at this point.
        let reentrant = dispatcher.clone();
        let _conn = dispatcher.connect(move |_: &TestEvent| {
            reentrant.enqueue(OtherEvent {
                message: "spawned".to_string(),
            });
        });

        dispatcher.enqueue(TestEvent { value: 1 });
        dispatcher.dispatch();
        assert_eq!(dispatcher.queue_size::<OtherEvent>(), 1);

        let moved = spawned.clone();
        let _c2 = dispatcher.connect(move |_: &OtherEvent| {
            moved.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.dispatch();
        assert_eq!(spawned.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.queue_size_total(), 0);
    }

    #[test]
    fn test_concurrent_dispatch_and_enqueue() {
        let dispatcher = SyncEventDispatcher::new();
        let delivered = Arc::new(AtomicI64::new(0));

        let moved = delivered.clone();
        let _conn = dispatcher.connect(move |_: &TestEvent| {
            moved.fetch_add(1, Ordering::Relaxed);
        });

        const EVENTS: usize = 10_000;

        let producer = {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for _ in 0..EVENTS {
                    dispatcher.enqueue(TestEvent { value: 1 });
                }
            })
        };
        let consumer = {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    dispatcher.dispatch();
                    thread::yield_now();
                }
            })
        };

        producer.join().unwrap();
        consumer.join().unwrap();
        dispatcher.dispatch();

        // Every event is delivered exactly once across the
        // interleaved dispatch cycles.
        assert_eq!(delivered.load(Ordering::Relaxed), EVENTS as i64);
    }

    #[test]
    fn test_clear_drops_queued_events() {
        let dispatcher = SyncEventDispatcher::new();
        let count = Arc::new(AtomicI64::new(0));

        let moved = count.clone();
        let _conn = dispatcher.connect(move |_: &TestEvent| {
            moved.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.enqueue(TestEvent { value: 1 });
        dispatcher.clear::<TestEvent>();
        dispatcher.dispatch();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
