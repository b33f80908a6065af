//! Typed event dispatch for a single thread.
//!
//! The dispatcher keys a private signal handler and event
//! queue pair by the exact runtime type of the event. The pair
//! is materialized on the first operation that names the type
//! and reused by every later one.

use crate::connection::Connection;
use crate::queue::EventQueue;
use crate::signal::SignalHandler;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Capability set the dispatcher needs from a type-erased
/// discrete dispatcher.
trait Dispatch: 'static {
    fn dispatch(&self);
    fn clear(&self);
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

/// Signal handler plus event queue for exactly one event type.
struct DiscreteDispatcher<E: 'static> {
    handler: SignalHandler<E>,
    queue: EventQueue<E>,
}

impl<E> DiscreteDispatcher<E> {
    fn new() -> Self {
        Self {
            handler: SignalHandler::new(),
            queue: EventQueue::new(),
        }
    }

    fn connect<F>(&self, callback: F) -> Connection
    where
        F: Fn(&E) + 'static,
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

impl<E> Dispatch for DiscreteDispatcher<E> {
    fn dispatch(&self) {
        // Drain into a local buffer so events enqueued by the
        // callbacks below belong to the next dispatch cycle.
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
    dispatchers: RefCell<HashMap<TypeId, Rc<dyn Dispatch>>>,
}

/// Single-threaded event dispatcher.
///
/// Callbacks registered for an event type are invoked when a
/// value of that type is sent or dispatched; dispatch is keyed
/// on exact type identity. Events may be delivered immediately
/// with [`send`](EventDispatcher::send) or enqueued for the
/// next [`dispatch`](EventDispatcher::dispatch).
///
/// Cloning yields another handle to the same dispatcher, which
/// is how a callback enqueues or connects on the dispatcher it
/// is running from.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    registry: Rc<Registry>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn of<E: 'static>(&self) -> Rc<dyn Dispatch> {
        let key = TypeId::of::<E>();
        if let Some(dispatcher) = self.registry.dispatchers.borrow().get(&key) {
            return Rc::clone(dispatcher);
        }

        let dispatcher: Rc<dyn Dispatch> = Rc::new(DiscreteDispatcher::<E>::new());
        self.registry
            .dispatchers
            .borrow_mut()
            .insert(key, Rc::clone(&dispatcher));
        dispatcher
    }

    fn with<E: 'static, T>(&self, operate: impl FnOnce(&DiscreteDispatcher<E>) -> T) -> T {
        let erased = self.of::<E>();
        let discrete = erased
            .as_any()
            .downcast_ref::<DiscreteDispatcher<E>>()
            .expect("event type key maps to a dispatcher of the same type");
        operate(discrete)
    }

    /// Register a callback for event type `E`.
    pub fn connect<E: 'static, F>(&self, callback: F) -> Connection
    where
        F: Fn(&E) + 'static,
    {
        self.with(|dispatcher: &DiscreteDispatcher<E>| dispatcher.connect(callback))
    }

    /// Append `event` to its type's queue for a later dispatch.
    pub fn enqueue<E: 'static>(&self, event: E) {
        self.with(|dispatcher: &DiscreteDispatcher<E>| dispatcher.enqueue(event));
    }

    /// Append every event of the range to its type's queue.
    pub fn enqueue_all<E: 'static>(&self, events: impl IntoIterator<Item = E>) {
        self.with(|dispatcher: &DiscreteDispatcher<E>| dispatcher.enqueue_all(events));
    }

    /// Immediately invoke the callbacks for `E` with `event`,
    /// without touching the queue.
    pub fn send<E: 'static>(&self, event: E) {
        self.with(|dispatcher: &DiscreteDispatcher<E>| dispatcher.send(event));
    }

    /// Immediately invoke the callbacks for `E` once per event
    /// of the range.
    pub fn send_all<E: 'static>(&self, events: impl IntoIterator<Item = E>) {
        self.with(|dispatcher: &DiscreteDispatcher<E>| dispatcher.send_all(events));
    }

    /// Drain every event type's queue in turn, invoking the
    /// registered callbacks. Iteration order over event types is
    /// unspecified. Event types first touched by a callback
    /// during this dispatch keep their events for the next one.
    pub fn dispatch(&self) {
        let snapshot: Vec<Rc<dyn Dispatch>> = self
            .registry
            .dispatchers
            .borrow()
            .values()
            .cloned()
            .collect();
        for dispatcher in snapshot {
            dispatcher.dispatch();
        }
    }

    /// Number of queued events for `E`; 0 for a type the
    /// dispatcher has not seen.
    pub fn queue_size<E: 'static>(&self) -> usize {
        let key = TypeId::of::<E>();
        self.registry
            .dispatchers
            .borrow()
            .get(&key)
            .map(|dispatcher| dispatcher.len())
            .unwrap_or(0)
    }

    /// Number of queued events across every event type.
    pub fn queue_size_total(&self) -> usize {
        self.registry
            .dispatchers
            .borrow()
            .values()
            .map(|dispatcher| dispatcher.len())
            .sum()
    }

    /// Drop the queued events of `E` without invoking callbacks.
    pub fn clear<E: 'static>(&self) {
        let key = TypeId::of::<E>();
        if let Some(dispatcher) = self.registry.dispatchers.borrow().get(&key) {
            dispatcher.clear();
        }
    }
}
