use std::cell::RefCell;
use std::sync::Mutex;

/// FIFO buffer of pending events for one event type.
///
/// `drain` moves the whole buffer out at once, so events
/// pushed while the drained batch is being processed land in
/// the next batch.
pub struct EventQueue<E> {
    events: RefCell<Vec<E>>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn push(&self, event: E) {
        self.events.borrow_mut().push(event);
    }

    pub fn extend(&self, events: impl IntoIterator<Item = E>) {
        self.events.borrow_mut().extend(events);
    }

    /// Move out the current contents, leaving the queue empty.
    pub fn drain(&self) -> Vec<E> {
        self.events.take()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Drop every queued event without processing it.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe [`EventQueue`].
///
/// All operations serialize on one mutex; `drain` holds it
/// only long enough to swap the buffer out, so callbacks that
/// process the drained batch never run under the lock.
pub struct SyncEventQueue<E> {
    events: Mutex<Vec<E>>,
}

impl<E> SyncEventQueue<E> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, event: E) {
        self.events.lock().unwrap().push(event);
    }

    pub fn extend(&self, events: impl IntoIterator<Item = E>) {
        self.events.lock().unwrap().extend(events);
    }

    /// Move out the current contents, leaving the queue empty.
    pub fn drain(&self) -> Vec<E> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    /// Drop every queued event without processing it.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl<E> Default for SyncEventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
