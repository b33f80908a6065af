//! One-shot deferred operations.
//!
//! A [`Deferred`] is the consumer half of a single value that
//! some posted task will produce later; the [`Promise`] is the
//! producer half. The consumer either blocks on `wait`, polls
//! with `try_take`, or attaches a completion with
//! `on_complete` that runs on whichever thread completes the
//! promise.

use std::sync::{Arc, Condvar, Mutex};

enum Slot<T> {
    Pending,
    Notify(Box<dyn FnOnce(T) + Send>),
    Complete(T),
    Taken,
    Abandoned,
}

struct State<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// Producer half of a deferred operation. Completing consumes
/// it; dropping it without completing abandons the operation.
pub struct Promise<T> {
    state: Option<Arc<State<T>>>,
}

impl<T> Promise<T> {
    /// Deliver the value. If a completion was attached it runs
    /// here, on the completing thread.
    pub fn complete(mut self, value: T) {
        let state = self.state.take().expect("promise completed twice");
        let mut slot = state.slot.lock().unwrap();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Pending => {
                *slot = Slot::Complete(value);
                state.ready.notify_all();
            }
            Slot::Notify(notify) => {
                drop(slot);
                notify(value);
            }
            // The consumer already lost interest.
            other => *slot = other,
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let mut slot = state.slot.lock().unwrap();
            if matches!(*slot, Slot::Pending | Slot::Notify(_)) {
                *slot = Slot::Abandoned;
                state.ready.notify_all();
            }
        }
    }
}

/// Consumer half of a deferred operation.
pub struct Deferred<T> {
    state: Arc<State<T>>,
}

impl<T> Deferred<T> {
    /// Block until the value arrives and return it.
    ///
    /// Panics if the promise was dropped without completing or
    /// the value was already taken; both are usage errors, not
    /// runtime conditions.
    pub fn wait(self) -> T {
        let mut slot = self.state.slot.lock().unwrap();
        loop {
            match &*slot {
                Slot::Pending => slot = self.state.ready.wait(slot).unwrap(),
                Slot::Complete(_) => match std::mem::replace(&mut *slot, Slot::Taken) {
                    Slot::Complete(value) => return value,
                    _ => unreachable!(),
                },
                Slot::Abandoned => panic!("deferred operation abandoned before completion"),
                Slot::Taken | Slot::Notify(_) => panic!("deferred value already consumed"),
            }
        }
    }

    /// Take the value if it has already arrived.
    pub fn try_take(&self) -> Option<T> {
        let mut slot = self.state.slot.lock().unwrap();
        if matches!(*slot, Slot::Complete(_)) {
            match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Complete(value) => Some(value),
                _ => unreachable!(),
            }
        } else {
            None
        }
    }

    /// Attach a completion. It runs immediately on this thread
    /// if the value already arrived, otherwise on the thread
    /// that completes the promise. A completion attached to an
    /// abandoned operation never runs.
    pub fn on_complete<F>(self, notify: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let mut slot = self.state.slot.lock().unwrap();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Pending => *slot = Slot::Notify(Box::new(notify)),
            Slot::Complete(value) => {
                drop(slot);
                notify(value);
            }
            Slot::Abandoned => *slot = Slot::Abandoned,
            Slot::Taken | Slot::Notify(_) => panic!("deferred value already consumed"),
        }
    }
}

/// Create a connected promise/deferred pair.
pub fn deferred<T>() -> (Promise<T>, Deferred<T>) {
    let state = Arc::new(State {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
    });
    (
        Promise {
            state: Some(state.clone()),
        },
        Deferred { state },
    )
}
