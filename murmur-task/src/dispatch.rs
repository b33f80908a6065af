//! Executor-driven dispatch for the thread-safe event
//! dispatcher.

use crate::deferred::{Deferred, deferred};
use crate::executor::Executor;
use murmur_event::SyncEventDispatcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Dispatch every event type's queue on the executor instead of
/// the calling thread: one task per discrete dispatcher in the
/// dispatcher-level snapshot. The returned deferred completes
/// when all of them have drained.
///
/// Events enqueued while the tasks run, including by the
/// callbacks themselves, stay queued for a later dispatch.
pub fn async_dispatch(dispatcher: &SyncEventDispatcher, executor: &dyn Executor) -> Deferred<()> {
    let entries = dispatcher.snapshot();
    let (promise, result) = deferred();
    if entries.is_empty() {
        promise.complete(());
        return result;
    }

    let remaining = Arc::new(AtomicUsize::new(entries.len()));
    let promise = Arc::new(Mutex::new(Some(promise)));
    for entry in entries {
        let remaining = remaining.clone();
        let promise = promise.clone();
        executor.post(Box::new(move || {
            entry.dispatch();
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                if let Some(promise) = promise.lock().unwrap().take() {
                    promise.complete(());
                }
            }
        }));
    }
    result
}
