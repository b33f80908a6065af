//! Parallel publication of a signal over an executor.
//!
//! Each callback of the captured snapshot is posted as its own
//! task with its own clone of the arguments. The results are
//! gathered in snapshot order and delivered through a
//! [`Deferred`] when the whole group has finished.

use crate::cancel::CancelSlot;
use crate::deferred::{Deferred, Promise, deferred};
use crate::executor::Executor;
use murmur_event::{SharedCallback, SyncSignalHandler};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) struct GroupEntry<A: 'static, R: 'static> {
    pub(crate) cell: SharedCallback<A, R>,
    pub(crate) busy: Option<Arc<AtomicBool>>,
}

struct Gather<R> {
    slots: Mutex<Vec<Option<R>>>,
    remaining: AtomicUsize,
    promise: Mutex<Option<Promise<Vec<R>>>>,
}

impl<R> Gather<R> {
    fn new(len: usize, promise: Promise<Vec<R>>) -> Arc<Self> {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Arc::new(Self {
            slots: Mutex::new(slots),
            remaining: AtomicUsize::new(len),
            promise: Mutex::new(Some(promise)),
        })
    }

    fn finish(&self, index: usize, value: Option<R>) {
        if let Some(value) = value {
            self.slots.lock().unwrap()[index] = Some(value);
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let Some(promise) = self.promise.lock().unwrap().take() {
                let results = self.slots.lock().unwrap().drain(..).flatten().collect();
                promise.complete(results);
            }
        }
    }
}

pub(crate) fn spawn_group<A, R>(
    entries: Vec<GroupEntry<A, R>>,
    args: A,
    executor: &dyn Executor,
    cancel: Option<CancelSlot>,
) -> Deferred<Vec<R>>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
{
    let (promise, result) = deferred();
    if entries.is_empty() {
        promise.complete(Vec::new());
        return result;
    }

    let gather = Gather::new(entries.len(), promise);
    for (index, entry) in entries.into_iter().enumerate() {
        let gather = gather.clone();
        let args = args.clone();
        let cancel = cancel.clone();
        executor.post(Box::new(move || {
            let cancelled = cancel
                .as_ref()
                .map(|slot| slot.is_cancelled())
                .unwrap_or(false);
            let value = if cancelled {
                None
            } else {
                let mut args = args;
                Some(entry.cell.invoke(&mut args))
            };
            if let Some(busy) = &entry.busy {
                busy.store(false, Ordering::SeqCst);
            }
            gather.finish(index, value);
        }));
    }
    result
}

/// Publish through `executor`: every callback of the handler's
/// current snapshot runs as its own task against its own clone
/// of `args`. The deferred completes with the results in
/// snapshot order once every task has finished.
pub fn publish_parallel<A, R>(
    handler: &SyncSignalHandler<A, R>,
    args: A,
    executor: &dyn Executor,
) -> Deferred<Vec<R>>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
{
    let entries = handler
        .snapshot()
        .iter()
        .cloned()
        .map(|cell| GroupEntry { cell, busy: None })
        .collect();
    spawn_group(entries, args, executor, None)
}

/// [`publish_parallel`] guarded by a cancellation slot: tasks
/// observing a cancelled slot skip their callback and yield no
/// result. The deferred still completes once the group drains.
pub fn publish_parallel_cancellable<A, R>(
    handler: &SyncSignalHandler<A, R>,
    args: A,
    executor: &dyn Executor,
    cancel: &CancelSlot,
) -> Deferred<Vec<R>>
where
    A: Clone + Send + 'static,
    R: Send + 'static,
{
    let entries = handler
        .snapshot()
        .iter()
        .cloned()
        .map(|cell| GroupEntry { cell, busy: None })
        .collect();
    spawn_group(entries, args, executor, Some(cancel.clone()))
}
