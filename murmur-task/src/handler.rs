//! Signal handler whose callbacks run on an executor.

use crate::cancel::CancelSlot;
use crate::deferred::Deferred;
use crate::executor::Executor;
use crate::publish::{GroupEntry, spawn_group};
use murmur_event::{CallbackId, SyncConnection, SyncSignalHandler};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// How a callback is treated when a signal is published while
/// it is still executing a previous one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CallbackPolicy {
    /// Launch the callback again; invocations may overlap.
    Concurrent,
    /// Skip the new signal for that callback until it finishes.
    Drop,
}

/// Asynchronous variant of [`SyncSignalHandler`]: publishing
/// posts every callback of the captured snapshot to the
/// executor instead of invoking it on the calling thread.
///
/// Each task receives its own clone of the arguments. The
/// returned [`Deferred`] completes with the collected results,
/// in snapshot order, once all callbacks have finished.
pub struct AsyncSignalHandler<A: 'static, R: 'static = ()> {
    handler: SyncSignalHandler<A, R>,
    executor: Arc<dyn Executor>,
    policy: CallbackPolicy,
    busy: Mutex<HashMap<CallbackId, Arc<AtomicBool>>>,
}

impl<A, R> AsyncSignalHandler<A, R> {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_policy(executor, CallbackPolicy::Concurrent)
    }

    pub fn with_policy(executor: Arc<dyn Executor>, policy: CallbackPolicy) -> Self {
        Self {
            handler: SyncSignalHandler::new(),
            executor,
            policy,
            busy: Mutex::new(HashMap::new()),
        }
    }

    /// Register a callback, returning its disconnection handle.
    pub fn connect<F>(&self, callback: F) -> SyncConnection
    where
        F: Fn(&mut A) -> R + Send + Sync + 'static,
    {
        self.handler.connect(callback)
    }

    pub fn size(&self) -> usize {
        self.handler.size()
    }

    pub fn disconnect_all(&self) {
        self.handler.disconnect_all();
    }

    /// Post every callback of the current snapshot to the
    /// executor with its own clone of `args`.
    pub fn publish(&self, args: A) -> Deferred<Vec<R>>
    where
        A: Clone + Send,
        R: Send,
    {
        self.publish_impl(args, None)
    }

    /// Like [`publish`](AsyncSignalHandler::publish), but tasks
    /// observing a cancelled slot skip their callback.
    pub fn publish_cancellable(&self, args: A, cancel: &CancelSlot) -> Deferred<Vec<R>>
    where
        A: Clone + Send,
        R: Send,
    {
        self.publish_impl(args, Some(cancel.clone()))
    }

    fn publish_impl(&self, args: A, cancel: Option<CancelSlot>) -> Deferred<Vec<R>>
    where
        A: Clone + Send,
        R: Send,
    {
        let snapshot = self.handler.snapshot();
        let entries = match self.policy {
            CallbackPolicy::Concurrent => snapshot
                .iter()
                .cloned()
                .map(|cell| GroupEntry { cell, busy: None })
                .collect(),
            CallbackPolicy::Drop => {
                let mut busy = self.busy.lock().unwrap();
                // Flags of disconnected callbacks are dead weight.
                busy.retain(|id, _| snapshot.iter().any(|cell| cell.id() == *id));

                let mut entries = Vec::with_capacity(snapshot.len());
                for cell in snapshot.iter() {
                    let flag = busy
                        .entry(cell.id())
                        .or_insert_with(|| Arc::new(AtomicBool::new(false)))
                        .clone();
                    if flag.swap(true, Ordering::SeqCst) {
                        // Still working on the previous signal.
                        continue;
                    }
                    entries.push(GroupEntry {
                        cell: cell.clone(),
                        busy: Some(flag),
                    });
                }
                entries
            }
        };
        spawn_group(entries, args, self.executor.as_ref(), cancel)
    }
}
