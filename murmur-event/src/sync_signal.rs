//! Thread-safe signal handler built on copy-on-write snapshots.
//!
//! The registry state is a single pointer to an immutable
//! callback sequence. Mutation rebuilds the sequence and swaps
//! the pointer under a mutex; publication clones the pointer
//! under the mutex and then iterates with no lock held. The
//! result is that publishers never block writers for longer
//! than one pointer swap, writers never block publishers, and
//! a callback is free to connect, disconnect or publish on the
//! handler it is running from.

use crate::connection::{CallbackId, SyncConnection, SyncDisconnect};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type SyncCallback<A, R> = Arc<dyn Fn(&mut A) -> R + Send + Sync>;

/// One registered callback, shared between the registry and
/// any snapshots that captured it.
///
/// A publish that captured the cell keeps invoking it even if
/// it is disconnected concurrently; the cell is freed when the
/// last snapshot referencing it is dropped. This is what makes
/// disconnect race-free against a publish already in flight.
pub struct SharedCallback<A: 'static, R: 'static> {
    id: CallbackId,
    callback: SyncCallback<A, R>,
}

impl<A, R> SharedCallback<A, R> {
    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub fn invoke(&self, args: &mut A) -> R {
        (self.callback)(args)
    }
}

impl<A, R> Clone for SharedCallback<A, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
        }
    }
}

/// Immutable view of the callback sequence at one instant.
///
/// Cheap to clone and free to share across threads; iterating
/// it acquires no lock. An empty registry yields an empty
/// snapshot.
pub struct Snapshot<A: 'static, R: 'static = ()> {
    cells: Option<Arc<Vec<SharedCallback<A, R>>>>,
}

impl<A, R> Snapshot<A, R> {
    pub fn len(&self) -> usize {
        self.cells.as_ref().map(|cells| cells.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedCallback<A, R>> {
        self.cells.iter().flat_map(|cells| cells.iter())
    }

    fn get(&self, index: usize) -> Option<&SharedCallback<A, R>> {
        self.cells.as_ref()?.get(index)
    }
}

impl<A, R> Clone for Snapshot<A, R> {
    fn clone(&self) -> Self {
        Self {
            cells: self.cells.clone(),
        }
    }
}

struct Registry<A: 'static, R: 'static> {
    next_id: AtomicU64,
    // No user code ever runs under this mutex, so it is held
    // only for pointer reads and copy-and-swap rebuilds.
    snapshot: Mutex<Option<Arc<Vec<SharedCallback<A, R>>>>>,
}

impl<A, R> Registry<A, R> {
    fn issue_id(&self) -> CallbackId {
        CallbackId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl<A, R> SyncDisconnect for Registry<A, R> {
    fn disconnect(&self, id: CallbackId) {
        let mut guard = self.snapshot.lock().unwrap();
        let Some(current) = guard.as_ref() else {
            return;
        };
        let Some(index) = current.iter().position(|cell| cell.id == id) else {
            return;
        };

        let mut rebuilt = Vec::with_capacity(current.len() - 1);
        rebuilt.extend(current.iter().take(index).cloned());
        rebuilt.extend(current.iter().skip(index + 1).cloned());
        *guard = if rebuilt.is_empty() {
            None
        } else {
            Some(Arc::new(rebuilt))
        };
    }
}

/// Thread-safe variant of [`SignalHandler`](crate::SignalHandler).
///
/// Callbacks must be `Fn + Send + Sync` because concurrent
/// publishes may invoke the same callback at once; interior
/// state belongs behind the caller's own synchronization.
///
/// Within one publish, callbacks run in the connection order
/// observed by the captured snapshot. Concurrent connects and
/// disconnects become visible to the next publish that captures
/// a snapshot after the swap.
///
/// Cloning yields another handle to the same registry; see
/// [`SyncSignalHandler::duplicate`] for the independent-copy
/// semantics.
pub struct SyncSignalHandler<A: 'static, R: 'static = ()> {
    registry: Arc<Registry<A, R>>,
}

impl<A, R> SyncSignalHandler<A, R> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(0),
                snapshot: Mutex::new(None),
            }),
        }
    }

    /// Register a callback, returning its disconnection handle.
    ///
    /// The rebuilt snapshot replaces the current one atomically;
    /// a publish already iterating keeps its captured snapshot.
    pub fn connect<F>(&self, callback: F) -> SyncConnection
    where
        F: Fn(&mut A) -> R + Send + Sync + 'static,
    {
        let id = self.registry.issue_id();
        let cell = SharedCallback {
            id,
            callback: Arc::new(callback),
        };

        {
            let mut guard = self.registry.snapshot.lock().unwrap();
            let mut rebuilt = match guard.as_ref() {
                Some(current) => current.as_ref().clone(),
                None => Vec::new(),
            };
            rebuilt.push(cell);
            *guard = Some(Arc::new(rebuilt));
        }

        let concrete = Arc::downgrade(&self.registry);
        let weak: std::sync::Weak<dyn SyncDisconnect> = concrete;
        SyncConnection::new(weak, id)
    }

    /// Number of callbacks in the current snapshot.
    pub fn size(&self) -> usize {
        self.registry
            .snapshot
            .lock()
            .unwrap()
            .as_ref()
            .map(|cells| cells.len())
            .unwrap_or(0)
    }

    /// Drop the snapshot pointer, removing every callback.
    pub fn disconnect_all(&self) {
        self.registry.snapshot.lock().unwrap().take();
    }

    /// Capture the current snapshot.
    ///
    /// This is the seam an external executor publishes through:
    /// the snapshot owns shared references to the callbacks and
    /// stays valid however long the executor keeps it.
    pub fn snapshot(&self) -> Snapshot<A, R> {
        Snapshot {
            cells: self.registry.snapshot.lock().unwrap().clone(),
        }
    }

    /// Invoke every callback in the current snapshot with `args`,
    /// collecting the results in snapshot order.
    ///
    /// The mutex is released before the first callback runs, so
    /// callbacks may freely re-enter this handler.
    pub fn publish(&self, args: &mut A) -> Vec<R> {
        let snapshot = self.snapshot();
        let mut results = Vec::with_capacity(snapshot.len());
        for cell in snapshot.iter() {
            results.push(cell.invoke(args));
        }
        results
    }

    /// Publish lazily over the captured snapshot: one callback
    /// runs per `next` call. Finite and non-restartable.
    pub fn publish_iter<'a>(&self, args: &'a mut A) -> SyncPublishIter<'a, A, R> {
        SyncPublishIter {
            snapshot: self.snapshot(),
            index: 0,
            args,
        }
    }

    /// Create an independent registry seeded with this handler's
    /// current snapshot. Connections issued by this handler keep
    /// referring to this handler only.
    pub fn duplicate(&self) -> Self {
        let cells = self.registry.snapshot.lock().unwrap().clone();
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(self.registry.next_id.load(Ordering::Relaxed)),
                snapshot: Mutex::new(cells),
            }),
        }
    }
}

impl<A, R> Clone for SyncSignalHandler<A, R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<A, R> Default for SyncSignalHandler<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy publish sequence, see [`SyncSignalHandler::publish_iter`].
pub struct SyncPublishIter<'a, A: 'static, R: 'static> {
    snapshot: Snapshot<A, R>,
    index: usize,
    args: &'a mut A,
}

impl<'a, A, R> Iterator for SyncPublishIter<'a, A, R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        let cell = self.snapshot.get(self.index)?;
        self.index += 1;
        Some(cell.invoke(self.args))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.snapshot.len() - self.index;
        (remaining, Some(remaining))
    }
}
