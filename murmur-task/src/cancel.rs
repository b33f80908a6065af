//! Cancellation propagated through a signal-emitting slot.
//!
//! A [`CancelSource`] owns the cancelled flag; its slots are
//! cheap observer handles backed by a shared
//! [`SyncSignalHandler`], so interested parties can either
//! poll [`CancelSlot::is_cancelled`] or connect a callback
//! that fires when cancellation happens.

use murmur_event::{SyncConnection, SyncSignalHandler};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owner side of a cancellation channel.
pub struct CancelSource {
    flag: Arc<AtomicBool>,
    signal: SyncSignalHandler<()>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            signal: SyncSignalHandler::new(),
        }
    }

    /// Create an observer handle for this source.
    pub fn slot(&self) -> CancelSlot {
        CancelSlot {
            flag: self.flag.clone(),
            signal: self.signal.clone(),
        }
    }

    /// Request cancellation. The first call fires the slot
    /// signal; later calls are no-ops.
    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            self.signal.publish(&mut ());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation channel.
#[derive(Clone)]
pub struct CancelSlot {
    flag: Arc<AtomicBool>,
    signal: SyncSignalHandler<()>,
}

impl CancelSlot {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Connect a callback invoked when the source cancels.
    ///
    /// A callback connected after cancellation never fires;
    /// check [`is_cancelled`](CancelSlot::is_cancelled) first
    /// when that matters.
    pub fn on_cancel<F>(&self, callback: F) -> SyncConnection
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.signal.connect(move |_: &mut ()| callback())
    }
}
