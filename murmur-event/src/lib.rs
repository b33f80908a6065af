//! In-process signal and event delivery primitives.
//!
//! The crate builds four publish/subscribe primitives on one
//! shared design:
//!
//! - [`SignalHandler`] registers callbacks for a single
//!   signature and invokes them in connection order when the
//!   signal is published.
//! - [`SyncSignalHandler`] is its thread-safe sibling. The
//!   registered callbacks live in an immutable snapshot behind
//!   one mutex; mutation rebuilds the snapshot and swaps the
//!   pointer, publication captures the pointer and iterates
//!   lock-free. Publishers never block writers, writers never
//!   block publishers, and callbacks can re-enter the handler
//!   at will.
//! - [`EventDispatcher`] keys one signal handler and one event
//!   queue per event type, discovered at use time. Events are
//!   either sent immediately or enqueued and drained by the
//!   next `dispatch` call.
//! - [`SyncEventDispatcher`] makes the same surface safe for
//!   concurrent producers and consumers, guarding the type map
//!   with a reader-preferring lock and snapshotting the
//!   dispatcher set before any callback runs.
//!
//! [`connect`](SignalHandler::connect) hands back a
//! [`Connection`] (or [`SyncConnection`]), an idempotent
//! disconnection capability that outlives its registry safely.
//! The scoped wrappers release on drop.
//!
//! The primitives are executor-free; the `murmur-task` crate
//! layers asynchronous publication on top of the snapshots
//! exposed here.

#[doc(hidden)]
pub mod connection;
#[rustfmt::skip]
pub use connection::{
    CallbackId,
    Connection, ScopedConnection,
    SyncConnection, SyncScopedConnection,
};

#[doc(hidden)]
pub mod signal;
pub use signal::{PublishIter, SignalHandler};

#[doc(hidden)]
pub mod sync_signal;
#[rustfmt::skip]
pub use sync_signal::{
    SharedCallback, Snapshot,
    SyncPublishIter, SyncSignalHandler,
};

#[doc(hidden)]
pub mod queue;
pub use queue::{EventQueue, SyncEventQueue};

#[doc(hidden)]
pub mod dispatch;
pub use dispatch::EventDispatcher;

#[doc(hidden)]
pub mod sync_dispatch;
pub use sync_dispatch::{SyncDispatch, SyncEventDispatcher};
