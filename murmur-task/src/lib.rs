//! Executor-driven publication for `murmur-event`.
//!
//! The event primitives are deliberately executor-free: they
//! block the publishing thread and nothing else. This crate
//! bridges them to a task executor, so a publish can fan its
//! callbacks out across worker threads and report back through
//! a deferred completion.
//!
//! The bridge rests on four small pieces:
//!
//! - [`Executor`], the only thing the adapter asks of a
//!   runtime: run a posted task eventually. Implementations are
//!   provided for `futures`' thread pool and for a dedicated
//!   tokio runtime built by [`pool::build`].
//! - [`Deferred`] / [`Promise`], a one-shot completion cell
//!   that can be waited on, polled, or given a callback.
//! - [`CancelSource`] / [`CancelSlot`], cancellation carried
//!   by a flag plus a signal-emitting slot.
//! - [`publish_parallel`] and [`async_dispatch`], which walk a
//!   snapshot taken from the core crate and post one task per
//!   entry; [`AsyncSignalHandler`] packages the former with a
//!   handler, an executor and a [`CallbackPolicy`].

#[doc(hidden)]
pub mod executor;
pub use executor::{Executor, InlineExecutor, Task};

#[doc(hidden)]
pub mod deferred;
pub use deferred::{Deferred, Promise, deferred};

#[doc(hidden)]
pub mod cancel;
pub use cancel::{CancelSlot, CancelSource};

#[doc(hidden)]
pub mod publish;
pub use publish::{publish_parallel, publish_parallel_cancellable};

#[doc(hidden)]
pub mod handler;
pub use handler::{AsyncSignalHandler, CallbackPolicy};

#[doc(hidden)]
pub mod dispatch;
pub use dispatch::async_dispatch;

pub mod pool;
