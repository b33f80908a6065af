use futures::executor::ThreadPool;

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send>;

/// The executor abstraction the adapter is built on: anything
/// that can run a posted task, eventually, on some thread.
///
/// The event primitives themselves never require an executor;
/// only the asynchronous publish and dispatch paths in this
/// crate do.
pub trait Executor: Send + Sync {
    fn post(&self, task: Task);
}

impl Executor for ThreadPool {
    fn post(&self, task: Task) {
        self.spawn_ok(async move { task() });
    }
}

/// Executor that runs each task on the posting thread, before
/// `post` returns. Turns the asynchronous paths deterministic,
/// which the tests lean on.
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn post(&self, task: Task) {
        task();
    }
}
