//! Tokio-backed worker pool.
//!
//! The adapter treats any [`Executor`] implementation alike;
//! this module provides the batteries-included one, a thin
//! wrapper over a tokio multi-thread runtime.

use crate::executor::{Executor, Task};
use anyhow::Result;

/// Pool sizing knobs. Leaving a field unset keeps the
/// runtime's own default.
#[derive(Default)]
pub struct Config {
    pub num_threads: Option<usize>,
}

/// An [`Executor`] running posted tasks on a dedicated tokio
/// runtime. Dropping the pool shuts the runtime down after the
/// in-flight tasks finish.
pub struct Pool {
    runtime: tokio::runtime::Runtime,
}

impl Executor for Pool {
    fn post(&self, task: Task) {
        let _ = self.runtime.spawn(async move { task() });
    }
}

/// Build a pool from the configuration.
pub fn build(config: Config) -> Result<Pool> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(num_threads) = config.num_threads {
        builder.worker_threads(num_threads);
    }
    let runtime = builder.build()?;
    Ok(Pool { runtime })
}
