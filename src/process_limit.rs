//! Limits on how many engine processes run at once.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::prelude::*;

/// Caps the number of external engine processes running at the same time.
///
/// Each `tesseract` process will happily use a full CPU core, and every HTTP
/// request may start one. Clones share the same permits.
#[derive(Debug, Clone)]
pub struct ProcessLimit {
    semaphore: Arc<Semaphore>,
    max_processes: usize,
}

impl ProcessLimit {
    /// Allow up to `max_processes` concurrent processes (at least one).
    pub fn new(max_processes: usize) -> Self {
        let max_processes = max_processes.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_processes)),
            max_processes,
        }
    }

    /// One process per CPU.
    pub fn per_cpu() -> Self {
        Self::new(num_cpus::get())
    }

    /// How many processes may run at once.
    pub fn max_processes(&self) -> usize {
        self.max_processes
    }

    /// Run `f` once a process slot is free.
    #[instrument(level = "trace", skip_all, fields(max_processes = self.max_processes))]
    pub async fn run<Func, Fut, R>(&self, f: Func) -> Result<R>
    where
        Func: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .context("engine process limit was closed")?;
        f().await
    }
}
