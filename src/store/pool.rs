//! Bounded pool for blocking file I/O

use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs blocking jobs on tokio's blocking threads, at most `threads` at a time.
///
/// The pool lives as long as its store. [`WorkerPool::shutdown`] waits for
/// in-flight jobs and then refuses new ones; the size cannot change.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::Config("worker pool needs at least one thread".into()));
        }
        Ok(WorkerPool {
            slots: Arc::new(Semaphore::new(threads)),
            threads,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `job` once a slot is free and return its result
    pub async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Worker("pool is shut down".into()))?;

        tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        })
        .await
        .map_err(|e| Error::Worker(format!("blocking job failed: {}", e)))?
    }

    /// Wait for every running job to finish, then close the pool
    pub async fn shutdown(&self) {
        if let Ok(all) = self.slots.acquire_many(self.threads as u32).await {
            all.forget();
        }
        self.slots.close();
        tracing::info!(threads = self.threads, "worker pool drained");
    }

    /// Refuse new jobs without waiting for running ones
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.slots.is_closed()
    }
}
