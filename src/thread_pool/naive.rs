use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::error;

use super::ThreadPool;
use crate::Result;

/// A thread-pool that is not actually a pool. It starts a new named thread on every spawn
/// request, which gives every connection its own thread.
///
/// A panicking job is caught and logged, so a crashed session is never silent.
#[derive(Debug, Default)]
pub struct NaiveThreadPool {
    spawned: AtomicU64,
}

impl ThreadPool for NaiveThreadPool {
    fn new(_threads: u32) -> Result<Self> {
        Ok(NaiveThreadPool::default())
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        let spawned = thread::Builder::new()
            .name(format!("session-{}", id))
            .spawn(move || {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("session thread panicked");
                }
            });
        if let Err(e) = spawned {
            error!("Failed to spawn a session thread: {}", e);
        }
    }
}
