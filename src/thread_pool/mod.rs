//! Pools of worker threads that run one catalog session per job.
//!
//! - [`NaiveThreadPool`] starts a new thread for every job, i.e. one thread per connection
//! - [`SharedQueueThreadPool`] runs jobs on a fixed set of threads fed by a channel
//! - [`RayonThreadPool`] runs jobs on a fixed size [`rayon`] pool
//!
//! Fixed size pools serve at most `threads` connections at once; later connections wait in
//! the pool's queue until a session ends.
use std::fmt;
use std::str::FromStr;

use crate::{CatalogError, Result};

/// A pool of threads that can run jobs
pub trait ThreadPool {
    /// Creates a new thread pool, immediately spawning the specified number of threads.
    ///
    /// Returns an error if any thread fails to spawn. All previously-spawned threads are terminated.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Spawn a function into the thread pool.
    ///
    /// Spawning always succeeds. If the function panics the pool keeps operating with the same
    /// number of threads.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

/// The pools a server can be started with
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PoolKind {
    /// [`NaiveThreadPool`]
    Naive,
    /// [`SharedQueueThreadPool`]
    Shared,
    /// [`RayonThreadPool`]
    Rayon,
}

impl PoolKind {
    /// names accepted on the command line
    pub const VARIANTS: [&'static str; 3] = ["naive", "shared", "rayon"];
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolKind::Naive => "naive",
            PoolKind::Shared => "shared",
            PoolKind::Rayon => "rayon",
        };
        f.write_str(name)
    }
}

impl FromStr for PoolKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "naive" => Ok(PoolKind::Naive),
            "shared" => Ok(PoolKind::Shared),
            "rayon" => Ok(PoolKind::Rayon),
            other => Err(CatalogError::Parsing(format!(
                "unknown thread pool '{}', expected one of {:?}",
                other,
                PoolKind::VARIANTS
            ))),
        }
    }
}

mod naive;
mod rayon_pool;
mod shared_queue;

pub use self::naive::NaiveThreadPool;
pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
