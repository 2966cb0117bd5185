//! Worker pool for the trainer's two fan-out points.
//!
//! `fan_out` is a parallel map joined before it returns. `tree_reduce`
//! merges neighbours pairwise, one level at a time; each level finishes
//! before the next starts, and an odd trailing element is carried to the
//! next level unmerged.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::trace;

use crate::error::{BrainError, Result};

pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// `threads == 0` lets rayon pick (one per logical core).
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("evobrain-worker-{}", i))
            .build()
            .map_err(|e| BrainError::InvalidConfig(format!("worker pool: {}", e)))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every item concurrently; results keep item order.
    pub fn fan_out<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Pairwise tree reduction. `None` only for an empty input.
    pub fn tree_reduce<T, F>(&self, mut level: Vec<T>, merge: F) -> Option<T>
    where
        T: Send + Sync,
        F: Fn(&T, &T) -> T + Sync + Send,
    {
        let mut depth = 0;
        while level.len() > 1 {
            let carry = if level.len() % 2 == 1 { level.pop() } else { None };
            let mut next: Vec<T> = self
                .pool
                .install(|| level.par_chunks(2).map(|pair| merge(&pair[0], &pair[1])).collect());
            next.extend(carry);
            trace!(depth, width = level.len(), next = next.len(), "reduce level");
            level = next;
            depth += 1;
        }
        level.pop()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}
