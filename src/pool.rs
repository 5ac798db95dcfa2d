// src/pool.rs
//
// Caller-owned worker pool handle.
//
// **Ownership**: the pool is built by the caller and shared by reference
// (`Arc`) between every options snapshot and resize call that uses it. This
// crate never tears a pool down; the last handle dropped does.
//
// **Thread Count**:
// - Explicit count when given
// - Otherwise std::thread::available_parallelism(), falling back to
//   MIN_THREADS when detection fails

use crate::error::Result;
use rayon::ThreadPool;
use std::fmt;
use std::sync::Arc;

/// Minimum number of threads to ensure at least some parallelism
const MIN_THREADS: usize = 1;

#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
}

impl WorkerPool {
    /// Build a new pool. `None` sizes it from the detected parallelism.
    pub fn new(num_threads: Option<usize>) -> Result<Self> {
        let num_threads = num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(MIN_THREADS)
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(MIN_THREADS))
            .thread_name(|idx| format!("mode-resizer-{idx}"))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Wrap a pool the caller already shares elsewhere.
    pub fn from_shared(pool: Arc<ThreadPool>) -> Self {
        Self { pool }
    }

    pub fn current_num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Whether two handles point at the same pool.
    pub fn ptr_eq(&self, other: &WorkerPool) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }

    /// Run `op` inside the pool; nested rayon work uses its threads.
    #[inline]
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.current_num_threads())
            .finish()
    }
}
