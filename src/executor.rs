use crate::error::{Result, RpmdError};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::warn;

/// Runs a batch of independent trajectory tasks and blocks until all of
/// them have finished. Results come back in submission order.
pub enum Executor {
    Sequential,
    Parallel(ThreadPool),
}

impl Executor {
    /// `None` or `Some(1)` run in-process; `Some(n)` with `n > 1` requires a
    /// pool of `n` workers; `Some(0)` sizes the pool to the machine and
    /// falls back to sequential if it cannot be built.
    pub fn select(processes: Option<usize>) -> Result<Self> {
        match processes {
            None | Some(1) => Ok(Executor::Sequential),
            Some(0) => match rayon::ThreadPoolBuilder::new().build() {
                Ok(pool) => Ok(Executor::Parallel(pool)),
                Err(err) => {
                    warn!("Worker pool unavailable ({err}); running trajectories sequentially");
                    Ok(Executor::Sequential)
                }
            },
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map(Executor::Parallel)
                .map_err(|err| RpmdError::DependencyUnavailable {
                    detail: format!("could not start {n} worker threads: {err}"),
                }),
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Executor::Sequential => 1,
            Executor::Parallel(pool) => pool.current_num_threads(),
        }
    }

    /// Run every task; the first failure aborts the batch.
    pub fn run_batch<T, R, F>(&self, tasks: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync + Send,
    {
        match self {
            Executor::Sequential => tasks.into_iter().map(f).collect(),
            Executor::Parallel(pool) => pool.install(|| tasks.into_par_iter().map(f).collect()),
        }
    }
}
