//! Fixed-size worker pool for independent evaluation units.

use crossbeam_channel::unbounded;
use rw_types::{internal_error, RwResult};
use tracing::debug;

/// A rayon thread pool sized to `min(n_jobs, units)`.
///
/// Units are identified by their index. Each result is sent back with its
/// unit id and written into an id-indexed buffer, so the output order never
/// depends on completion order.
#[derive(Debug)]
pub struct WorkerPool {
    num_workers: usize,
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// A pool for `units` units; `n_jobs == 0` means one worker per logical
    /// CPU.
    pub fn new(n_jobs: usize, units: usize) -> RwResult<Self> {
        let requested = if n_jobs == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            n_jobs
        };
        let num_workers = requested.min(units).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("rw-worker-{i}"))
            .build()
            .map_err(|e| internal_error!("failed to start worker pool: {}", e))?;
        Ok(Self { num_workers, pool })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run `task` for every unit id in `0..units`; results are in id order.
    pub fn run<T, F>(&self, units: usize, task: F) -> RwResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let (tx, rx) = unbounded();
        self.pool.scope(|scope| {
            for id in 0..units {
                let tx = tx.clone();
                let task = &task;
                scope.spawn(move |_| {
                    // the receiver outlives the scope
                    let _ = tx.send((id, task(id)));
                });
            }
        });
        drop(tx);

        let mut buffer: Vec<Option<T>> = (0..units).map(|_| None).collect();
        for (id, result) in rx {
            buffer[id] = Some(result);
        }
        debug!(units, workers = self.num_workers, "Worker pool drained");

        buffer
            .into_iter()
            .enumerate()
            .map(|(id, result)| {
                result.ok_or_else(|| internal_error!("evaluation unit {} produced no result", id))
            })
            .collect()
    }
}
