//! A small scoped worker pool for independent scan shards.

use anyhow::{Result, anyhow};
use crossfire::mpmc;
use std::thread;

/// Run `work` over every job on up to `threads` workers and collect the
/// results (in completion order). With one thread, or one job, everything
/// runs on the calling thread.
pub fn run_sharded<J, T, F>(jobs: Vec<J>, threads: usize, work: F) -> Result<Vec<T>>
where
    J: Send + Unpin + 'static,
    T: Send + Unpin + 'static,
    F: Fn(J) -> Result<T> + Sync,
{
    if threads <= 1 || jobs.len() <= 1 {
        return jobs.into_iter().map(&work).collect();
    }

    crossfire::detect_backoff_cfg();
    let worker_count = threads.min(jobs.len());
    let cap = worker_count.saturating_mul(4).max(8);
    let (tx_work, rx_work) = mpmc::bounded_blocking::<J>(cap);
    let (tx_res, rx_res) = mpmc::unbounded_blocking::<Result<T>>();

    let work_ref = &work;
    thread::scope(|scope| -> Result<Vec<T>> {
        for _ in 0..worker_count {
            let rx_work = rx_work.clone();
            let tx_res = tx_res.clone();
            scope.spawn(move || {
                while let Ok(job) = rx_work.recv() {
                    if tx_res.send(work_ref(job)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx_res);
        drop(rx_work);

        let total = jobs.len();
        for job in jobs {
            tx_work
                .send(job)
                .map_err(|_| anyhow!("worker channel closed"))?;
        }
        drop(tx_work);

        let mut results = Vec::with_capacity(total);
        while results.len() < total {
            let res = rx_res
                .recv()
                .map_err(|_| anyhow!("worker result channel closed"))?;
            results.push(res?);
        }
        Ok(results)
    })
}
