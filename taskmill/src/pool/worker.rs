use crate::pool::pool::PoolConfig;
use crate::pool::queue::TaskQueue;
use anyhow::Result;
use std::sync::{Arc, Barrier};
use std::thread;
use tracing::trace;

/// Sweep rounds over the worker queues for non-blocking pops and pushes; the
/// attempt count per sweep is `STEAL_ROUNDS * nthreads`.
pub(super) const STEAL_ROUNDS: usize = 10;

pub(super) fn spawn_worker_thread(
    cfg: &PoolConfig,
    queues: Arc<Vec<TaskQueue>>,
    home: usize,
    barrier: Arc<Barrier>,
) -> Result<thread::JoinHandle<()>> {
    let mut builder = thread::Builder::new().name((cfg.thread_name.0)());
    if let Some(stack_size) = cfg.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }

    let handle = builder.spawn(move || {
        barrier.wait();
        trace!(home, "worker started");
        run(&queues, home);
        trace!(home, "worker exiting");
    })?;

    Ok(handle)
}

/// The worker loop. Every pass sweeps all worker queues with non-blocking
/// pops (stealing), then falls back to a blocking pop on the home queue.
/// `None` from the blocking pop means done-and-empty: the worker terminates.
fn run(queues: &[TaskQueue], home: usize) {
    let nthreads = queues.len() - 1;
    debug_assert!(home >= 1 && home <= nthreads, "worker bound to queue 0");

    loop {
        let mut found = None;

        for k in 0..STEAL_ROUNDS * nthreads {
            if let Some(task) = queues[(home + k) % nthreads + 1].try_pop() {
                found = Some(task);
                break;
            }
        }

        let Some(task) = found.or_else(|| queues[home].pop()) else {
            return;
        };

        task.invoke();
    }
}
