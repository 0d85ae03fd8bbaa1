use crate::pool::queue::TaskQueue;
use crate::pool::worker::{self, STEAL_ROUNDS};
use crate::task::{CallOnce, InputList, ResultHandle, Task};
use anyhow::{Result, anyhow};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tracing::{debug, error};

/// Index of the queue drained by `run_on_main`.
const MAIN_QUEUE: usize = 0;

/// Non-blocking attempts on the main queue before falling back to the
/// blocking call. Constant and independent of the worker count.
const MAIN_QUEUE_SPINS: usize = 10;

#[derive(Clone)]
pub(crate) struct ThreadNameFn(pub(crate) Arc<dyn Fn() -> String + Send + Sync + 'static>);

fn default_thread_name_fn() -> ThreadNameFn {
    let counter = Arc::new(AtomicUsize::new(1));
    ThreadNameFn(Arc::new(move || {
        let id = counter.fetch_add(1, Ordering::Relaxed);
        format!("taskmill-worker-{}", id)
    }))
}

impl fmt::Debug for ThreadNameFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ThreadNameFn").field(&"<function>").finish()
    }
}

/// Configures and builds a [`Pool`].
///
/// ```
/// use taskmill::Pool;
///
/// let pool = Pool::builder()
///     .worker_threads(2)
///     .thread_name("renderer")
///     .try_build()?;
///
/// let answer = pool.push_ready(|x: u32| x + 1, (41,));
/// assert_eq!(answer.get(), Ok(42));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Builder {
    /// Worker thread count. `None` means one per core, minus the main
    /// thread. Zero is allowed: all submissions then route to the main
    /// queue and the caller drains them with `run_on_main`.
    worker_threads: Option<usize>,

    /// Name fn for threads spawned by the pool.
    thread_name: ThreadNameFn,

    /// Stack size for threads spawned by the pool.
    thread_stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            worker_threads: None,
            thread_name: default_thread_name_fn(),
            thread_stack_size: None,
        }
    }

    pub fn worker_threads(mut self, val: usize) -> Self {
        self.worker_threads = Some(val);
        self
    }

    /// Sets the name for threads spawned by the pool.
    ///
    /// The default name is "taskmill-worker-{N}".
    pub fn thread_name(mut self, val: impl Into<String>) -> Self {
        let val = val.into();
        self.thread_name = ThreadNameFn(Arc::new(move || val.clone()));
        self
    }

    /// Sets a function used to generate the name of threads spawned by the
    /// pool.
    pub fn thread_name_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.thread_name = ThreadNameFn(Arc::new(f));
        self
    }

    /// Sets the stack size (in bytes) for worker threads. The platform
    /// minimum applies when it is greater.
    pub fn thread_stack_size(mut self, val: usize) -> Self {
        self.thread_stack_size = Some(val);
        self
    }

    /// Creates the configured [`Pool`], spawning its workers.
    pub fn try_build(self) -> Result<Pool> {
        Pool::with_config(self.try_into()?)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PoolConfig {
    pub(crate) worker_threads: usize,
    pub(crate) thread_name: ThreadNameFn,
    pub(crate) thread_stack_size: Option<usize>,
}

impl TryFrom<Builder> for PoolConfig {
    type Error = anyhow::Error;

    fn try_from(builder: Builder) -> Result<Self> {
        let worker_threads = match builder.worker_threads {
            Some(n) => n,
            None => default_worker_threads()?,
        };

        Ok(PoolConfig {
            worker_threads,
            thread_name: builder.thread_name,
            thread_stack_size: builder.thread_stack_size,
        })
    }
}

/// One worker per core, minus the main thread. A box that reports a single
/// core still gets one worker.
fn default_worker_threads() -> Result<usize> {
    let cores = thread::available_parallelism()?.get();
    Ok(cores.saturating_sub(1).max(1))
}

/// A fixed pool of worker threads draining `N + 1` task queues: queue `0`
/// belongs to the main thread, queues `1..=N` are worker home queues.
///
/// Submissions spread over the worker queues round-robin with bounded
/// non-blocking retries; workers sweep every worker queue before blocking on
/// their own (the stealing discipline), so a worker stuck waiting on one
/// task's inputs does not strand ready work elsewhere.
#[derive(Debug)]
pub struct Pool {
    cfg: PoolConfig,

    /// Queue 0 plus one home queue per worker. Shared with the workers.
    queues: Arc<Vec<TaskQueue>>,

    workers: Vec<thread::JoinHandle<()>>,

    /// Round-robin placement cursor. Relaxed: races only add placement
    /// noise, not correctness violations.
    submit_seq: AtomicUsize,
}

impl Pool {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Pool with an explicit worker count. `with_workers(0)` spawns no
    /// threads; everything runs through [`run_on_main`](Pool::run_on_main).
    pub fn with_workers(nthreads: usize) -> Result<Pool> {
        Builder::new().worker_threads(nthreads).try_build()
    }

    pub(crate) fn with_config(cfg: PoolConfig) -> Result<Pool> {
        let nthreads = cfg.worker_threads;

        let queues = Arc::new((0..=nthreads).map(|_| TaskQueue::new()).collect::<Vec<_>>());

        // Spawning is asynchronous; the barrier holds submissions back until
        // every worker is parked on its home queue rather than mid-startup.
        let barrier = Arc::new(Barrier::new(nthreads + 1));
        let workers = (1..=nthreads)
            .map(|home| worker::spawn_worker_thread(&cfg, queues.clone(), home, barrier.clone()))
            .collect::<Result<Vec<_>>>()?;
        barrier.wait();

        Ok(Pool {
            cfg,
            queues,
            workers,
            submit_seq: AtomicUsize::new(0),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.cfg.worker_threads
    }

    /// Wrap `f` plus a tuple of immediately-available arguments into a ready
    /// task on a worker queue, returning the handle to its result.
    ///
    /// With zero workers this delegates to
    /// [`push_ready_on_main`](Pool::push_ready_on_main).
    pub fn push_ready<F, A, R>(&self, f: F, args: A) -> ResultHandle<R>
    where
        F: CallOnce<A, Output = R> + Send + 'static,
        A: Send + 'static,
        R: Send + 'static,
    {
        let (task, handle) = Task::ready(f, args);
        self.push_task(task);
        handle
    }

    /// Wrap `f` plus a tuple of [`Input`](crate::task::Input) slots into an
    /// awaitable task on a worker queue. Slots holding pending result
    /// handles are awaited at invocation time; the scheduler prefers tasks
    /// whose slots have all resolved.
    ///
    /// With zero workers this delegates to
    /// [`push_awaitable_on_main`](Pool::push_awaitable_on_main).
    pub fn push_awaitable<F, I, R>(&self, f: F, inputs: I) -> ResultHandle<R>
    where
        F: CallOnce<I::Values, Output = R> + Send + 'static,
        I: InputList + 'static,
        R: Send + 'static,
    {
        let (task, handle) = Task::awaitable(f, inputs);
        self.push_task(task);
        handle
    }

    /// [`push_ready`](Pool::push_ready), routed to the main-thread queue.
    pub fn push_ready_on_main<F, A, R>(&self, f: F, args: A) -> ResultHandle<R>
    where
        F: CallOnce<A, Output = R> + Send + 'static,
        A: Send + 'static,
        R: Send + 'static,
    {
        let (task, handle) = Task::ready(f, args);
        self.place_on_main(task);
        handle
    }

    /// [`push_awaitable`](Pool::push_awaitable), routed to the main-thread
    /// queue.
    pub fn push_awaitable_on_main<F, I, R>(&self, f: F, inputs: I) -> ResultHandle<R>
    where
        F: CallOnce<I::Values, Output = R> + Send + 'static,
        I: InputList + 'static,
        R: Send + 'static,
    {
        let (task, handle) = Task::awaitable(f, inputs);
        self.place_on_main(task);
        handle
    }

    /// Enqueue an already-constructed task on the worker queues. The result
    /// handle was issued when the task was made.
    pub fn push_task(&self, task: Task) {
        if self.cfg.worker_threads == 0 {
            self.place_on_main(task);
        } else {
            self.place_on_workers(task);
        }
    }

    /// Enqueue an already-constructed task on the main-thread queue.
    pub fn push_task_on_main(&self, task: Task) {
        self.place_on_main(task);
    }

    /// Drain one task from the main-thread queue and run it on the calling
    /// thread, falling back to a blocking pop. Returns without running
    /// anything only once the pool is done and the queue empty.
    ///
    /// Not reentrant; call it from the application's tick loop.
    pub fn run_on_main(&self) {
        let mut found = None;
        for _ in 0..MAIN_QUEUE_SPINS {
            if let Some(task) = self.queues[MAIN_QUEUE].try_pop() {
                found = Some(task);
                break;
            }
        }

        let Some(task) = found.or_else(|| self.queues[MAIN_QUEUE].pop()) else {
            return;
        };

        task.invoke();
    }

    /// Mark every queue done, waking blocked workers so they drain and exit.
    /// Idempotent. Tasks pushed afterwards are still accepted but will not
    /// run.
    pub fn done(&self) {
        debug!("marking pool queues done");
        for queue in self.queues.iter() {
            queue.set_done();
        }
    }

    /// Finish the pool: mark every queue done and join the workers,
    /// reporting threads that panicked.
    pub fn shutdown(mut self) -> Result<()> {
        self.done();
        self.join_workers()
    }

    /// Round-robin placement with bounded retry: spread a burst across the
    /// worker queues with non-blocking pushes, then settle on the
    /// round-robin pick with a blocking push.
    fn place_on_workers(&self, task: Task) {
        let nthreads = self.cfg.worker_threads;
        debug_assert!(nthreads > 0, "worker placement requires workers");

        let seq = self.submit_seq.fetch_add(1, Ordering::Relaxed);

        let mut task = task;
        for k in 0..STEAL_ROUNDS * nthreads {
            match self.queues[seq.wrapping_add(k) % nthreads + 1].try_push(task) {
                Ok(()) => return,
                Err(handed_back) => task = handed_back,
            }
        }

        self.queues[seq % nthreads + 1].push(task);
    }

    fn place_on_main(&self, task: Task) {
        let mut task = task;
        for _ in 0..MAIN_QUEUE_SPINS {
            match self.queues[MAIN_QUEUE].try_push(task) {
                Ok(()) => return,
                Err(handed_back) => task = handed_back,
            }
        }

        self.queues[MAIN_QUEUE].push(task);
    }

    fn join_workers(&mut self) -> Result<()> {
        let panicked = self
            .workers
            .drain(..)
            .filter_map(|handle| handle.join().err())
            .count();

        if panicked == 0 {
            Ok(())
        } else {
            Err(anyhow!("{} worker thread(s) panicked", panicked))
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.done();
        if let Err(e) = self.join_workers() {
            error!("pool drop: {e}");
        }
    }
}
