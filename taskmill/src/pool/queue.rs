use crate::task::Task;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Yield iterations between short sleeps while waiting for a popped task's
/// inputs in the `pop` fallback. Keeps the wait a yield loop, not a tight
/// spin.
const YIELDS_PER_SLEEP: u32 = 64;

const READY_WAIT_SLEEP: Duration = Duration::from_micros(50);

/// FIFO task queue with a readiness-aware blocking pop.
///
/// Producers push at the tail; consumers pop from the head. The blocking
/// [`pop`](TaskQueue::pop) prefers the oldest task whose inputs are already
/// available and rotates stalled tasks to the tail so the queue never idles
/// behind a head-of-line dependency.
#[derive(Debug)]
pub(crate) struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    cv: Condvar,
    done: AtomicBool,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
            done: AtomicBool::new(false),
        }
    }

    /// Mark the queue finished and wake every blocked consumer. Sticky and
    /// idempotent. The lock is taken so a consumer between its empty-check
    /// and its wait cannot miss the flag.
    pub(crate) fn set_done(&self) {
        let _guard = self.tasks.lock();
        self.done.store(true, Ordering::Release);
        self.cv.notify_all();
    }

    /// Non-blocking push. On lock contention the task is handed back to the
    /// caller unchanged.
    pub(crate) fn try_push(&self, task: Task) -> Result<(), Task> {
        match self.tasks.try_lock() {
            Some(mut tasks) => {
                tasks.push_back(task);
                drop(tasks);
                self.cv.notify_one();
                Ok(())
            }
            None => Err(task),
        }
    }

    pub(crate) fn push(&self, task: Task) {
        self.tasks.lock().push_back(task);
        self.cv.notify_one();
    }

    /// Non-blocking pop of the head element, ready or not. `None` on
    /// contention or empty.
    pub(crate) fn try_pop(&self) -> Option<Task> {
        self.tasks.try_lock()?.pop_front()
    }

    /// Blocking, readiness-aware pop. Returns `None` only once the queue is
    /// done and empty.
    ///
    /// The scan visits the elements present at wake time in insertion order:
    /// the first ready task is returned, non-ready tasks rotate to the tail.
    /// If nothing is ready the oldest task is taken anyway and its inputs are
    /// awaited outside the lock, so producers and stealing consumers stay
    /// unblocked during the wait.
    pub(crate) fn pop(&self) -> Option<Task> {
        let mut tasks = self.tasks.lock();
        while tasks.is_empty() && !self.done.load(Ordering::Acquire) {
            self.cv.wait(&mut tasks);
        }

        if tasks.is_empty() {
            return None;
        }

        for _ in 0..tasks.len() {
            if tasks.front().is_some_and(Task::ready) {
                return tasks.pop_front();
            }

            let stalled = tasks.pop_front().expect("scan is bounded by len");
            tasks.push_back(stalled);
        }

        let task = tasks.pop_front().expect("queue checked non-empty");
        drop(tasks);

        let mut yields: u32 = 0;
        while !task.ready() {
            yields = yields.wrapping_add(1);
            if yields.is_multiple_of(YIELDS_PER_SLEEP) {
                thread::sleep(READY_WAIT_SLEEP);
            } else {
                thread::yield_now();
            }
        }

        Some(task)
    }
}
