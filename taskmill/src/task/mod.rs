//! The type-erased deferred call: a callable, its bound arguments and the
//! sending end of its result channel behind one opaque [`Task`] value.
//!
//! Two kinds of task exist, fixed at construction. A *ready* task holds only
//! immediately-available arguments and can always be invoked without waiting.
//! An *awaitable* task holds [`Input`] slots, some of which may be pending
//! results of other tasks; its readiness is the AND-reduction over the slots,
//! and invoking it blocks on each pending slot before the callable runs.

mod cell;
mod error;
mod handle;
mod input;

pub use cell::CallOnce;
pub use error::TaskError;
pub use handle::ResultHandle;
pub use input::{Input, InputList};

use cell::{AwaitableCell, ReadyCell, TaskCell};
use handle::channel;
use std::fmt;

/// A one-shot deferred computation.
///
/// A `Task` is created by [`Task::ready`] / [`Task::awaitable`] (or, more
/// commonly, by the pool's `push_*` operations which construct and enqueue in
/// one step), moved between queues, and consumed by [`invoke`](Task::invoke).
/// Consuming `self` makes double invocation a compile error rather than a
/// runtime one.
pub struct Task {
    cell: Box<dyn TaskCell>,
}

impl Task {
    /// Wrap a callable and a tuple of immediately-available arguments,
    /// returning the task and the receiving end of its result channel.
    ///
    /// ```
    /// use taskmill::Task;
    ///
    /// let (task, handle) = Task::ready(|x: u32, y: u32| x + y, (2, 3));
    /// assert!(task.ready());
    /// task.invoke();
    /// assert_eq!(handle.get(), Ok(5));
    /// ```
    pub fn ready<F, A, R>(f: F, args: A) -> (Task, ResultHandle<R>)
    where
        F: CallOnce<A, Output = R> + Send + 'static,
        A: Send + 'static,
        R: Send + 'static,
    {
        let (promise, handle) = channel();
        let task = Task {
            cell: Box::new(ReadyCell {
                callable: f,
                args,
                promise,
            }),
        };
        (task, handle)
    }

    /// Wrap a callable and a tuple of [`Input`] slots, any of which may be a
    /// pending result handle of another task.
    pub fn awaitable<F, I, R>(f: F, inputs: I) -> (Task, ResultHandle<R>)
    where
        F: CallOnce<I::Values, Output = R> + Send + 'static,
        I: InputList + 'static,
        R: Send + 'static,
    {
        let (promise, handle) = channel();
        let task = Task {
            cell: Box::new(AwaitableCell {
                callable: f,
                inputs,
                promise,
            }),
        };
        (task, handle)
    }

    /// Consume the task and run it on the calling thread.
    ///
    /// Pending input slots are materialized first, blocking until each is
    /// available. The callable's return value, its panic, or a failed input
    /// is delivered through the result channel; `invoke` itself never
    /// panics on task failure.
    pub fn invoke(self) {
        self.cell.invoke();
    }

    /// Non-blocking: would [`invoke`](Task::invoke) make progress without
    /// waiting on another task's result?
    pub fn ready(&self) -> bool {
        self.cell.ready()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("ready", &self.ready()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Task: Send);

    #[test]
    fn test_ready_task_is_always_ready() {
        let (task, handle) = Task::ready(|x: i32| x * 2, (4,));
        assert!(task.ready());

        task.invoke();
        assert_eq!(handle.get(), Ok(8));
    }

    #[test]
    fn test_awaitable_readiness_follows_inputs() {
        let (dep_task, dep) = Task::ready(|| 10_u32, ());
        let (task, handle) =
            Task::awaitable(|x: u32, y: u32| x + y, (Input::pending(dep), Input::value(5)));

        assert!(!task.ready());
        dep_task.invoke();
        assert!(task.ready());

        task.invoke();
        assert_eq!(handle.get(), Ok(15));
    }

    #[test]
    fn test_awaitable_with_only_values_is_ready() {
        let (task, handle) = Task::awaitable(|x: i32| x - 1, (Input::value(3),));
        assert!(task.ready());

        task.invoke();
        assert_eq!(handle.get(), Ok(2));
    }

    #[test]
    fn test_panicking_callable_is_captured() {
        let (task, handle) = Task::ready(|| -> u32 { panic!("boom") }, ());
        task.invoke();

        match handle.get() {
            Err(TaskError::Panicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected panic capture, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_input_skips_the_callable() {
        let (dep_task, dep) = Task::ready(|| 1_u32, ());
        let (task, handle) = Task::awaitable(|x: u32| x + 1, (Input::pending(dep),));

        // Discard the dependency without running it.
        drop(dep_task);
        assert!(task.ready());

        task.invoke();
        assert_eq!(
            handle.get(),
            Err(TaskError::Dependency(Box::new(TaskError::Discarded))),
        );
    }

    #[test]
    fn test_dropped_task_resolves_handle_discarded() {
        let (task, handle) = Task::ready(|| 42_i64, ());
        drop(task);

        assert_eq!(handle.get(), Err(TaskError::Discarded));
    }
}
