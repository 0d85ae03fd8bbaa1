use crate::task::error::TaskError;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;

/// One-shot result channel shared by a [`Promise`] and its [`ResultHandle`]s.
/// The sending side fires at most once; the slot then stays full so any
/// number of handle clones can read it.
struct Channel<T> {
    slot: Mutex<Slot<T>>,
    cv: Condvar,
}

enum Slot<T> {
    Empty,
    Full(Result<T, TaskError>),
}

impl<T> Channel<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            cv: Condvar::new(),
        }
    }

    fn publish(&self, value: Result<T, TaskError>) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Empty) {
            *slot = Slot::Full(value);
            self.cv.notify_all();
        }
    }
}

pub(crate) fn channel<T>() -> (Promise<T>, ResultHandle<T>) {
    let chan = Arc::new(Channel::new());
    let promise = Promise {
        chan: chan.clone(),
        delivered: false,
    };
    (promise, ResultHandle { chan })
}

/// Sending end of the result channel. Lives inside the task cell and is
/// consumed when the task runs.
pub(crate) struct Promise<T> {
    chan: Arc<Channel<T>>,
    delivered: bool,
}

impl<T> Promise<T> {
    pub(crate) fn deliver(mut self, value: Result<T, TaskError>) {
        self.delivered = true;
        self.chan.publish(value);
    }
}

// A promise dropped unfired means the task never ran and never will; resolve
// the handle so readers are not left blocking forever.
impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.delivered {
            self.chan.publish(Err(TaskError::Discarded));
        }
    }
}

/// Receiving end of a task's one-shot result channel, returned at submission
/// time.
///
/// [`is_ready`] probes for availability without blocking or consuming;
/// [`get`] blocks until the task has delivered. Handles are cheap to clone,
/// and every clone observes the same outcome, so one result can feed several
/// downstream awaitable tasks.
///
/// [`is_ready`]: ResultHandle::is_ready
/// [`get`]: ResultHandle::get
pub struct ResultHandle<T> {
    chan: Arc<Channel<T>>,
}

impl<T> ResultHandle<T> {
    /// Non-blocking probe: is the value (or failure) available right now?
    pub fn is_ready(&self) -> bool {
        !matches!(*self.chan.slot.lock(), Slot::Empty)
    }
}

impl<T: Clone> ResultHandle<T> {
    /// Block until the task delivers, then extract the value.
    pub fn get(self) -> Result<T, TaskError> {
        let mut slot = self.chan.slot.lock();
        while matches!(*slot, Slot::Empty) {
            self.chan.cv.wait(&mut slot);
        }

        match &*slot {
            Slot::Full(value) => value.clone(),
            Slot::Empty => unreachable!("waited for a publish"),
        }
    }
}

// Manual impl: cloning shares the channel and must not require `T: Clone`.
impl<T> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        Self {
            chan: self.chan.clone(),
        }
    }
}

impl<T> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;
    use std::thread;
    use std::time::Duration;

    assert_impl_all!(ResultHandle<i32>: Send, Sync, Clone);
    assert_impl_all!(Promise<i32>: Send);

    #[test]
    fn test_deliver_then_get() {
        let (promise, handle) = channel::<u32>();
        assert!(!handle.is_ready());

        promise.deliver(Ok(7));
        assert!(handle.is_ready());
        assert_eq!(handle.get(), Ok(7));
    }

    #[test]
    fn test_every_clone_observes_the_value() {
        let (promise, handle) = channel::<String>();
        let other = handle.clone();

        promise.deliver(Ok("out".to_owned()));
        assert_eq!(handle.get(), Ok("out".to_owned()));
        assert_eq!(other.get(), Ok("out".to_owned()));
    }

    #[test]
    fn test_dropped_promise_resolves_discarded() {
        let (promise, handle) = channel::<u32>();
        drop(promise);

        assert!(handle.is_ready());
        assert_eq!(handle.get(), Err(TaskError::Discarded));
    }

    #[test]
    fn test_get_blocks_until_publish() {
        let (promise, handle) = channel::<u32>();

        let reader = thread::spawn(move || handle.get());
        thread::sleep(Duration::from_millis(20));
        promise.deliver(Ok(11));

        assert_eq!(reader.join().unwrap(), Ok(11));
    }
}
