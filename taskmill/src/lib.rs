//! taskmill — a multi-queue, work-stealing pool for deferred calls.
//!
//! Work is submitted as a callable plus its bound arguments and comes back as
//! a [`ResultHandle`]. Arguments of an *awaitable* submission may themselves
//! be pending result handles of earlier submissions; the scheduler prefers
//! dequeuing tasks whose inputs have already resolved, rotating stalled ones
//! behind ready work instead of blocking a worker on them.
//!
//! ```
//! use taskmill::{Input, Pool};
//!
//! let pool = Pool::builder().worker_threads(2).try_build()?;
//!
//! let doubled = pool.push_ready(|x: u32| x * 2, (21,));
//! let shifted = pool.push_awaitable(|x: u32| x + 1, (Input::pending(doubled),));
//!
//! assert_eq!(shifted.get(), Ok(43));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod pool;
pub use pool::{Builder, Pool};

pub mod task;
pub use task::{Input, ResultHandle, Task, TaskError};
