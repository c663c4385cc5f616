//! Ordered work queue with one dedicated worker thread.
//!
//! Producers on any thread hand payloads to [`Looper::dispatch`], which only
//! holds the queue lock long enough to append. The worker thread takes items
//! in arrival order, runs the handler on each outside the lock, then hands
//! the payload to the release callback, which takes ownership.

pub mod error;
pub mod looper;

pub use error::{LooperError, Result};
pub use looper::{Looper, WorkItem};
