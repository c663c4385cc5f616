//! Named, bounded message channels between processes on one host.
//!
//! A channel is a POSIX message queue addressed by a logical name. The name
//! `worker` maps to the queue `/worker`. Queues are bounded (10 messages by
//! default), carry whole messages up to a fixed maximum size, and block with
//! a timeout on both ends.
//!
//! This is the lowest layer of ipcloop. Everything else builds on top of
//! the [`MessageQueue`] type provided here.

pub mod error;
pub mod name;
pub mod policy;

#[cfg(target_os = "linux")]
pub mod mqueue;

pub use error::{ChannelError, Result};
pub use name::{ChannelName, MAX_NAME_LEN};
pub use policy::SendPolicy;

#[cfg(target_os = "linux")]
pub use mqueue::{MessageQueue, QueueAccess, QueueAttributes};
