use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::error::{ChannelError, Result};
use crate::name::ChannelName;
use crate::policy::SendPolicy;

/// Queue sizing, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueAttributes {
    /// Queue depth in messages.
    pub max_messages: usize,
    /// Largest message the queue accepts, in bytes.
    pub max_message_size: usize,
    /// Messages currently queued (reported by [`MessageQueue::attributes`]).
    pub current_messages: usize,
}

impl Default for QueueAttributes {
    fn default() -> Self {
        Self {
            max_messages: 10,
            max_message_size: 4096,
            current_messages: 0,
        }
    }
}

/// Which end of a queue a descriptor is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAccess {
    Read,
    Write,
    ReadWrite,
}

impl QueueAccess {
    fn flags(self) -> libc::c_int {
        match self {
            QueueAccess::Read => libc::O_RDONLY,
            QueueAccess::Write => libc::O_WRONLY,
            QueueAccess::ReadWrite => libc::O_RDWR,
        }
    }
}

/// An open POSIX message queue descriptor.
///
/// The descriptor is closed on drop. The queue itself outlives the
/// descriptor until [`MessageQueue::unlink`] removes its name.
#[derive(Debug)]
pub struct MessageQueue {
    mqd: libc::mqd_t,
    name: ChannelName,
    attrs: QueueAttributes,
}

impl MessageQueue {
    /// Default permission mode for created queues.
    pub const DEFAULT_QUEUE_MODE: u32 = 0o600;

    /// Create (or open, if it already exists) a queue for reading and writing.
    ///
    /// `attrs` only applies when the queue is newly created; an existing
    /// queue keeps its sizing, which is reflected in [`Self::limits`].
    pub fn create(name: &ChannelName, attrs: QueueAttributes) -> Result<Self> {
        let path = name.c_path();

        // SAFETY: mq_attr is a plain C struct for which all-zero is a valid value.
        let mut raw: libc::mq_attr = unsafe { std::mem::zeroed() };
        raw.mq_flags = 0;
        raw.mq_maxmsg = attrs.max_messages as libc::c_long;
        raw.mq_msgsize = attrs.max_message_size as libc::c_long;

        // SAFETY: `path` is a valid NUL-terminated string and `raw` outlives the call.
        // O_CREAT requires the mode and attribute arguments, which are both supplied.
        let mqd = unsafe {
            libc::mq_open(
                path.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_CLOEXEC,
                Self::DEFAULT_QUEUE_MODE as libc::mode_t,
                &mut raw as *mut libc::mq_attr,
            )
        };
        if mqd == -1 {
            return Err(ChannelError::Create {
                name: name.path(),
                source: io::Error::last_os_error(),
            });
        }

        let mut queue = Self {
            mqd,
            name: name.clone(),
            attrs,
        };
        queue.attrs = queue.attributes()?;

        info!(
            queue = %name.path(),
            max_messages = queue.attrs.max_messages,
            max_message_size = queue.attrs.max_message_size,
            "opened message queue"
        );
        Ok(queue)
    }

    /// Open an existing queue.
    pub fn open(name: &ChannelName, access: QueueAccess) -> Result<Self> {
        let path = name.c_path();

        // SAFETY: `path` is a valid NUL-terminated string; without O_CREAT no
        // variadic arguments are read.
        let mqd = unsafe { libc::mq_open(path.as_ptr(), access.flags() | libc::O_CLOEXEC) };
        if mqd == -1 {
            return Err(ChannelError::Open {
                name: name.path(),
                source: io::Error::last_os_error(),
            });
        }

        let mut queue = Self {
            mqd,
            name: name.clone(),
            attrs: QueueAttributes::default(),
        };
        queue.attrs = queue.attributes()?;
        debug!(queue = %name.path(), ?access, "opened existing message queue");
        Ok(queue)
    }

    /// Open an existing queue for sending.
    pub fn open_for_write(name: &ChannelName) -> Result<Self> {
        Self::open(name, QueueAccess::Write)
    }

    /// Remove a queue name. Messages still queued are discarded once the
    /// last descriptor is closed.
    pub fn unlink(name: &ChannelName) -> Result<()> {
        let path = name.c_path();

        // SAFETY: `path` is a valid NUL-terminated string.
        let rc = unsafe { libc::mq_unlink(path.as_ptr()) };
        if rc == -1 {
            return Err(ChannelError::Unlink {
                name: name.path(),
                source: io::Error::last_os_error(),
            });
        }
        debug!(queue = %name.path(), "unlinked message queue");
        Ok(())
    }

    /// Make one blocking send attempt bounded by `timeout`.
    pub fn send_timeout(&self, message: &[u8], timeout: Duration) -> Result<()> {
        if message.len() > self.attrs.max_message_size {
            return Err(ChannelError::MessageTooLarge {
                size: message.len(),
                max: self.attrs.max_message_size,
            });
        }

        let deadline = realtime_deadline(timeout);

        // SAFETY: `message` is valid for `message.len()` bytes and `deadline`
        // outlives the call; `self.mqd` is an open descriptor owned by `self`.
        let rc = unsafe {
            libc::mq_timedsend(
                self.mqd,
                message.as_ptr().cast::<libc::c_char>(),
                message.len(),
                0,
                &deadline,
            )
        };
        if rc == -1 {
            return Err(ChannelError::Send {
                name: self.name.path(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Send under a bounded retry policy.
    ///
    /// Interrupted and timed-out attempts are repeated; the last transient
    /// error is returned once the attempts are exhausted.
    pub fn send_with_policy(&self, message: &[u8], policy: &SendPolicy) -> Result<()> {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.send_timeout(message, policy.attempt_timeout) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() && attempt < attempts => {
                    debug!(queue = %self.name.path(), attempt, error = %err, "retrying send");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Receive one message into `buf`, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when the wait expired or was interrupted. `buf`
    /// must be at least [`QueueAttributes::max_message_size`] bytes long.
    pub fn receive_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        let deadline = realtime_deadline(timeout);

        // SAFETY: `buf` is valid for writes of `buf.len()` bytes, a null
        // priority pointer is permitted, and `deadline` outlives the call.
        let read = unsafe {
            libc::mq_timedreceive(
                self.mqd,
                buf.as_mut_ptr().cast::<libc::c_char>(),
                buf.len(),
                std::ptr::null_mut(),
                &deadline,
            )
        };
        if read < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => Ok(None),
                _ => Err(ChannelError::Receive {
                    name: self.name.path(),
                    source: err,
                }),
            };
        }
        Ok(Some(read as usize))
    }

    /// A zeroed buffer large enough for any message on this queue.
    pub fn receive_buffer(&self) -> Vec<u8> {
        vec![0u8; self.attrs.max_message_size]
    }

    /// Query current attributes, including the number of queued messages.
    pub fn attributes(&self) -> Result<QueueAttributes> {
        // SAFETY: mq_attr is a plain C struct for which all-zero is a valid value.
        let mut raw: libc::mq_attr = unsafe { std::mem::zeroed() };

        // SAFETY: `raw` is a valid writable mq_attr and `self.mqd` is open.
        let rc = unsafe { libc::mq_getattr(self.mqd, &mut raw) };
        if rc == -1 {
            return Err(ChannelError::Attributes {
                name: self.name.path(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(QueueAttributes {
            max_messages: raw.mq_maxmsg as usize,
            max_message_size: raw.mq_msgsize as usize,
            current_messages: raw.mq_curmsgs as usize,
        })
    }

    /// Sizing observed when the descriptor was opened.
    pub fn limits(&self) -> QueueAttributes {
        self.attrs
    }

    /// The channel this descriptor belongs to.
    pub fn name(&self) -> &ChannelName {
        &self.name
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        // SAFETY: `self.mqd` was returned by mq_open and is closed exactly once.
        let rc = unsafe { libc::mq_close(self.mqd) };
        if rc == -1 {
            debug!(
                queue = %self.name.path(),
                error = %io::Error::last_os_error(),
                "mq_close failed"
            );
        }
    }
}

fn realtime_deadline(timeout: Duration) -> libc::timespec {
    // mq_timed* take an absolute CLOCK_REALTIME deadline; SystemTime reads the same clock.
    let at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .saturating_add(timeout);

    // SAFETY: timespec is a plain C struct for which all-zero is a valid value.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    ts.tv_sec = at.as_secs() as libc::time_t;
    ts.tv_nsec = at.subsec_nanos() as libc::c_long;
    ts
}
