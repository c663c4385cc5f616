use std::io::ErrorKind;

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to create the process's own queue.
    #[error("failed to create queue {name}: {source}")]
    Create {
        name: String,
        source: std::io::Error,
    },

    /// Failed to open an existing queue.
    #[error("failed to open queue {name}: {source}")]
    Open {
        name: String,
        source: std::io::Error,
    },

    /// A send attempt failed.
    #[error("failed to send to queue {name}: {source}")]
    Send {
        name: String,
        source: std::io::Error,
    },

    /// A receive attempt failed.
    #[error("failed to receive from queue {name}: {source}")]
    Receive {
        name: String,
        source: std::io::Error,
    },

    /// Failed to remove the queue name.
    #[error("failed to unlink queue {name}: {source}")]
    Unlink {
        name: String,
        source: std::io::Error,
    },

    /// Failed to query queue attributes.
    #[error("failed to read attributes of queue {name}: {source}")]
    Attributes {
        name: String,
        source: std::io::Error,
    },

    /// The channel name is not usable as a queue name.
    #[error("invalid channel name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The channel name exceeds the fixed-width name field.
    #[error("channel name too long ({len} bytes, max {max}): {name}")]
    NameTooLong { name: String, len: usize, max: usize },

    /// The message does not fit the queue's maximum message size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl ChannelError {
    /// True when the failure is an interrupted call or an expired attempt
    /// timeout, i.e. the operation may succeed if simply repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            ChannelError::Send { source, .. } | ChannelError::Receive { source, .. } => {
                matches!(
                    source.kind(),
                    ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
                )
            }
            _ => false,
        }
    }

    /// True when the target queue does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ChannelError::Open { source, .. } | ChannelError::Unlink { source, .. } => {
                source.kind() == ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
