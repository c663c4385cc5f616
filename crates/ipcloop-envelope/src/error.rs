/// Errors that can occur during envelope encoding/decoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The buffer is shorter than the fixed layout requires.
    #[error("truncated message ({actual} bytes, expected {expected})")]
    Truncated { expected: usize, actual: usize },

    /// The content exceeds the fixed content field.
    #[error("content too large ({size} bytes, max {max})")]
    ContentTooLarge { size: usize, max: usize },

    /// The source name exceeds the fixed source field.
    #[error("source name too long ({len} bytes, max {max})")]
    SourceTooLong { len: usize, max: usize },

    /// The source field is not valid UTF-8.
    #[error("source name is not valid UTF-8")]
    InvalidSource,

    /// A request was built with a reply-space type.
    #[error("type {0} is reserved for replies and cannot be sent as a request")]
    ReplyTypeAsRequest(i32),

    /// The type tag is negative and belongs to no range.
    #[error("type {0} is not a valid message type")]
    InvalidType(i32),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
