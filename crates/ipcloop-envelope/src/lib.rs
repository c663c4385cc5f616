//! Request/reply envelopes and the type-numbering contract.
//!
//! Every request on the wire is a fixed-size [`Envelope`] carrying:
//! - a type tag (0-8999 application, 9000-9999 infrastructure)
//! - a correlation id, nonzero when the sender waits for a reply
//! - the sender's channel name, used as the reply address
//! - up to 255 bytes of content
//!
//! Replies use the tag `request type + REPLY_BASE`, so a receiver can tell
//! the two apart from the first four bytes alone.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{
    decode_message, peek_type, Envelope, Message, Reply, CONTENT_FIELD_SIZE, ENVELOPE_SIZE,
    MAX_CONTENT_LEN, MAX_SOURCE_LEN, REPLY_SIZE, SOURCE_FIELD_SIZE,
};
pub use error::{EnvelopeError, Result};
pub use types::{
    is_reply, is_request, is_reserved, reply_type_for, request_type_for, type_class, type_name,
    TypeClass, APP_TYPE_MAX, REPLY_BASE, RESERVED_START, WATCHDOG,
};
