use std::fmt;
use std::io;

use ipcloop::channel::ChannelError;
use ipcloop::envelope::EnvelopeError;
use ipcloop::transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind()), format!("{context}: {err}"))
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::InvalidName { .. } | ChannelError::NameTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        ChannelError::MessageTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ChannelError::Create { ref source, .. }
        | ChannelError::Open { ref source, .. }
        | ChannelError::Send { ref source, .. }
        | ChannelError::Receive { ref source, .. }
        | ChannelError::Unlink { ref source, .. }
        | ChannelError::Attributes { ref source, .. } => {
            CliError::new(io_code(source.kind()), format!("{context}: {err}"))
        }
    }
}

pub fn envelope_error(context: &str, err: EnvelopeError) -> CliError {
    match err {
        EnvelopeError::ReplyTypeAsRequest(_) | EnvelopeError::InvalidType(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Channel(err) => channel_error(context, err),
        TransportError::Envelope(err) => envelope_error(context, err),
        TransportError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::InvalidRequestType(_) | TransportError::NoReplyAddress => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_queue_maps_to_transport_error() {
        let err = ChannelError::Open {
            name: "/ghost".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let cli = transport_error("send failed", TransportError::Channel(err));
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.contains("/ghost"));
    }

    #[test]
    fn reply_timeout_maps_to_timeout() {
        let cli = transport_error(
            "request failed",
            TransportError::Timeout(Duration::from_secs(3)),
        );
        assert_eq!(cli.code, TIMEOUT);
    }

    #[test]
    fn oversized_content_is_data_invalid() {
        let cli = transport_error(
            "send failed",
            TransportError::Envelope(EnvelopeError::ContentTooLarge { size: 300, max: 255 }),
        );
        assert_eq!(cli.code, DATA_INVALID);
    }

    #[test]
    fn bad_names_are_usage_errors() {
        let err = ChannelError::InvalidName {
            name: "a/b".to_string(),
            reason: "contains '/'",
        };
        assert_eq!(channel_error("init failed", err).code, USAGE);
    }
}
