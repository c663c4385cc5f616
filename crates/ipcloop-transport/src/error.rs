use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Channel-level error (create, open, send, receive).
    #[error("channel error: {0}")]
    Channel(#[from] ipcloop_channel::ChannelError),

    /// Envelope encode/decode error.
    #[error("envelope error: {0}")]
    Envelope(#[from] ipcloop_envelope::EnvelopeError),

    /// Looper lifecycle or dispatch error.
    #[error("looper error: {0}")]
    Looper(#[from] ipcloop_looper::LooperError),

    /// Heartbeat timer or watchdog error.
    #[error("timer error: {0}")]
    Timer(#[from] ipcloop_watchdog::TimerError),

    /// No correlated reply arrived in time.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The type tag is outside the request range.
    #[error("type {0} cannot be sent as a request")]
    InvalidRequestType(i32),

    /// A reply was requested for an envelope with no source.
    #[error("request has no reply address")]
    NoReplyAddress,

    /// `main_loop` was entered while already running.
    #[error("main loop is already running")]
    AlreadyRunning,

    /// A previous process-wide transport on this channel did not finish
    /// tearing down in time.
    #[error("transport {name} is still shutting down")]
    ShuttingDown { name: String },

    /// The process-wide transport has not been initialized.
    #[error("transport is not initialized")]
    NotInitialized,
}

impl TransportError {
    /// True if the destination channel does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Channel(err) if err.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
