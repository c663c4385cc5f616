/// Errors that can occur when creating or arming timers.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// The kernel timer could not be created.
    #[error("failed to create timer: {0}")]
    Create(#[source] std::io::Error),

    /// The kernel timer could not be armed or disarmed.
    #[error("failed to arm timer: {0}")]
    Arm(#[source] std::io::Error),

    /// The timer thread could not be spawned.
    #[error("failed to spawn timer thread {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    /// A zero interval was requested.
    #[error("timer interval must be greater than zero")]
    ZeroInterval,

    /// `feed` was called before the watchdog was started.
    #[error("watchdog is not started")]
    NotStarted,
}

pub type Result<T> = std::result::Result<T, TimerError>;
