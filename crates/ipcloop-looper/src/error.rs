/// Errors reported by a [`Looper`](crate::Looper).
#[derive(Debug, thiserror::Error)]
pub enum LooperError {
    /// `start` was called while the worker thread is running.
    #[error("looper {name} is already running")]
    AlreadyRunning { name: String },

    /// `stop` was called while no worker thread is running.
    #[error("looper {name} is already stopped")]
    AlreadyStopped { name: String },

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker for looper {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    /// The queue could not grow; the payload was released unhandled.
    #[error("looper {name} could not allocate queue space; work item dropped")]
    QueueAlloc { name: String },

    /// `stop` was called from the looper's own worker thread.
    #[error("looper {name} cannot be stopped from its own worker thread")]
    StopFromWorker { name: String },

    /// The handler was lost to a failed spawn or a crashed worker; the
    /// looper cannot be started again.
    #[error("looper {name} lost its handler and cannot restart")]
    HandlerLost { name: String },
}

pub type Result<T> = std::result::Result<T, LooperError>;
