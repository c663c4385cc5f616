//! Message-queue IPC runtime for cooperating local processes.
//!
//! Each process owns a named POSIX message queue. Requests arriving on it
//! are handled one at a time, in order, on a looper thread; sync calls
//! block until the correlated reply arrives; an optional watchdog aborts a
//! process whose request handling stops making progress.
//!
//! # Crate Structure
//!
//! - [`channel`]: named, bounded message-queue channels
//! - [`envelope`]: fixed-size request/reply wire format and type numbering
//! - [`looper`]: ordered single-consumer work queue
//! - [`watchdog`]: interval timers and the software watchdog
//! - [`transport`]: init, send/reply, main loop and the process-wide facade

/// Re-export channel types.
pub mod channel {
    pub use ipcloop_channel::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use ipcloop_envelope::*;
}

/// Re-export looper types.
pub mod looper {
    pub use ipcloop_looper::*;
}

/// Re-export timer and watchdog types.
pub mod watchdog {
    pub use ipcloop_watchdog::*;
}

/// Re-export transport types.
pub mod transport {
    pub use ipcloop_transport::*;
}

pub use ipcloop_envelope::{Envelope, Reply, REPLY_BASE, WATCHDOG};
pub use ipcloop_transport::{global, Transport, TransportConfig, TransportError, TransportHandle};
