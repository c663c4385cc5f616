//! Timers for liveness supervision.
//!
//! [`IntervalTimer`] runs a callback on its own thread, once or
//! periodically. [`Watchdog`] is a one-shot deadline that must be fed
//! before it expires; on expiry it either raises `SIGABRT` through a
//! kernel timer or invokes a callback.

pub mod error;
pub mod timer;
#[cfg(target_os = "linux")]
mod signal;
#[cfg(target_os = "linux")]
pub mod watchdog;

pub use error::{Result, TimerError};
pub use timer::{IntervalTimer, TimerMode};
#[cfg(target_os = "linux")]
pub use watchdog::{heartbeat_period, ExpiryAction, Watchdog};
