//! Request/reply IPC between processes over named message-queue channels.
//!
//! Each process owns one receive channel. [`Transport::main_loop`] drains
//! it: replies complete the matching [`TransportHandle::send_sync`] call
//! directly, requests go through a looper to the application's
//! [`RequestHandler`] one at a time. An optional watchdog, kept alive by
//! heartbeat requests the transport sends to itself, aborts the process if
//! request handling stalls.

pub mod config;
pub mod error;
pub mod global;
mod pending;
pub mod stats;
pub mod stop;
pub mod transport;

pub use config::TransportConfig;
pub use error::{Result, TransportError};
pub use stats::TransportStats;
pub use stop::StopSignal;
pub use transport::{send_async_to, RequestHandler, Transport, TransportHandle};
