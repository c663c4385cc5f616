//! One process-wide transport behind free functions.
//!
//! `init` creates the instance once; later calls are no-ops. Every other
//! function logs and returns [`TransportError::NotInitialized`] until then.
//!
//! `deinit` detaches the instance at once. If a call such as `main_loop`
//! still holds it on another thread, the channel is unlinked when that call
//! returns. A new `init` on the same channel waits for that teardown.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use ipcloop_channel::ChannelName;
use ipcloop_envelope::{Envelope, Reply};
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::transport::{RequestHandler, Transport, TransportHandle};

/// Upper bound on how long `init` waits for a detached instance to finish.
const TEARDOWN_WAIT: Duration = Duration::from_secs(10);

static INSTANCE: RwLock<Option<Arc<Instance>>> = RwLock::new(None);

/// Channels whose detached instance has not been torn down yet.
static RETIRING: Mutex<Vec<ChannelName>> = Mutex::new(Vec::new());
static RETIRED: Condvar = Condvar::new();

struct Instance {
    // Dropped before `_retire`: the channel is gone once the guard fires.
    transport: Transport,
    _retire: RetireGuard,
}

struct RetireGuard {
    name: ChannelName,
}

impl Drop for RetireGuard {
    fn drop(&mut self) {
        let mut retiring = lock_retiring();
        if let Some(pos) = retiring.iter().position(|name| *name == self.name) {
            retiring.swap_remove(pos);
            debug!(channel = %self.name, "detached transport torn down");
        }
        drop(retiring);
        RETIRED.notify_all();
    }
}

fn lock_retiring() -> MutexGuard<'static, Vec<ChannelName>> {
    RETIRING.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_retiring(name: &str) -> bool {
    lock_retiring().iter().any(|n| n.as_str() == name)
}

/// Block until no detached instance still owns channel `name`.
fn wait_for_teardown(name: &str) -> Result<()> {
    let retiring = lock_retiring();
    let (_retiring, wait) = RETIRED
        .wait_timeout_while(retiring, TEARDOWN_WAIT, |names| {
            names.iter().any(|n| n.as_str() == name)
        })
        .unwrap_or_else(PoisonError::into_inner);
    if wait.timed_out() {
        warn!(channel = name, "previous transport still shutting down");
        return Err(TransportError::ShuttingDown {
            name: name.to_owned(),
        });
    }
    Ok(())
}

pub fn init(name: &str, handler: impl RequestHandler) -> Result<()> {
    init_with_config(name, handler, TransportConfig::default())
}

pub fn init_with_config(
    name: &str,
    handler: impl RequestHandler,
    config: TransportConfig,
) -> Result<()> {
    let mut slot = loop {
        wait_for_teardown(name)?;
        let slot = INSTANCE.write().unwrap_or_else(PoisonError::into_inner);
        // A deinit may have detached this channel since the wait.
        if !is_retiring(name) {
            break slot;
        }
    };
    if let Some(existing) = slot.as_ref() {
        debug!(channel = %existing.transport.name(), requested = name, "transport already initialized");
        return Ok(());
    }
    let transport = Transport::init_with_config(name, handler, config)?;
    let retire = RetireGuard {
        name: transport.name().clone(),
    };
    *slot = Some(Arc::new(Instance {
        transport,
        _retire: retire,
    }));
    Ok(())
}

pub fn is_initialized() -> bool {
    INSTANCE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// A handle to the process-wide transport.
pub fn handle() -> Result<TransportHandle> {
    current(|t| Ok(t.handle()))
}

pub fn watchdog_init(interval: Duration) -> Result<()> {
    current(|t| t.watchdog_init(interval))
}

pub fn watchdog_feed() -> Result<()> {
    current(|t| t.watchdog_feed())
}

pub fn send_async(dest: &str, envelope: Envelope) -> Result<()> {
    current(|t| t.send_async(dest, envelope))
}

pub fn send_sync(dest: &str, envelope: Envelope) -> Result<Reply> {
    current(|t| t.send_sync(dest, envelope))
}

pub fn send_reply(request: &Envelope, reply: Reply) -> Result<()> {
    current(|t| t.send_reply(request, reply))
}

/// Run the receive loop on the calling thread until `stop_loop`.
pub fn main_loop() -> Result<()> {
    current(|t| t.main_loop())
}

pub fn stop_loop() -> Result<()> {
    current(|t| {
        t.stop_loop();
        Ok(())
    })
}

/// Tear down the process-wide transport.
///
/// A `main_loop` still running elsewhere is stopped; teardown completes
/// when it returns.
pub fn deinit() -> Result<()> {
    let mut slot = INSTANCE.write().unwrap_or_else(PoisonError::into_inner);
    let Some(instance) = slot.take() else {
        drop(slot);
        return not_initialized("deinit");
    };
    // Marked under the registry lock so a racing init sees it.
    lock_retiring().push(instance.transport.name().clone());
    drop(slot);

    instance.transport.stop_loop();
    info!(channel = %instance.transport.name(), "releasing process-wide transport");
    drop(instance);
    Ok(())
}

/// Run `op` against the instance without holding the registry lock.
fn current<R>(op: impl FnOnce(&Transport) -> Result<R>) -> Result<R> {
    let instance = INSTANCE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match instance {
        Some(instance) => op(&instance.transport),
        None => not_initialized("transport call"),
    }
}

fn not_initialized<R>(op: &str) -> Result<R> {
    warn!(op, "transport is not initialized");
    Err(TransportError::NotInitialized)
}
