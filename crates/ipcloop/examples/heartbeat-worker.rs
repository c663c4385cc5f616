//! A worker that owns a channel, keeps its watchdog fed from heartbeats,
//! and exits on the first application request.
//!
//! Run with:
//!   cargo run -p ipcloop --example heartbeat-worker
//!
//! In another terminal:
//!   cargo run -p ipcloop --features cli -- send heartbeat-worker --type 1 --data bye

use std::time::Duration;

use ipcloop::{global, Envelope, TransportHandle, WATCHDOG};

fn handle(request: &Envelope, transport: &TransportHandle) {
    if request.msg_type == WATCHDOG {
        if let Err(err) = transport.watchdog_feed() {
            eprintln!("watchdog feed failed: {err}");
        }
        return;
    }
    eprintln!(
        "type {} from {:?}: {:?}; stopping",
        request.msg_type,
        request.source,
        request.content_str()
    );
    transport.stop_loop();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    global::init("heartbeat-worker", handle)?;
    global::watchdog_init(Duration::from_secs(2))?;
    eprintln!("listening on /heartbeat-worker");

    global::main_loop()?;
    global::deinit()?;
    Ok(())
}
