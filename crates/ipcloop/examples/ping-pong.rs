//! Two transports in one process: `pong` answers, `ping` makes sync calls.
//!
//! Run with:
//!   cargo run -p ipcloop --example ping-pong

use std::sync::Arc;
use std::thread;

use ipcloop::{Envelope, Reply, Transport, TransportHandle};

const PING: i32 = 100;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let pong_name = format!("pong-{}", std::process::id());
    let ping_name = format!("ping-{}", std::process::id());

    let pong = Arc::new(Transport::init(
        &pong_name,
        |req: &Envelope, t: &TransportHandle| {
            let answer = format!("pong {}", req.content_str().unwrap_or("?"));
            if let Err(err) = t.send_reply(req, Reply::new(0, answer)) {
                eprintln!("reply failed: {err}");
            }
        },
    )?);
    let ping = Arc::new(Transport::init(&ping_name, |_: &Envelope, _: &TransportHandle| {})?);

    let loops: Vec<_> = [Arc::clone(&pong), Arc::clone(&ping)]
        .into_iter()
        .map(|t| thread::spawn(move || t.main_loop()))
        .collect();

    for n in 0..5 {
        let reply = ping.send_sync(&pong_name, Envelope::new(PING, n.to_string()))?;
        println!("{} -> {:?}", n, reply.content_str());
    }

    pong.stop_loop();
    ping.stop_loop();
    for handle in loops {
        handle.join().map_err(|_| "main loop panicked")??;
    }
    println!("ping stats: {:?}", ping.stats());
    Ok(())
}
