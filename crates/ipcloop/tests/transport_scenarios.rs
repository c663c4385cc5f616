#![cfg(target_os = "linux")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ipcloop::channel::QueueAttributes;
use ipcloop::watchdog::ExpiryAction;
use ipcloop::{global, Envelope, Reply, Transport, TransportConfig, TransportHandle, WATCHDOG};

fn unique_name(tag: &str) -> String {
    format!(
        "sc-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    )
}

fn small_config() -> TransportConfig {
    TransportConfig {
        receive_poll: Duration::from_millis(50),
        queue: QueueAttributes {
            max_messages: 10,
            max_message_size: 512,
            current_messages: 0,
        },
        watchdog_action: ExpiryAction::notify(|| {}),
        ..TransportConfig::default()
    }
}

const PING: i32 = 1;

// alice runs through the process-wide facade, bob through an explicit
// handle; both live in this one test process.
#[test]
fn alice_and_bob_ping_pong() {
    let alice = unique_name("alice");
    let bob_name = unique_name("bob");

    let bob = Arc::new(
        Transport::init_with_config(
            &bob_name,
            |req: &Envelope, t: &TransportHandle| {
                if req.msg_type == PING {
                    t.send_reply(req, Reply::new(0, "pong")).unwrap();
                }
            },
            small_config(),
        )
        .unwrap(),
    );
    let bob_loop = {
        let bob = Arc::clone(&bob);
        thread::spawn(move || bob.main_loop())
    };

    global::init_with_config(&alice, |_: &Envelope, _: &TransportHandle| {}, small_config())
        .unwrap();
    let alice_loop = thread::spawn(global::main_loop);

    for round in 0..3 {
        let reply = global::send_sync(&bob_name, Envelope::new(PING, format!("ping {round}")))
            .expect("pong should arrive");
        assert_eq!(reply.msg_type, PING + ipcloop::REPLY_BASE);
        assert_eq!(reply.content_str(), Some("pong"));
    }

    global::stop_loop().unwrap();
    alice_loop.join().unwrap().unwrap();
    global::deinit().unwrap();

    bob.stop_loop();
    bob_loop.join().unwrap().unwrap();
    assert_eq!(bob.stats().replies_sent, 3);
}

#[test]
fn heartbeat_keeps_fed_worker_alive() {
    let expired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&expired);
    let config = TransportConfig {
        watchdog_action: ExpiryAction::notify(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
        ..small_config()
    };
    let worker = Arc::new(
        Transport::init_with_config(
            &unique_name("worker"),
            |req: &Envelope, t: &TransportHandle| {
                if req.msg_type == WATCHDOG {
                    t.watchdog_feed().unwrap();
                }
            },
            config,
        )
        .unwrap(),
    );
    worker.watchdog_init(Duration::from_millis(300)).unwrap();
    let worker_loop = {
        let worker = Arc::clone(&worker);
        thread::spawn(move || worker.main_loop())
    };

    thread::sleep(Duration::from_millis(1200));
    assert_eq!(expired.load(Ordering::SeqCst), 0);
    let stats = worker.stats();
    assert!(stats.heartbeats_sent >= 4, "stats: {stats:?}");
    assert_eq!(stats.heartbeats_failed, 0);

    worker.stop_loop();
    worker_loop.join().unwrap().unwrap();
}

#[test]
fn async_send_to_missing_channel_is_bounded() {
    let sender = Transport::init_with_config(
        &unique_name("sender"),
        |_: &Envelope, _: &TransportHandle| {},
        small_config(),
    )
    .unwrap();

    let started = Instant::now();
    let err = sender
        .send_async(&unique_name("ghost"), Envelope::new(PING, "anyone"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(started.elapsed() <= small_config().send_policy.budget());
}
