#![cfg(all(target_os = "linux", feature = "cli"))]

use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use ipcloop::channel::{ChannelName, MessageQueue, QueueAccess};

fn unique_name(tag: &str) -> String {
    format!(
        "cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    )
}

fn ipcloop(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ipcloop"))
        .args(args)
        .output()
        .expect("ipcloop should run")
}

fn spawn_serve(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_ipcloop"))
        .arg("serve")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve should spawn")
}

fn wait_for_queue(name: &str, timeout: Duration) {
    let name = ChannelName::new(name).expect("valid name");
    let start = Instant::now();
    while MessageQueue::open(&name, QueueAccess::Write).is_err() {
        assert!(start.elapsed() < timeout, "queue {name} never appeared");
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::process::ExitStatus {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().expect("child should be pollable") {
            return status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("child did not exit within {timeout:?}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn version_prints_package_version() {
    let out = ipcloop(&["version"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn sync_send_prints_reply_from_server() {
    let server = unique_name("srv");
    let mut child = spawn_serve(&[&server, "--reply", "pong", "--count", "1", "--format", "json"]);
    wait_for_queue(&server, Duration::from_secs(5));

    let out = ipcloop(&[
        "send", &server, "--type", "7", "--data", "ping", "--sync", "--format", "json",
    ]);
    assert!(
        out.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let reply: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("reply should be JSON");
    assert_eq!(reply["event"], "reply");
    assert_eq!(reply["msg_type"], 10_007);
    assert_eq!(reply["content"], "pong");

    let status = wait_with_timeout(&mut child, Duration::from_secs(5));
    assert!(status.success());
    let served = child.wait_with_output().expect("serve output");
    let request: serde_json::Value = serde_json::from_slice(&served.stdout)
        .expect("request line should be JSON");
    assert_eq!(request["msg_type"], 7);
    assert_eq!(request["content"], "ping");
}

#[test]
fn async_send_reaches_server() {
    let server = unique_name("async");
    let mut child = spawn_serve(&[&server, "--count", "1", "--format", "json"]);
    wait_for_queue(&server, Duration::from_secs(5));

    let out = ipcloop(&["send", &server, "--type", "3", "--data", "hello", "--from", "cli"]);
    assert!(out.status.success());

    let status = wait_with_timeout(&mut child, Duration::from_secs(5));
    assert!(status.success());
    let served = child.wait_with_output().expect("serve output");
    let request: serde_json::Value = serde_json::from_slice(&served.stdout).unwrap();
    assert_eq!(request["source"], "cli");
    assert_eq!(request["correlation"], 0);
}

#[test]
fn send_to_missing_channel_fails() {
    let started = Instant::now();
    let out = ipcloop(&["send", &unique_name("ghost"), "--type", "1", "--data", "boo"]);
    assert_eq!(out.status.code(), Some(3));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn send_rejects_reply_types() {
    let out = ipcloop(&["send", "anyone", "--type", "10001"]);
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn info_reports_queue_limits() {
    let name = unique_name("info");
    let queue = MessageQueue::create(&ChannelName::new(&name).unwrap(), Default::default())
        .expect("queue should be creatable");

    let out = ipcloop(&["info", &name, "--format", "json"]);
    assert!(out.status.success());
    let info: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(info["queue"], format!("/{name}"));
    assert_eq!(info["max_messages"], 10);
    assert_eq!(info["max_message_size"], 4096);

    drop(queue);
    let out = ipcloop(&["unlink", &name]);
    assert!(out.status.success());
    let out = ipcloop(&["unlink", &name]);
    assert_eq!(out.status.code(), Some(1));
    let out = ipcloop(&["unlink", &name, "--force"]);
    assert!(out.status.success());
}
