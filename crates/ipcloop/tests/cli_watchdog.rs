#![cfg(all(target_os = "linux", feature = "cli"))]

use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use ipcloop::channel::{ChannelName, MessageQueue, QueueAccess};

fn unique_name(tag: &str) -> String {
    format!(
        "wd-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    )
}

fn spawn_serve(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_ipcloop"))
        .arg("serve")
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve should spawn")
}

fn wait_for_queue(name: &ChannelName) {
    let start = Instant::now();
    while MessageQueue::open(name, QueueAccess::Write).is_err() {
        assert!(start.elapsed() < Duration::from_secs(5), "queue never appeared");
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Some(status) = child.try_wait().expect("child should be pollable") {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(25));
    }
    None
}

#[test]
fn unfed_watchdog_aborts_process() {
    let name = unique_name("starve");
    let channel = ChannelName::new(&name).unwrap();
    let mut child = spawn_serve(&[&name, "--watchdog", "1", "--no-feed"]);
    wait_for_queue(&channel);

    let status = wait_with_timeout(&mut child, Duration::from_secs(5));
    let _ = MessageQueue::unlink(&channel);

    let status = status.unwrap_or_else(|| {
        let _ = child.kill();
        panic!("unfed worker was not aborted");
    });
    assert_eq!(status.signal(), Some(libc::SIGABRT));
}

#[test]
fn fed_watchdog_keeps_process_alive() {
    let name = unique_name("fed");
    let channel = ChannelName::new(&name).unwrap();
    let mut child = spawn_serve(&[&name, "--watchdog", "1"]);
    wait_for_queue(&channel);

    let early_exit = wait_with_timeout(&mut child, Duration::from_millis(2500));
    assert!(early_exit.is_none(), "fed worker exited: {early_exit:?}");

    // SAFETY: the pid belongs to a child we spawned and have not reaped.
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);

    let status = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap_or_else(|| {
        let _ = child.kill();
        panic!("worker ignored SIGINT");
    });
    assert!(status.success(), "worker exited with {status:?}");
    assert!(MessageQueue::open(&channel, QueueAccess::Write).is_err());
}
