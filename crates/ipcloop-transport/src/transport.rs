use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use ipcloop_channel::{ChannelName, MessageQueue, SendPolicy};
use ipcloop_envelope::{decode_message, is_request, reply_type_for, type_name, Envelope, Message, Reply};
use ipcloop_looper::Looper;
use ipcloop_watchdog::{heartbeat_period, IntervalTimer, TimerError, TimerMode, Watchdog};
use tracing::{debug, error, info, trace, warn};

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::pending::{Completion, PendingReplies};
use crate::stats::{Counters, TransportStats};
use crate::stop::StopSignal;

/// Application callback for inbound requests.
///
/// Runs on the looper thread, one request at a time, in arrival order.
/// The handle can be used to reply, send, feed the watchdog or stop the loop.
pub trait RequestHandler: Send + 'static {
    fn handle(&mut self, request: &Envelope, transport: &TransportHandle);
}

impl<F> RequestHandler for F
where
    F: FnMut(&Envelope, &TransportHandle) + Send + 'static,
{
    fn handle(&mut self, request: &Envelope, transport: &TransportHandle) {
        self(request, transport)
    }
}

struct Supervision {
    interval: Duration,
    heartbeat: IntervalTimer,
    watchdog: Watchdog,
}

impl Supervision {
    /// Arm both timers, or neither.
    fn arm(&self) -> Result<()> {
        let armed = self.watchdog.start(self.interval).and_then(|()| {
            self.heartbeat
                .start(heartbeat_period(self.interval), TimerMode::Periodic)
        });
        if let Err(err) = armed {
            self.disarm();
            return Err(err.into());
        }
        Ok(())
    }

    fn disarm(&self) {
        self.heartbeat.stop();
        if let Err(err) = self.watchdog.stop() {
            warn!(error = %err, "failed to disarm watchdog");
        }
    }
}

struct Shared {
    name: ChannelName,
    config: TransportConfig,
    pending: PendingReplies,
    counters: Counters,
    stop: StopSignal,
    running: AtomicBool,
    supervision: Mutex<Option<Supervision>>,
}

impl Shared {
    fn lock_supervision(&self) -> MutexGuard<'_, Option<Supervision>> {
        self.supervision
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send_heartbeat(&self) {
        let mut heartbeat = Envelope::watchdog();
        heartbeat.source = self.name.as_str().to_owned();
        let sent = heartbeat
            .to_bytes()
            .map_err(TransportError::from)
            .and_then(|bytes| deliver(&self.name, &bytes, &self.config.send_policy));
        match sent {
            Ok(()) => {
                Counters::bump(&self.counters.heartbeats_sent);
                trace!(channel = %self.name, "heartbeat sent");
            }
            Err(err) => {
                Counters::bump(&self.counters.heartbeats_failed);
                warn!(channel = %self.name, error = %err, "heartbeat send failed");
            }
        }
    }

    fn complete_reply(&self, reply: Reply) {
        let correlation = reply.correlation;
        let msg_type = reply.msg_type;
        match self.pending.complete(reply) {
            Completion::Delivered => {
                Counters::bump(&self.counters.replies_received);
                trace!(channel = %self.name, correlation, msg_type, "reply delivered");
            }
            outcome => {
                Counters::bump(&self.counters.unexpected_replies);
                debug!(
                    channel = %self.name,
                    correlation,
                    msg_type,
                    ?outcome,
                    "dropping uncorrelated reply"
                );
            }
        }
    }
}

/// Cheap, cloneable access to a transport's send and control operations.
#[derive(Clone)]
pub struct TransportHandle {
    shared: Arc<Shared>,
}

impl TransportHandle {
    /// This transport's channel name (the reply address it stamps).
    pub fn name(&self) -> &ChannelName {
        &self.shared.name
    }

    /// Fire-and-forget send. Stamps this transport as the source.
    pub fn send_async(&self, dest: &str, mut envelope: Envelope) -> Result<()> {
        check_request_type(envelope.msg_type)?;
        let dest = ChannelName::new(dest)?;
        envelope.source = self.shared.name.as_str().to_owned();
        envelope.correlation = 0;

        deliver(&dest, &envelope.to_bytes()?, &self.shared.config.send_policy)?;
        Counters::bump(&self.shared.counters.sent_async);
        debug!(
            channel = %self.shared.name,
            dest = %dest,
            msg_type = envelope.msg_type,
            kind = type_name(envelope.msg_type),
            "async request sent"
        );
        Ok(())
    }

    /// Send a request and block until its reply arrives or the reply
    /// timeout elapses.
    ///
    /// Only a reply carrying this call's correlation id and the type
    /// `envelope.msg_type + REPLY_BASE` completes the call. The waiter is
    /// unregistered on every exit path.
    pub fn send_sync(&self, dest: &str, mut envelope: Envelope) -> Result<Reply> {
        check_request_type(envelope.msg_type)?;
        let dest = ChannelName::new(dest)?;

        let ticket = self.shared.pending.register(reply_type_for(envelope.msg_type));
        envelope.source = self.shared.name.as_str().to_owned();
        envelope.correlation = ticket.id();

        deliver(&dest, &envelope.to_bytes()?, &self.shared.config.send_policy)?;
        Counters::bump(&self.shared.counters.sent_sync);
        debug!(
            channel = %self.shared.name,
            dest = %dest,
            msg_type = envelope.msg_type,
            correlation = envelope.correlation,
            "sync request sent"
        );

        let timeout = self.shared.config.reply_timeout;
        match ticket.wait(timeout) {
            Some(reply) => Ok(reply),
            None => {
                warn!(
                    channel = %self.shared.name,
                    dest = %dest,
                    msg_type = envelope.msg_type,
                    correlation = envelope.correlation,
                    ?timeout,
                    "sync request timed out"
                );
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    /// Answer `request`, addressing the reply to its source.
    pub fn send_reply(&self, request: &Envelope, reply: Reply) -> Result<()> {
        if request.source.is_empty() {
            return Err(TransportError::NoReplyAddress);
        }
        let dest = ChannelName::new(&request.source)?;
        let reply = reply.answer(request);
        if !request.expects_reply() {
            debug!(dest = %dest, msg_type = request.msg_type, "replying to an uncorrelated request");
        }

        deliver(&dest, &reply.to_bytes()?, &self.shared.config.send_policy)?;
        Counters::bump(&self.shared.counters.replies_sent);
        trace!(
            channel = %self.shared.name,
            dest = %dest,
            msg_type = reply.msg_type,
            correlation = reply.correlation,
            "reply sent"
        );
        Ok(())
    }

    /// Configure the heartbeat timer and watchdog for `interval`.
    ///
    /// Timers are armed when `main_loop` starts, or immediately if it is
    /// already running. Calling again replaces the previous configuration.
    pub fn watchdog_init(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(TimerError::ZeroInterval.into());
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let heartbeat = IntervalTimer::new(format!("{}-heartbeat", self.shared.name), move || {
            if let Some(shared) = weak.upgrade() {
                shared.send_heartbeat();
            }
        })?;
        let watchdog = Watchdog::new(self.shared.config.watchdog_action.clone())?;
        let supervision = Supervision {
            interval,
            heartbeat,
            watchdog,
        };

        let mut slot = self.shared.lock_supervision();
        if self.shared.running.load(Ordering::Acquire) {
            supervision.arm()?;
        }
        let previous = slot.replace(supervision);
        drop(slot);
        drop(previous);

        info!(
            channel = %self.shared.name,
            ?interval,
            heartbeat = ?heartbeat_period(interval),
            "watchdog configured"
        );
        Ok(())
    }

    /// Restart the watchdog countdown. A no-op while the watchdog is not armed.
    pub fn watchdog_feed(&self) -> Result<()> {
        let slot = self.shared.lock_supervision();
        match slot.as_ref() {
            Some(supervision) if supervision.watchdog.is_armed() => {
                supervision.watchdog.feed()?;
            }
            _ => debug!(channel = %self.shared.name, "watchdog feed ignored: not armed"),
        }
        Ok(())
    }

    /// Ask `main_loop` to return. It does so within one receive poll.
    pub fn stop_loop(&self) {
        self.shared.stop.trigger();
        info!(channel = %self.shared.name, "stop requested");
    }

    /// True while the watchdog is counting down.
    pub fn watchdog_armed(&self) -> bool {
        self.shared
            .lock_supervision()
            .as_ref()
            .is_some_and(|supervision| supervision.watchdog.is_armed())
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.shared.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of sync calls currently waiting for a reply.
    pub fn pending_replies(&self) -> usize {
        self.shared.pending.len()
    }

    pub fn stats(&self) -> TransportStats {
        self.shared.counters.snapshot()
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle")
            .field("name", &self.shared.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// A process's endpoint: its own receive channel, a looper that runs the
/// request handler, and optional watchdog supervision.
pub struct Transport {
    handle: TransportHandle,
    queue: MessageQueue,
    looper: Looper<Envelope>,
    closed: bool,
}

impl Transport {
    /// Create the receive channel `/name` and start the request looper.
    pub fn init(name: &str, handler: impl RequestHandler) -> Result<Self> {
        Self::init_with_config(name, handler, TransportConfig::default())
    }

    /// Initialize with explicit configuration.
    pub fn init_with_config(
        name: &str,
        handler: impl RequestHandler,
        config: TransportConfig,
    ) -> Result<Self> {
        let name = ChannelName::new(name)?;
        let queue = MessageQueue::create(&name, config.queue)?;

        let handle = TransportHandle {
            shared: Arc::new(Shared {
                name: name.clone(),
                config,
                pending: PendingReplies::new(),
                counters: Counters::default(),
                stop: StopSignal::new(),
                running: AtomicBool::new(false),
                supervision: Mutex::new(None),
            }),
        };

        let looper_handle = handle.clone();
        let mut handler = handler;
        let looper = Looper::with_handler(name.as_str(), move |request: &Envelope| {
            handler.handle(request, &looper_handle);
        });
        if let Err(err) = looper.start() {
            error!(channel = %name, error = %err, "failed to start request looper");
            if let Err(unlink_err) = MessageQueue::unlink(&name) {
                warn!(channel = %name, error = %unlink_err, "failed to unlink channel");
            }
            return Err(err.into());
        }

        info!(channel = %name, "transport initialized");
        Ok(Self {
            handle,
            queue,
            looper,
            closed: false,
        })
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    pub fn name(&self) -> &ChannelName {
        self.handle.name()
    }

    pub fn watchdog_init(&self, interval: Duration) -> Result<()> {
        self.handle.watchdog_init(interval)
    }

    pub fn watchdog_feed(&self) -> Result<()> {
        self.handle.watchdog_feed()
    }

    pub fn send_async(&self, dest: &str, envelope: Envelope) -> Result<()> {
        self.handle.send_async(dest, envelope)
    }

    pub fn send_sync(&self, dest: &str, envelope: Envelope) -> Result<Reply> {
        self.handle.send_sync(dest, envelope)
    }

    pub fn send_reply(&self, original: &Envelope, reply: Reply) -> Result<()> {
        self.handle.send_reply(original, reply)
    }

    pub fn stop_loop(&self) {
        self.handle.stop_loop();
    }

    pub fn stats(&self) -> TransportStats {
        self.handle.stats()
    }

    /// Receive and route messages until `stop_loop` is called.
    ///
    /// Arms the heartbeat timer and watchdog on entry and disarms them on
    /// return. Replies are matched to waiting `send_sync` calls on this
    /// thread; requests are queued to the looper. Malformed messages and
    /// uncorrelated replies are dropped and counted.
    pub fn main_loop(&self) -> Result<()> {
        let shared = &self.handle.shared;
        if shared.running.swap(true, Ordering::AcqRel) {
            warn!(channel = %shared.name, "main loop already running");
            return Err(TransportError::AlreadyRunning);
        }
        let _running = RunningGuard(&shared.running);

        if let Some(supervision) = shared.lock_supervision().as_ref() {
            supervision.arm()?;
        }
        info!(channel = %shared.name, "main loop started");

        let poll = shared.config.receive_poll;
        let mut buf = self.queue.receive_buffer();
        let result = loop {
            if shared.stop.is_triggered() {
                break Ok(());
            }
            match self.queue.receive_timeout(&mut buf, poll) {
                Ok(None) => {}
                Ok(Some(len)) => self.route(&buf[..len]),
                Err(err) => {
                    error!(channel = %shared.name, error = %err, "receive failed, leaving main loop");
                    break Err(err.into());
                }
            }
        };

        if let Some(supervision) = shared.lock_supervision().as_ref() {
            supervision.disarm();
        }
        shared.stop.reset();
        info!(channel = %shared.name, "main loop stopped");
        result
    }

    /// Stop the loop, remove timers, drain the looper and unlink the channel.
    pub fn deinit(mut self) {
        self.shutdown();
    }

    fn route(&self, bytes: &[u8]) {
        let shared = &self.handle.shared;
        match decode_message(bytes) {
            Ok(Message::Reply(reply)) => shared.complete_reply(reply),
            Ok(Message::Request(request)) => {
                Counters::bump(&shared.counters.requests_received);
                trace!(
                    channel = %shared.name,
                    msg_type = request.msg_type,
                    source = %request.source,
                    "request received"
                );
                if let Err(err) = self.looper.dispatch(request) {
                    warn!(channel = %shared.name, error = %err, "request dropped");
                }
            }
            Err(err) => {
                Counters::bump(&shared.counters.malformed_dropped);
                warn!(channel = %shared.name, len = bytes.len(), error = %err, "dropping malformed message");
            }
        }
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let shared = &self.handle.shared;
        shared.stop.trigger();
        let supervision = shared.lock_supervision().take();
        drop(supervision);

        if self.looper.is_running() {
            if let Err(err) = self.looper.stop() {
                warn!(channel = %shared.name, error = %err, "failed to stop request looper");
            }
        }

        match MessageQueue::unlink(&shared.name) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => warn!(channel = %shared.name, error = %err, "failed to unlink channel"),
        }

        info!(channel = %shared.name, stats = ?shared.counters.snapshot(), "transport deinitialized");
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("name", self.name())
            .field("running", &self.handle.is_running())
            .field("looper", &self.looper)
            .finish()
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Send a request without owning a channel.
///
/// The envelope is sent as given; with an empty source it cannot be answered.
pub fn send_async_to(dest: &str, envelope: &Envelope, policy: &SendPolicy) -> Result<()> {
    check_request_type(envelope.msg_type)?;
    let dest = ChannelName::new(dest)?;
    deliver(&dest, &envelope.to_bytes()?, policy)?;
    debug!(dest = %dest, msg_type = envelope.msg_type, "one-shot request sent");
    Ok(())
}

fn check_request_type(msg_type: i32) -> Result<()> {
    if is_request(msg_type) {
        Ok(())
    } else {
        Err(TransportError::InvalidRequestType(msg_type))
    }
}

fn deliver(dest: &ChannelName, message: &[u8], policy: &SendPolicy) -> Result<()> {
    let queue = MessageQueue::open_for_write(dest)?;
    queue.send_with_policy(message, policy)?;
    Ok(())
}
