use std::time::Duration;

use ipcloop_channel::{QueueAttributes, SendPolicy};
use ipcloop_watchdog::ExpiryAction;

/// Transport tuning.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Retry policy for every outbound send, heartbeats included.
    pub send_policy: SendPolicy,
    /// How long `send_sync` waits for a correlated reply.
    pub reply_timeout: Duration,
    /// Receive timeout per main-loop iteration; bounds `stop_loop` latency.
    pub receive_poll: Duration,
    /// Sizing of this transport's own receive queue.
    pub queue: QueueAttributes,
    /// What the watchdog does on expiry.
    pub watchdog_action: ExpiryAction,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            send_policy: SendPolicy::default(),
            reply_timeout: Duration::from_secs(3),
            receive_poll: Duration::from_millis(500),
            queue: QueueAttributes::default(),
            watchdog_action: ExpiryAction::Abort,
        }
    }
}
