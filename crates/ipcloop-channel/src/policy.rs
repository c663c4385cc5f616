use std::time::Duration;

/// Bounded retry policy for sends.
///
/// Each attempt blocks for at most `attempt_timeout`. Interrupted or
/// timed-out attempts are repeated until `max_attempts` have been made;
/// any other failure ends the send immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPolicy {
    /// Upper bound on a single blocking send.
    pub attempt_timeout: Duration,
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
}

impl SendPolicy {
    /// Worst-case time a send may block under this policy.
    pub fn budget(&self) -> Duration {
        self.attempt_timeout.saturating_mul(self.max_attempts.max(1))
    }
}

impl Default for SendPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(300),
            max_attempts: 10,
        }
    }
}
