use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::{Result, TimerError};
use crate::signal::AbortTimer;
use crate::timer::{IntervalTimer, TimerMode};

/// What happens when a watchdog expires unfed.
#[derive(Clone, Default)]
pub enum ExpiryAction {
    /// Raise `SIGABRT`, terminating the process.
    #[default]
    Abort,
    /// Invoke a callback on the watchdog's timer thread.
    Notify(Arc<dyn Fn() + Send + Sync>),
}

impl ExpiryAction {
    pub fn notify<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::Notify(Arc::new(callback))
    }
}

impl std::fmt::Debug for ExpiryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => f.write_str("Abort"),
            Self::Notify(_) => f.write_str("Notify(..)"),
        }
    }
}

/// Heartbeat cadence for a watchdog interval: three quarters of it.
pub fn heartbeat_period(interval: Duration) -> Duration {
    interval * 3 / 4
}

enum Backend {
    Abort(AbortTimer),
    Notify(IntervalTimer),
}

/// A software watchdog.
///
/// Once started it must be fed within every interval. Each feed restarts
/// the full interval.
pub struct Watchdog {
    backend: Backend,
    interval: Mutex<Option<Duration>>,
}

impl Watchdog {
    pub fn new(action: ExpiryAction) -> Result<Self> {
        let backend = match action {
            ExpiryAction::Abort => Backend::Abort(AbortTimer::create()?),
            ExpiryAction::Notify(callback) => Backend::Notify(IntervalTimer::new(
                "watchdog",
                move || {
                    error!("watchdog expired");
                    callback();
                },
            )?),
        };
        Ok(Self {
            backend,
            interval: Mutex::new(None),
        })
    }

    /// Arm with the given interval.
    pub fn start(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(TimerError::ZeroInterval);
        }
        let mut current = self.interval.lock().unwrap_or_else(PoisonError::into_inner);
        self.arm(interval)?;
        *current = Some(interval);
        info!(?interval, "watchdog armed");
        Ok(())
    }

    /// Restart the current interval.
    pub fn feed(&self) -> Result<()> {
        let current = self.interval.lock().unwrap_or_else(PoisonError::into_inner);
        let interval = current.ok_or(TimerError::NotStarted)?;
        self.arm(interval)?;
        debug!("watchdog fed");
        Ok(())
    }

    /// Disarm. A later `start` may arm it again.
    pub fn stop(&self) -> Result<()> {
        let mut current = self.interval.lock().unwrap_or_else(PoisonError::into_inner);
        match &self.backend {
            Backend::Abort(timer) => timer.disarm()?,
            Backend::Notify(timer) => timer.stop(),
        }
        if current.take().is_some() {
            info!("watchdog disarmed");
        }
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        *self.interval.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Disarm and release the underlying timer.
    pub fn remove(self) {
        drop(self);
    }

    fn arm(&self, interval: Duration) -> Result<()> {
        match &self.backend {
            Backend::Abort(timer) => timer.arm(interval),
            Backend::Notify(timer) => timer.start(interval, TimerMode::OneShot),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Backend::Abort(timer) = &self.backend {
            if let Err(err) = timer.disarm() {
                error!(error = %err, "failed to disarm watchdog");
            }
        }
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.backend {
            Backend::Abort(_) => "abort",
            Backend::Notify(_) => "notify",
        };
        f.debug_struct("Watchdog")
            .field("action", &kind)
            .field("interval", &self.interval())
            .finish()
    }
}
