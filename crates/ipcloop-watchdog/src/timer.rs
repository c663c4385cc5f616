use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, trace};

use crate::error::{Result, TimerError};

/// How an armed timer behaves after it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Fire once, then disarm.
    OneShot,
    /// Fire every interval until stopped.
    Periodic,
}

#[derive(Debug, Clone, Copy)]
struct Schedule {
    next: Instant,
    period: Option<Duration>,
}

struct State {
    armed: Option<Schedule>,
    shutdown: bool,
}

struct Inner {
    name: String,
    state: Mutex<State>,
    wake: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A named timer that invokes a callback on a dedicated thread.
///
/// The timer is created disarmed. The callback never runs while the
/// timer's lock is held, so it may call `start` or `stop` on the same timer
/// through a shared reference.
pub struct IntervalTimer {
    inner: Arc<Inner>,
    thread: Option<JoinHandle<()>>,
}

impl IntervalTimer {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let inner = Arc::new(Inner {
            name: name.clone(),
            state: Mutex::new(State {
                armed: None,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let worker = Arc::clone(&inner);
        let thread = thread::Builder::new()
            .name(format!("timer-{name}"))
            .spawn(move || run_timer(worker, callback))
            .map_err(|source| TimerError::Spawn {
                name: name.clone(),
                source,
            })?;

        debug!(timer = %name, "timer created");
        Ok(Self {
            inner,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Arm the timer. The first expiry is one `interval` from now.
    ///
    /// Re-arming an armed timer replaces its schedule.
    pub fn start(&self, interval: Duration, mode: TimerMode) -> Result<()> {
        if interval.is_zero() {
            return Err(TimerError::ZeroInterval);
        }
        let period = match mode {
            TimerMode::OneShot => None,
            TimerMode::Periodic => Some(interval),
        };
        self.inner.lock().armed = Some(Schedule {
            next: Instant::now() + interval,
            period,
        });
        self.inner.wake.notify_all();
        debug!(timer = %self.inner.name, ?interval, ?mode, "timer armed");
        Ok(())
    }

    /// Disarm the timer. A callback already running is not interrupted.
    pub fn stop(&self) {
        let was_armed = self.inner.lock().armed.take().is_some();
        self.inner.wake.notify_all();
        if was_armed {
            debug!(timer = %self.inner.name, "timer disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.inner.lock().armed.is_some()
    }

    /// Disarm the timer and shut down its thread.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            state.armed = None;
            state.shutdown = true;
        }
        self.inner.wake.notify_all();

        if let Some(handle) = self.thread.take() {
            // A callback dropping its own timer must not join itself.
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!(timer = %self.inner.name, "timer thread panicked");
            }
        }
        debug!(timer = %self.inner.name, "timer removed");
    }
}

impl std::fmt::Debug for IntervalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("name", &self.inner.name)
            .field("armed", &self.is_armed())
            .finish()
    }
}

fn run_timer<F: FnMut()>(inner: Arc<Inner>, mut callback: F) {
    let mut state = inner.lock();
    loop {
        if state.shutdown {
            break;
        }
        let Some(schedule) = state.armed else {
            state = inner.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        let now = Instant::now();
        if now < schedule.next {
            state = inner
                .wake
                .wait_timeout(state, schedule.next - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }

        state.armed = schedule.period.map(|period| Schedule {
            next: (schedule.next + period).max(now),
            period: Some(period),
        });
        drop(state);

        trace!(timer = %inner.name, "timer fired");
        if catch_unwind(AssertUnwindSafe(&mut callback)).is_err() {
            error!(timer = %inner.name, "timer callback panicked");
        }
        state = inner.lock();
    }
}
