use std::io;
use std::time::Duration;

use crate::error::{Result, TimerError};

/// A kernel one-shot timer that raises `SIGABRT` on expiry.
pub(crate) struct AbortTimer {
    id: libc::timer_t,
}

// SAFETY: `timer_t` is an opaque kernel handle. The timer_* calls are
// thread-safe and the handle is only deleted in Drop.
unsafe impl Send for AbortTimer {}
unsafe impl Sync for AbortTimer {}

impl AbortTimer {
    pub(crate) fn create() -> Result<Self> {
        // SAFETY: sigevent is a plain C struct; all-zero is a valid base.
        let mut event: libc::sigevent = unsafe { std::mem::zeroed() };
        event.sigev_notify = libc::SIGEV_SIGNAL;
        event.sigev_signo = libc::SIGABRT;

        let mut id: libc::timer_t = std::ptr::null_mut();
        // SAFETY: event and id are valid for the duration of the call.
        let rc = unsafe { libc::timer_create(libc::CLOCK_MONOTONIC, &mut event, &mut id) };
        if rc == -1 {
            return Err(TimerError::Create(io::Error::last_os_error()));
        }
        Ok(Self { id })
    }

    /// Arm for a single expiry `after` from now. A zero duration disarms.
    pub(crate) fn arm(&self, after: Duration) -> Result<()> {
        let spec = libc::itimerspec {
            it_interval: libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            },
            it_value: libc::timespec {
                tv_sec: after.as_secs() as libc::time_t,
                tv_nsec: after.subsec_nanos() as libc::c_long,
            },
        };
        // SAFETY: id was returned by timer_create and is still live.
        let rc = unsafe { libc::timer_settime(self.id, 0, &spec, std::ptr::null_mut()) };
        if rc == -1 {
            return Err(TimerError::Arm(io::Error::last_os_error()));
        }
        Ok(())
    }

    pub(crate) fn disarm(&self) -> Result<()> {
        self.arm(Duration::ZERO)
    }
}

impl Drop for AbortTimer {
    fn drop(&mut self) {
        // SAFETY: id was returned by timer_create and is deleted only here.
        unsafe {
            libc::timer_delete(self.id);
        }
    }
}
