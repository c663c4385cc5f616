use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, trace, warn};

use crate::error::{LooperError, Result};

type Handler<T> = Box<dyn FnMut(&T) + Send>;
type Release<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A queued payload tagged with its dispatch sequence number.
#[derive(Debug)]
pub struct WorkItem<T> {
    pub seq: u64,
    pub payload: T,
}

struct Queue<T> {
    items: VecDeque<WorkItem<T>>,
    running: bool,
    next_seq: u64,
}

struct Shared<T> {
    name: String,
    queue: Mutex<Queue<T>>,
    wake: Condvar,
    release: Release<T>,
}

enum Worker<T> {
    Idle(Handler<T>),
    Running(JoinHandle<Handler<T>>),
    Lost,
}

/// Ordered single-consumer work queue.
///
/// `dispatch` may be called from any thread, before or after `start`.
/// Items are handled strictly in dispatch order, one at a time, on the
/// looper's own thread. Each payload is passed to the release callback
/// exactly once: after handling, or when drained by `stop`/drop.
pub struct Looper<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Worker<T>>,
}

impl<T: Send + 'static> Looper<T> {
    /// Create a stopped looper.
    pub fn new<H, R>(name: impl Into<String>, handler: H, release: R) -> Self
    where
        H: FnMut(&T) + Send + 'static,
        R: Fn(T) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                queue: Mutex::new(Queue {
                    items: VecDeque::new(),
                    running: false,
                    next_seq: 0,
                }),
                wake: Condvar::new(),
                release: Arc::new(release),
            }),
            worker: Mutex::new(Worker::Idle(Box::new(handler))),
        }
    }

    /// Create a stopped looper whose payloads are simply dropped after use.
    pub fn with_handler<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: FnMut(&T) + Send + 'static,
    {
        Self::new(name, handler, drop)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Spawn the worker thread.
    ///
    /// Exactly one of several concurrent callers succeeds; the others get
    /// [`LooperError::AlreadyRunning`]. A stopped looper can be started again.
    pub fn start(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        let handler = match std::mem::replace(&mut *worker, Worker::Lost) {
            Worker::Idle(handler) => handler,
            running @ Worker::Running(_) => {
                *worker = running;
                warn!(looper = %self.shared.name, "start ignored: already running");
                return Err(LooperError::AlreadyRunning {
                    name: self.shared.name.clone(),
                });
            }
            Worker::Lost => {
                return Err(LooperError::HandlerLost {
                    name: self.shared.name.clone(),
                });
            }
        };

        self.shared.lock_queue().running = true;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("looper-{}", self.shared.name))
            .spawn(move || run_worker(shared, handler));

        match spawned {
            Ok(handle) => {
                *worker = Worker::Running(handle);
                info!(looper = %self.shared.name, "looper started");
                Ok(())
            }
            Err(source) => {
                self.shared.lock_queue().running = false;
                error!(looper = %self.shared.name, error = %source, "failed to spawn looper worker");
                Err(LooperError::Spawn {
                    name: self.shared.name.clone(),
                    source,
                })
            }
        }
    }

    /// Append a payload and return its sequence number.
    ///
    /// Never blocks on the handler. If the queue cannot grow the payload is
    /// released immediately and [`LooperError::QueueAlloc`] is returned.
    pub fn dispatch(&self, payload: T) -> Result<u64> {
        let mut queue = self.shared.lock_queue();
        if queue.items.try_reserve(1).is_err() {
            drop(queue);
            self.shared.release(payload);
            error!(looper = %self.shared.name, "queue allocation failed, work item released");
            return Err(LooperError::QueueAlloc {
                name: self.shared.name.clone(),
            });
        }

        let seq = queue.next_seq;
        queue.next_seq += 1;
        let was_empty = queue.items.is_empty();
        queue.items.push_back(WorkItem { seq, payload });
        drop(queue);

        if was_empty {
            self.shared.wake.notify_one();
        }
        trace!(looper = %self.shared.name, seq, "work item dispatched");
        Ok(seq)
    }

    /// Stop the worker, wait for it to exit, then release every item that
    /// was still queued without handling it.
    ///
    /// An item already being handled finishes first.
    pub fn stop(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        let handle = match std::mem::replace(&mut *worker, Worker::Lost) {
            Worker::Running(handle) => handle,
            other => {
                *worker = other;
                debug!(looper = %self.shared.name, "stop ignored: not running");
                return Err(LooperError::AlreadyStopped {
                    name: self.shared.name.clone(),
                });
            }
        };

        if handle.thread().id() == thread::current().id() {
            *worker = Worker::Running(handle);
            return Err(LooperError::StopFromWorker {
                name: self.shared.name.clone(),
            });
        }

        self.shared.lock_queue().running = false;
        self.shared.wake.notify_all();

        match handle.join() {
            Ok(handler) => *worker = Worker::Idle(handler),
            Err(_) => {
                error!(looper = %self.shared.name, "looper worker crashed; handler lost");
            }
        }
        drop(worker);

        let drained = self.drain();
        info!(looper = %self.shared.name, drained, "looper stopped");
        Ok(())
    }

    /// Stop (if running) and release all queued work.
    pub fn destroy(self) {
        drop(self);
    }

    /// Whether the worker is accepting work.
    ///
    /// Turns false as soon as `stop` begins, before the in-flight item
    /// finishes.
    pub fn is_running(&self) -> bool {
        self.shared.lock_queue().running
    }

    /// Number of items waiting to be handled.
    pub fn pending(&self) -> usize {
        self.shared.lock_queue().items.len()
    }

    fn drain(&self) -> usize {
        let items = std::mem::take(&mut self.shared.lock_queue().items);
        let count = items.len();
        for item in items {
            trace!(looper = %self.shared.name, seq = item.seq, "releasing unhandled work item");
            self.shared.release(item.payload);
        }
        count
    }

    fn has_worker(&self) -> bool {
        matches!(*lock(&self.worker), Worker::Running(_))
    }
}

impl<T: Send + 'static> Drop for Looper<T> {
    fn drop(&mut self) {
        if self.has_worker() {
            match self.stop() {
                Ok(()) => {}
                Err(LooperError::StopFromWorker { .. }) => {
                    // Dropped by its own handler: the worker exits after this item.
                    self.shared.lock_queue().running = false;
                    self.shared.wake.notify_all();
                    debug!(looper = %self.shared.name, "looper dropped on its worker, detaching");
                }
                Err(err) => {
                    warn!(looper = %self.shared.name, error = %err, "looper stop during drop failed");
                }
            }
        }
        let leftover = self.drain();
        if leftover > 0 {
            debug!(looper = %self.shared.name, leftover, "released queued work on drop");
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for Looper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Looper")
            .field("name", &self.shared.name)
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

impl<T> Shared<T> {
    fn lock_queue(&self) -> MutexGuard<'_, Queue<T>> {
        lock(&self.queue)
    }

    /// Block until an item is available or the looper stops.
    fn next_item(&self) -> Option<WorkItem<T>> {
        let mut queue = self.lock_queue();
        loop {
            if !queue.running {
                return None;
            }
            if let Some(item) = queue.items.pop_front() {
                return Some(item);
            }
            queue = self
                .wake
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self, payload: T) {
        if catch_unwind(AssertUnwindSafe(|| (self.release)(payload))).is_err() {
            error!(looper = %self.name, "release callback panicked");
        }
    }
}

fn run_worker<T>(shared: Arc<Shared<T>>, mut handler: Handler<T>) -> Handler<T> {
    debug!(looper = %shared.name, "looper worker running");
    while let Some(WorkItem { seq, payload }) = shared.next_item() {
        trace!(looper = %shared.name, seq, "handling work item");
        if catch_unwind(AssertUnwindSafe(|| handler(&payload))).is_err() {
            error!(looper = %shared.name, seq, "handler panicked; continuing");
        }
        shared.release(payload);
    }
    debug!(looper = %shared.name, "looper worker exiting");
    handler
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
