//! The single-threaded runtime: executor loop, reactor, and promises.
//!
//! One [`Runtime`] drives everything on its thread. Each loop cycle fires
//! due timers, runs every woken task to its next suspension point, and only
//! then polls the kernel for readiness. Readiness dispatch wakes waiters
//! instead of invoking them, so a continuation that re-arms the handle it
//! was woken for never re-enters the poll.
//!
//! Tasks, promises, sockets, and timers are single-threaded by design and
//! carry no synchronization; using them from another thread is a
//! programming error.

pub mod promise;
pub(crate) mod reactor;
mod task;

pub use promise::{promise, Promise, Resolve};
pub use task::JoinHandle;

use crate::status;
use polling::{Event, Poller};
use std::cell::{Cell, RefCell};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::future::Future;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use reactor::{IoSlot, TimerEntry};
use task::{TaskEntry, TaskWaker};

thread_local! {
    static CURRENT: RefCell<Option<Rc<Inner>>> = const { RefCell::new(None) };
}

/// Readiness events are polled in batches of at least this many.
const EVENT_BATCH: usize = 64;

/// The reactor-backed executor. All spawned tasks, timers, and registered
/// sockets belong to exactly one runtime and run on the thread that calls
/// [`Runtime::block_on`] or [`Runtime::run`].
pub struct Runtime {
    inner: Rc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) poller: Poller,
    tasks: RefCell<HashMap<u64, TaskEntry>>,
    ready: RefCell<VecDeque<u64>>,
    next_task_id: Cell<u64>,
    pub(crate) timers: RefCell<BinaryHeap<TimerEntry>>,
    pub(crate) timer_seq: Cell<u64>,
    pub(crate) io: RefCell<HashMap<usize, IoSlot>>,
    pub(crate) next_token: Cell<usize>,
}

impl Runtime {
    /// Creates a runtime, allocating the readiness notification handle.
    ///
    /// # Errors
    ///
    /// Fails if the kernel poller cannot be created.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            inner: Rc::new(Inner {
                poller: Poller::new()?,
                tasks: RefCell::new(HashMap::new()),
                ready: RefCell::new(VecDeque::new()),
                next_task_id: Cell::new(0),
                timers: RefCell::new(BinaryHeap::new()),
                timer_seq: Cell::new(0),
                io: RefCell::new(HashMap::new()),
                next_token: Cell::new(0),
            }),
        })
    }

    /// Spawns a task onto this runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        spawn_on(&self.inner, future)
    }

    /// Runs the loop until `future` completes, then returns its output.
    ///
    /// Other spawned tasks keep running while the root future is pending.
    ///
    /// # Errors
    ///
    /// A poll failure other than an interrupt is fatal and returned; so is a
    /// root task that terminates without producing a value (a panic).
    pub fn block_on<F>(&self, future: F) -> status::Result<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let _guard = self.enter();
        let handle = spawn_on(&self.inner, future);
        self.drive(|| handle.is_finished())?;
        if handle.is_finished() {
            Ok(handle.into_output())
        } else {
            Err(status::unknown_error(
                "root task terminated without completing",
            ))
        }
    }

    /// Runs the loop until no live tasks remain.
    ///
    /// # Errors
    ///
    /// A poll failure other than an interrupt is fatal and returned.
    pub fn run(&self) -> status::Result<()> {
        let _guard = self.enter();
        self.drive(|| false)
    }

    fn enter(&self) -> EnterGuard {
        EnterGuard {
            previous: CURRENT
                .with(|current| current.borrow_mut().replace(Rc::clone(&self.inner))),
        }
    }

    /// One iteration: run woken tasks, then wait for the next timer or
    /// readiness event, fire due timers, and dispatch the events. Timers
    /// always fire before the cycle's I/O continuations.
    fn drive(&self, mut finished: impl FnMut() -> bool) -> status::Result<()> {
        let inner = &self.inner;
        let mut events: Vec<Event> = Vec::with_capacity(EVENT_BATCH);
        loop {
            inner.run_ready();
            if finished() || inner.tasks.borrow().is_empty() {
                return Ok(());
            }
            let timeout = inner.next_timeout();
            events.clear();
            match inner.poller.wait(&mut events, timeout) {
                Ok(_) => {}
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    tracing::error!(?error, "reactor poll failed");
                    return Err(error.into());
                }
            }
            inner.fire_due_timers();
            inner.dispatch(&events);
        }
    }
}

struct EnterGuard {
    previous: Option<Rc<Inner>>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        CURRENT.with(|current| *current.borrow_mut() = self.previous.take());
    }
}

impl Inner {
    /// Polls every task woken so far, including tasks woken while this
    /// phase runs. Each pass drains a snapshot of the queue so a task that
    /// wakes itself cannot starve the kernel poll.
    fn run_ready(&self) {
        loop {
            let batch: Vec<u64> = {
                let mut queue = self.ready.borrow_mut();
                if queue.is_empty() {
                    return;
                }
                queue.drain(..).collect()
            };
            for id in batch {
                self.poll_task(id);
            }
        }
    }

    fn poll_task(&self, id: u64) {
        let Some(mut entry) = self.tasks.borrow_mut().remove(&id) else {
            return;
        };
        let waker = entry.waker.clone();
        let mut cx = Context::from_waker(&waker);
        match panic::catch_unwind(AssertUnwindSafe(|| entry.future.as_mut().poll(&mut cx))) {
            Ok(Poll::Pending) => {
                self.tasks.borrow_mut().insert(id, entry);
            }
            Ok(Poll::Ready(())) => {}
            Err(payload) => {
                tracing::error!(task = id, message = panic_message(&payload), "task panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}

/// Spawns a task onto the runtime running on this thread.
///
/// The task is scheduled immediately and gets its first poll in the current
/// cycle, before the next kernel poll.
///
/// # Panics
///
/// Panics if no runtime is running on this thread.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let inner = try_current().expect("spawn requires a running skiff runtime on this thread");
    spawn_on(&inner, future)
}

fn spawn_on<F>(inner: &Rc<Inner>, future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let (resolve, promise) = promise();
    let id = inner.next_task_id.get();
    inner.next_task_id.set(id + 1);
    let waker = Waker::from(Arc::new(TaskWaker { id }));
    let future: Pin<Box<dyn Future<Output = ()>>> = Box::pin(async move {
        resolve.resolve(future.await);
    });
    inner
        .tasks
        .borrow_mut()
        .insert(id, TaskEntry { future, waker });
    inner.ready.borrow_mut().push_back(id);
    JoinHandle::new(promise)
}

/// Pushes a task id onto the current runtime's ready queue. No-op when the
/// runtime is gone (a waker outlived its runtime).
pub(crate) fn schedule(id: u64) {
    CURRENT.with(|current| {
        if let Some(inner) = current.borrow().as_ref() {
            inner.ready.borrow_mut().push_back(id);
        }
    });
}

pub(crate) fn try_current() -> Option<Rc<Inner>> {
    CURRENT.with(|current| current.borrow().clone())
}
