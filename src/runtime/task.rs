//! Spawned-task bookkeeping.

use crate::runtime::promise::Promise;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake};

/// A stored task: the boxed future plus the waker minted for it at spawn
/// time. Reusing one waker per task keeps `Waker::will_wake` meaningful,
/// which backs the one-waiter-per-direction assertion in the reactor.
pub(crate) struct TaskEntry {
    pub(crate) future: Pin<Box<dyn Future<Output = ()>>>,
    pub(crate) waker: std::task::Waker,
}

/// Waker for a spawned task. Waking pushes the task id onto the current
/// runtime's ready queue; the task itself is polled by the reactor loop,
/// never from inside the wake call.
pub(crate) struct TaskWaker {
    pub(crate) id: u64,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        crate::runtime::schedule(self.id);
    }
}

/// Handle to a spawned task's return value.
///
/// Awaiting the handle yields the task's output. Dropping it detaches the
/// task: the task keeps running and its storage is released when it
/// completes.
pub struct JoinHandle<T> {
    promise: Promise<T>,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(promise: Promise<T>) -> Self {
        Self { promise }
    }

    /// Whether the task has completed and its output is available.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.promise.ready()
    }

    pub(crate) fn into_output(self) -> T {
        self.promise.consume()
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the task panicked, since no output can ever arrive.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.promise).poll(cx)
    }
}
