//! Timer futures backed by the reactor's timer heap.
//!
//! There is no in-flight cancellation of I/O; [`timeout`] is the timeout
//! primitive. It races the wrapped future against a [`Sleep`] and whichever
//! finishes first wins, the loser being dropped.

use crate::runtime::reactor::TimerSlot;
use crate::status;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// A future that completes once its deadline has passed.
///
/// The deadline is a lower bound: the future never completes early, and
/// completes on the first reactor cycle at or after the deadline. Dropping a
/// `Sleep` cancels it; the heap entry is discarded unfired.
pub struct Sleep {
    deadline: Instant,
    slot: Option<Rc<RefCell<TimerSlot>>>,
}

impl Sleep {
    /// The absolute deadline.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Completes after `duration` has elapsed.
#[must_use]
pub fn sleep(duration: Duration) -> Sleep {
    sleep_until(Instant::now() + duration)
}

/// Completes once `deadline` has passed.
#[must_use]
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        slot: None,
    }
}

impl Future for Sleep {
    type Output = ();

    /// # Panics
    ///
    /// Panics if polled without a runtime on this thread.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = &mut *self;
        if let Some(slot) = &this.slot {
            let mut slot = slot.borrow_mut();
            if slot.fired {
                return Poll::Ready(());
            }
            slot.waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        if Instant::now() >= this.deadline {
            return Poll::Ready(());
        }
        let inner = crate::runtime::try_current()
            .expect("sleep requires a running skiff runtime on this thread");
        let slot = Rc::new(RefCell::new(TimerSlot {
            fired: false,
            waker: Some(cx.waker().clone()),
        }));
        inner.register_timer(this.deadline, &slot);
        this.slot = Some(slot);
        Poll::Pending
    }
}

/// Error returned by [`timeout`] when the deadline passes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("deadline elapsed")
    }
}

impl std::error::Error for Elapsed {}

impl From<Elapsed> for status::Error {
    fn from(_: Elapsed) -> Self {
        status::transient_error("deadline elapsed")
    }
}

/// Runs `future` for at most `duration`.
///
/// The future is polled first on every wake, so completion wins a tie
/// against the deadline.
pub async fn timeout<F: Future>(
    duration: Duration,
    future: F,
) -> std::result::Result<F::Output, Elapsed> {
    let mut future = std::pin::pin!(future);
    let mut deadline = std::pin::pin!(sleep(duration));
    std::future::poll_fn(move |cx| {
        if let Poll::Ready(output) = future.as_mut().poll(cx) {
            return Poll::Ready(Ok(output));
        }
        match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(Elapsed)),
            Poll::Pending => Poll::Pending,
        }
    })
    .await
}
