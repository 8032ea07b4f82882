//! Reactor internals: socket registrations and the timer heap.
//!
//! The poller hands out one-shot notifications: once an event for a handle
//! fires, the kernel subscription is disarmed and must be re-armed through
//! `modify` before further events arrive. `await_io` re-arms after storing a
//! waiter; `dispatch` re-arms for whichever directions still have one. The
//! `polling` crate folds error and hangup conditions into both directions,
//! so a broken peer wakes readers and writers alike and the subsequent
//! syscall reports the real error.

use super::Inner;
use polling::Event;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::io;
use std::os::fd::RawFd;
use std::rc::{Rc, Weak};
use std::task::{Context, Waker};
use std::time::{Duration, Instant};

/// I/O direction a task may wait on. Each registered handle holds at most
/// one waiter per direction at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Read,
    Write,
}

/// Per-handle reactor state: the raw descriptor plus the parked waiters.
pub(crate) struct IoSlot {
    raw: RawFd,
    reader: Option<Waker>,
    writer: Option<Waker>,
}

/// RAII registration of a descriptor with the current runtime's reactor.
///
/// Dropping the registration removes the kernel subscription and the slot
/// before the owning socket closes the descriptor, so the reactor never
/// holds a stale back-reference.
pub(crate) struct Registration {
    token: usize,
    inner: Weak<Inner>,
}

impl Registration {
    /// Registers `raw` with the runtime running on this thread, with no
    /// initial interest.
    pub(crate) fn new(raw: RawFd) -> io::Result<Self> {
        let inner = super::try_current().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "no skiff runtime on this thread")
        })?;
        let token = inner.register_io(raw)?;
        Ok(Self {
            token,
            inner: Rc::downgrade(&inner),
        })
    }

    /// Parks the task's waker for one direction and re-arms the one-shot
    /// subscription. The caller returns `Poll::Pending` afterwards.
    pub(crate) fn await_ready(&self, direction: Direction, cx: &Context<'_>) -> io::Result<()> {
        let inner = self.inner.upgrade().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "runtime has shut down")
        })?;
        inner.await_io(self.token, direction, cx.waker().clone())
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.deregister_io(self.token);
        }
    }
}

/// Shared state between a `Sleep` future and its heap entry. The future
/// refreshes the waker on every poll; the reactor flips `fired` and wakes.
pub(crate) struct TimerSlot {
    pub(crate) fired: bool,
    pub(crate) waker: Option<Waker>,
}

pub(crate) struct TimerEntry {
    deadline: Instant,
    seq: u64,
    slot: Weak<RefCell<TimerSlot>>,
}

// Inverted ordering so the std max-heap pops the earliest deadline, and for
// equal deadlines the earliest registration.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl Inner {
    pub(crate) fn register_io(&self, raw: RawFd) -> io::Result<usize> {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.poller.add(raw, Event::none(token))?;
        self.io.borrow_mut().insert(
            token,
            IoSlot {
                raw,
                reader: None,
                writer: None,
            },
        );
        Ok(token)
    }

    pub(crate) fn deregister_io(&self, token: usize) {
        if let Some(slot) = self.io.borrow_mut().remove(&token) {
            if let Err(error) = self.poller.delete(slot.raw) {
                tracing::trace!(token, ?error, "deregistration failed");
            }
        }
    }

    pub(crate) fn await_io(
        &self,
        token: usize,
        direction: Direction,
        waker: Waker,
    ) -> io::Result<()> {
        let mut table = self.io.borrow_mut();
        let slot = table.get_mut(&token).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "handle is not registered")
        })?;
        let waiter = match direction {
            Direction::Read => &mut slot.reader,
            Direction::Write => &mut slot.writer,
        };
        if let Some(previous) = waiter {
            debug_assert!(
                previous.will_wake(&waker),
                "two concurrent {direction:?} waiters on one handle"
            );
        }
        *waiter = Some(waker);
        let interest = Event {
            key: token,
            readable: slot.reader.is_some(),
            writable: slot.writer.is_some(),
        };
        self.poller.modify(slot.raw, interest)
    }

    /// Wakes the waiters behind a batch of poll events. Waking only enqueues
    /// the owning tasks; they run in the next executor phase, so a woken
    /// task re-arming the same slot never re-enters this dispatch.
    pub(crate) fn dispatch(&self, events: &[Event]) {
        for event in events {
            let mut table = self.io.borrow_mut();
            let Some(slot) = table.get_mut(&event.key) else {
                continue;
            };
            if event.readable {
                if let Some(waker) = slot.reader.take() {
                    waker.wake();
                }
            }
            if event.writable {
                if let Some(waker) = slot.writer.take() {
                    waker.wake();
                }
            }
            if slot.reader.is_some() || slot.writer.is_some() {
                let interest = Event {
                    key: event.key,
                    readable: slot.reader.is_some(),
                    writable: slot.writer.is_some(),
                };
                if let Err(error) = self.poller.modify(slot.raw, interest) {
                    tracing::trace!(token = event.key, ?error, "re-arm failed");
                }
            }
        }
    }

    pub(crate) fn register_timer(&self, deadline: Instant, slot: &Rc<RefCell<TimerSlot>>) {
        let seq = self.timer_seq.get();
        self.timer_seq.set(seq + 1);
        self.timers.borrow_mut().push(TimerEntry {
            deadline,
            seq,
            slot: Rc::downgrade(slot),
        });
    }

    /// Pops and fires every timer whose deadline has passed, in deadline
    /// order (registration order for equal deadlines). Entries whose `Sleep`
    /// was dropped are discarded.
    pub(crate) fn fire_due_timers(&self) {
        let now = Instant::now();
        loop {
            let entry = {
                let mut heap = self.timers.borrow_mut();
                match heap.peek() {
                    Some(entry) if entry.deadline <= now => heap.pop(),
                    _ => None,
                }
            };
            let Some(entry) = entry else { return };
            if let Some(slot) = entry.slot.upgrade() {
                let waker = {
                    let mut slot = slot.borrow_mut();
                    slot.fired = true;
                    slot.waker.take()
                };
                if let Some(waker) = waker {
                    waker.wake();
                }
            }
        }
    }

    /// Time until the next live timer is due, or `None` when the heap holds
    /// no live entries (the poll may then block indefinitely).
    pub(crate) fn next_timeout(&self) -> Option<Duration> {
        let mut heap = self.timers.borrow_mut();
        loop {
            match heap.peek() {
                None => return None,
                Some(entry) if entry.slot.strong_count() == 0 => {
                    heap.pop();
                }
                Some(entry) => {
                    return Some(entry.deadline.saturating_duration_since(Instant::now()))
                }
            }
        }
    }
}
