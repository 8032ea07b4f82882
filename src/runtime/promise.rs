//! One-shot promise: a single-value synchronization slot.
//!
//! [`promise`] returns a connected pair: the [`Resolve`] half is handed to
//! whatever will produce the value (a timer continuation, another task, an
//! I/O completion) and the [`Promise`] half is awaited by the consumer. The
//! slot moves through exactly one resolve and one consume over its lifetime.

use std::cell::RefCell;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

enum Slot<T> {
    Empty,
    Waiting(Waker),
    Ready(T),
    Consumed,
    Closed,
}

/// Creates a connected resolver/consumer pair around one empty slot.
#[must_use]
pub fn promise<T>() -> (Resolve<T>, Promise<T>) {
    let slot = Rc::new(RefCell::new(Slot::Empty));
    (
        Resolve {
            slot: Some(Rc::clone(&slot)),
        },
        Promise { slot },
    )
}

/// The producing half of a promise.
///
/// Dropping a `Resolve` without calling [`Resolve::resolve`] closes the
/// slot; a consumer awaiting it at that point is woken and panics, since no
/// value can ever arrive.
pub struct Resolve<T> {
    slot: Option<Rc<RefCell<Slot<T>>>>,
}

impl<T> Resolve<T> {
    /// Stores the value. If the consumer is already waiting, its task is
    /// woken immediately (it runs in the current reactor cycle, never
    /// inline).
    pub fn resolve(mut self, value: T) {
        let Some(slot) = self.slot.take() else { return };
        let previous = mem::replace(&mut *slot.borrow_mut(), Slot::Ready(value));
        match previous {
            Slot::Empty => {}
            Slot::Waiting(waker) => waker.wake(),
            Slot::Ready(_) | Slot::Consumed | Slot::Closed => {
                debug_assert!(false, "promise resolved twice");
            }
        }
    }
}

impl<T> Drop for Resolve<T> {
    fn drop(&mut self) {
        let Some(slot) = self.slot.take() else { return };
        let mut state = slot.borrow_mut();
        if matches!(*state, Slot::Empty | Slot::Waiting(_)) {
            if let Slot::Waiting(waker) = mem::replace(&mut *state, Slot::Closed) {
                waker.wake();
            }
        }
    }
}

/// The consuming half of a promise. Awaiting it yields the resolved value.
pub struct Promise<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Promise<T> {
    /// Whether the value has been resolved and not yet consumed.
    #[must_use]
    pub fn ready(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Ready(_))
    }

    /// Moves the value out.
    ///
    /// # Panics
    ///
    /// Panics unless [`Promise::ready`] is true. Consuming before resolution
    /// is a programming error; awaiting the promise suspends instead.
    #[must_use]
    pub fn consume(self) -> T {
        match mem::replace(&mut *self.slot.borrow_mut(), Slot::Consumed) {
            Slot::Ready(value) => value,
            _ => panic!("promise consumed before it was resolved"),
        }
    }
}

impl<T> Future for Promise<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.slot.borrow_mut();
        match mem::replace(&mut *state, Slot::Consumed) {
            Slot::Ready(value) => Poll::Ready(value),
            Slot::Empty | Slot::Waiting(_) => {
                *state = Slot::Waiting(cx.waker().clone());
                Poll::Pending
            }
            Slot::Consumed => panic!("promise polled after completion"),
            Slot::Closed => panic!("promise abandoned without being resolved"),
        }
    }
}
