//! Non-blocking networking primitives.
//!
//! Sockets register with the runtime's reactor at construction and
//! deregister on drop. Every descriptor has exactly one owner; the reactor
//! holds only back-references that are removed before the owner closes.

mod addr;
mod listener;
mod stream;
pub mod websocket;

pub use addr::resolve;
pub use listener::{bind, Acceptor};
pub use stream::Stream;
