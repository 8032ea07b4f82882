//! WebSocket upgrade and framing (RFC 6455, unfragmented subset).
//!
//! An HTTP handler upgrades its connection through
//! [`Responder::upgrade`](crate::http::Responder::upgrade), which validates
//! the handshake, answers `101`, and hands back a [`WebSocket`] exchanging
//! whole frames.
//!
//! Out of scope: fragmented messages, the close handshake and its status
//! codes, ping/pong timers, and per-message compression.

mod frame;
pub(crate) mod handshake;

pub use frame::{apply_mask, Opcode, WebSocket};
pub use handshake::compute_accept_key;
