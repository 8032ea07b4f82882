//! Skiff: a single-threaded, event-driven I/O engine.
//!
//! The crate is built around a reactor that multiplexes timers and socket
//! readiness on one thread. Request handlers are plain `async fn`s driven by
//! the reactor's executor; suspension points are the socket operations, the
//! timer futures, and the one-shot [`runtime::Promise`].
//!
//! # Layers
//!
//! - [`status`]: domain-tagged status codes and the crate's `Error`/`Result`
//! - [`runtime`]: the reactor, task spawning, and promise primitives
//! - [`time`]: sleep and timeout futures backed by the reactor's timer heap
//! - [`net`]: non-blocking streams and acceptors, plus WebSocket framing
//! - [`http`]: HTTP/1.1 request parsing, routing, and response emission
//!
//! # Example
//!
//! ```no_run
//! use skiff::http::{Response, Server};
//! use skiff::runtime::Runtime;
//!
//! fn main() -> skiff::Result<()> {
//!     let runtime = Runtime::new()?;
//!     runtime.block_on(async {
//!         let acceptor = skiff::net::bind("127.0.0.1", 8000)?;
//!         Server::new()
//!             .route("/hello", |_request, responder| async move {
//!                 let _ = responder.send(Response::text("hi")).await;
//!             })
//!             .serve(acceptor)
//!             .await
//!     })?
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod http;
pub mod net;
pub mod runtime;
pub mod status;
pub mod time;

pub use runtime::{spawn, JoinHandle, Runtime};
pub use status::{Error, Result, Status};
