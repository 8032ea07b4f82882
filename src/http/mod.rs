//! HTTP/1.1 request pipeline.
//!
//! One request per connection: the server parses the request line, headers,
//! and body, dispatches on the exact request path, and the handler answers
//! through a single-use [`Responder`] or upgrades the connection to
//! WebSocket.

mod parser;
mod server;
mod types;
mod uri;

pub use server::{Responder, Server, ServerConfig};
pub use types::{Method, Request, Response};
pub use uri::Uri;
