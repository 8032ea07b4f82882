//! Path-keyed dispatch and the per-connection driver.

use crate::http::parser;
use crate::http::{Request, Response};
use crate::net::websocket::{handshake, WebSocket};
use crate::net::{Acceptor, Stream};
use crate::status::{self, http_status_domain, Canonical, Error, Result};
use std::cell::Cell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Protocol limits for a server. Defaults: 1 KiB header lines, 64 KiB for
/// the whole header section, 1 MiB bodies.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum length of a single header or request line.
    pub max_header_line: usize,
    /// Maximum bytes across the request line and all header lines.
    pub max_headers_size: usize,
    /// Maximum `Content-Length` accepted.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_header_line: 1024,
            max_headers_size: 64 * 1024,
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Sets the single-line cap.
    #[must_use]
    pub fn max_header_line(mut self, bytes: usize) -> Self {
        self.max_header_line = bytes;
        self
    }

    /// Sets the whole-header-section cap.
    #[must_use]
    pub fn max_headers_size(mut self, bytes: usize) -> Self {
        self.max_headers_size = bytes;
        self
    }

    /// Sets the body cap.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = ()>>>;
type Handler = Box<dyn Fn(Request, Responder) -> HandlerFuture>;

/// An HTTP/1.1 server: a map from exact path strings to handlers.
///
/// Each accepted connection serves one request. The handler receives the
/// parsed [`Request`] and a [`Responder`] it must use exactly once.
///
/// # Example
///
/// ```no_run
/// # use skiff::http::{Response, Server};
/// let server = Server::new().route("/hello", |_request, responder| async move {
///     let _ = responder.send(Response::text("hi")).await;
/// });
/// ```
#[derive(Default)]
pub struct Server {
    routes: HashMap<String, Handler>,
    config: ServerConfig,
}

impl Server {
    /// An empty server with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the protocol limits.
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a handler for an exact path.
    #[must_use]
    pub fn route<H, F>(mut self, path: impl Into<String>, handler: H) -> Self
    where
        H: Fn(Request, Responder) -> F + 'static,
        F: Future<Output = ()> + 'static,
    {
        self.routes.insert(
            path.into(),
            Box::new(move |request, responder| Box::pin(handler(request, responder))),
        );
        self
    }

    /// Accept loop: serves each connection as its own detached task.
    ///
    /// # Errors
    ///
    /// Transient accept failures are logged and the loop continues; any
    /// other accept failure ends the loop with the error.
    pub async fn serve(self, acceptor: Acceptor) -> Result<()> {
        let routes = Rc::new(self.routes);
        let config = Rc::new(self.config);
        loop {
            match acceptor.accept().await {
                Ok(stream) => {
                    let connection = Connection {
                        routes: Rc::clone(&routes),
                        config: Rc::clone(&config),
                    };
                    drop(crate::runtime::spawn(connection.run(stream)));
                }
                Err(error) if error.canonical() == Canonical::TransientError => {
                    tracing::warn!(%error, "transient accept failure");
                }
                Err(error) => {
                    tracing::error!(%error, "accept failed");
                    return Err(error);
                }
            }
        }
    }
}

struct Connection {
    routes: Rc<HashMap<String, Handler>>,
    config: Rc<ServerConfig>,
}

impl Connection {
    /// Drives one connection through its states: read the request, run the
    /// handler (or answer 404), make sure exactly one response went out,
    /// shut down.
    async fn run(self, stream: Stream) {
        let stream = Rc::new(stream);

        let request = match parser::read_request(&stream, &self.config).await {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(%error, "request rejected");
                send_error_response(&stream, &error).await;
                let _ = stream.shutdown();
                return;
            }
        };

        let responded = Rc::new(Cell::new(false));
        match self.routes.get(request.uri.path()) {
            Some(handler) => {
                tracing::debug!(method = %request.method, path = request.uri.path(), "dispatch");
                let responder = Responder {
                    stream: Rc::clone(&stream),
                    responded: Rc::clone(&responded),
                };
                handler(request, responder).await;
                if !responded.get() {
                    debug_assert!(false, "handler finished without responding");
                    let error = status::http_error(500, "handler produced no response");
                    send_error_response(&stream, &error).await;
                }
            }
            None => {
                let error = status::http_error(
                    404,
                    format!("no handler for {:?}", request.uri.path()),
                );
                send_error_response(&stream, &error).await;
            }
        }
        let _ = stream.shutdown();
    }
}

/// Single-use reply channel for one request.
///
/// Consuming methods enforce the respond-exactly-once contract; a handler
/// that drops its responder unanswered is caught by the connection driver,
/// which asserts in debug builds and answers `500` in release builds.
pub struct Responder {
    stream: Rc<Stream>,
    responded: Rc<Cell<bool>>,
}

impl Responder {
    /// Sends the response: status line with the code's reason, then
    /// `Content-Type` and `Content-Length`, then the payload.
    ///
    /// # Errors
    ///
    /// Transport errors pass through; the connection is dropped without a
    /// retry.
    pub async fn send(self, response: Response) -> Result<()> {
        self.responded.set(true);
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            response.status,
            reason(response.status),
            response.content_type,
            response.body.len(),
        );
        self.stream.write_all(head.as_bytes()).await?;
        self.stream.write_all(&response.body).await
    }

    /// Switches the connection into WebSocket mode.
    ///
    /// Validates the upgrade request; on success answers
    /// `101 Switching Protocols` and returns the frame-level connection. On
    /// failure answers `400` with a plain-text body naming the failed check
    /// and returns the error, so the handler can simply return.
    ///
    /// # Errors
    ///
    /// The validation error, or a transport error from writing either
    /// answer.
    pub async fn upgrade(self, request: &Request) -> Result<WebSocket> {
        match handshake::validate_upgrade(request) {
            Ok(accept) => {
                self.responded.set(true);
                let head = format!(
                    "HTTP/1.1 101 {}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
                     Sec-WebSocket-Accept: {accept}\r\n\r\n",
                    reason(101),
                );
                self.stream.write_all(head.as_bytes()).await?;
                Ok(WebSocket::from_shared(self.stream))
            }
            Err(error) => {
                tracing::debug!(%error, "websocket upgrade rejected");
                self.responded.set(true);
                send_error_response(&self.stream, &error).await;
                Err(error)
            }
        }
    }
}

/// Maps an error to the response code it is answered with: `http_status`
/// codes pass through, client-side categories become `400`, the rest `500`.
fn response_code_for(error: &Error) -> u16 {
    if error.status().domain().id() == http_status_domain().id() {
        u16::try_from(error.code()).unwrap_or(500)
    } else {
        match error.canonical() {
            Canonical::ClientError | Canonical::NotAvailable | Canonical::Exhausted => 400,
            _ => 500,
        }
    }
}

fn reason(code: u16) -> std::borrow::Cow<'static, str> {
    http_status_domain().code_name(i64::from(code))
}

/// Best-effort error answer; the body is the rendered error. Write
/// failures are logged and swallowed, the connection is closing anyway.
async fn send_error_response(stream: &Stream, error: &Error) {
    let code = response_code_for(error);
    let body = error.to_string();
    let head = format!(
        "HTTP/1.1 {code} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n",
        reason(code),
        body.len(),
    );
    let result = async {
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(body.as_bytes()).await
    };
    if let Err(write_error) = result.await {
        tracing::debug!(%write_error, "failed to send error response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes_pass_through() {
        assert_eq!(response_code_for(&status::http_error(404, "x")), 404);
        assert_eq!(response_code_for(&status::http_error(431, "x")), 431);
        assert_eq!(response_code_for(&status::http_error(501, "x")), 501);
    }

    #[test]
    fn canonical_categories_map_to_400_or_500() {
        assert_eq!(response_code_for(&status::client_error("x")), 400);
        assert_eq!(response_code_for(&status::not_available("x")), 400);
        assert_eq!(response_code_for(&status::exhausted("x")), 400);
        assert_eq!(response_code_for(&status::transient_error("x")), 500);
        assert_eq!(response_code_for(&status::permanent_error("x")), 500);
        assert_eq!(response_code_for(&status::unknown_error("x")), 500);
    }

    #[test]
    fn errno_errors_map_by_category() {
        let reset = Error::from(std::io::Error::from_raw_os_error(libc::ECONNRESET));
        assert_eq!(response_code_for(&reset), 400);
        let nomem = Error::from(std::io::Error::from_raw_os_error(libc::ENOMEM));
        assert_eq!(response_code_for(&nomem), 500);
    }

    #[test]
    fn reasons_are_domain_names() {
        assert_eq!(reason(200), "ok");
        assert_eq!(reason(404), "not_found");
        assert_eq!(reason(101), "switching_protocols");
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::default()
            .max_header_line(2048)
            .max_headers_size(8192)
            .max_body_size(512);
        assert_eq!(config.max_header_line, 2048);
        assert_eq!(config.max_headers_size, 8192);
        assert_eq!(config.max_body_size, 512);
    }
}
