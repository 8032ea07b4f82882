//! Server-side WebSocket handshake validation.

use crate::http::Request;
use crate::status::{self, Result};
use base64::Engine;
use sha1::{Digest, Sha1};

/// RFC 6455 GUID appended to the client key before hashing.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the `Sec-WebSocket-Accept` value for a client key:
/// `base64(sha1(key ++ GUID))`.
///
/// ```
/// use skiff::net::websocket::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Validates an upgrade request and returns the accept key to answer with.
///
/// # Errors
///
/// Returns a client error naming the first failed check; the responder
/// turns it into a `400` and closes the connection.
pub(crate) fn validate_upgrade(request: &Request) -> Result<String> {
    if request.method != crate::http::Method::Get {
        return Err(status::client_error("websocket upgrade requires GET"));
    }

    let connection = request
        .header("connection")
        .ok_or_else(|| status::client_error("missing Connection header"))?;
    if !connection.to_ascii_lowercase().contains("upgrade") {
        return Err(status::client_error(
            "Connection header does not request an upgrade",
        ));
    }

    let upgrade = request
        .header("upgrade")
        .ok_or_else(|| status::client_error("missing Upgrade header"))?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(status::client_error("Upgrade header is not websocket"));
    }

    let version = request
        .header("sec-websocket-version")
        .ok_or_else(|| status::client_error("missing Sec-WebSocket-Version header"))?;
    if !version.contains("13") {
        return Err(status::client_error("unsupported websocket version"));
    }

    let key = request
        .header("sec-websocket-key")
        .filter(|key| !key.is_empty())
        .ok_or_else(|| status::client_error("missing Sec-WebSocket-Key header"))?;

    Ok(compute_accept_key(key))
}
