//! HTTP request and response types.

use crate::http::Uri;

/// Request method. Only the methods the server implements parse; anything
/// else is answered with `400` at the protocol boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl Method {
    /// Parses a method token from its ASCII representation.
    #[must_use]
    pub fn from_bytes(src: &[u8]) -> Option<Self> {
        match src {
            b"GET" => Some(Self::Get),
            b"POST" => Some(Self::Post),
            _ => None,
        }
    }

    /// The method as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully parsed request: method, split target, headers, and body bytes.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Split request target.
    pub uri: Uri,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// Body bytes; empty when the request carried no `Content-Length`.
    pub body: Vec<u8>,
}

impl Request {
    /// Looks up a header value by ASCII-case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A handler's answer: payload bytes and their content type. The sender
/// prepends the status line, `Content-Type`, and `Content-Length`.
#[derive(Debug, Clone)]
pub struct Response {
    /// Numeric status code; the reason phrase is derived from it.
    pub status: u16,
    /// Value for the `Content-Type` header.
    pub content_type: String,
    /// Payload bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// A response with the given status, content type, and payload.
    #[must_use]
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// A `200` plain-text response.
    #[must_use]
    pub fn text(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, "text/plain", body)
    }

    /// A `200` HTML response.
    #[must_use]
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, "text/html", body)
    }

    /// Replaces the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_methods_round_trip() {
        assert_eq!(Method::from_bytes(b"GET"), Some(Method::Get));
        assert_eq!(Method::from_bytes(b"POST"), Some(Method::Post));
        assert_eq!(Method::Get.as_str(), "GET");
    }

    #[test]
    fn unrecognized_methods_do_not_parse() {
        for token in [&b"PUT"[..], b"DELETE", b"get", b""] {
            assert_eq!(Method::from_bytes(token), None);
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = Request {
            method: Method::Get,
            uri: Uri::parse("/"),
            headers: vec![("Content-Type".into(), "text/plain".into())],
            body: Vec::new(),
        };
        assert_eq!(request.header("content-type"), Some("text/plain"));
        assert_eq!(request.header("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(request.header("content-length"), None);
    }

    #[test]
    fn response_builders() {
        let response = Response::text("hi");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.body, b"hi");

        let response = Response::html("<p>hi</p>").with_status(404);
        assert_eq!(response.status, 404);
        assert_eq!(response.content_type, "text/html");
    }
}
