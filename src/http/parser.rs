//! Request parsing: bounded CRLF line reading, request line, headers, body.
//!
//! Lines are read a byte at a time; correctness over throughput. Every
//! parse failure is an [`Error`] carrying an `http_status` code so the
//! connection driver can answer mechanically.

use crate::http::server::ServerConfig;
use crate::http::{Method, Request, Uri};
use crate::net::Stream;
use crate::status::{http_error, Error, Result};

/// Reads CRLF-terminated lines, enforcing the per-line cap and the running
/// total across the whole header section.
struct LineReader<'a> {
    stream: &'a Stream,
    config: &'a ServerConfig,
    total: usize,
}

impl LineReader<'_> {
    async fn read_line(&mut self) -> Result<String> {
        let mut line: Vec<u8> = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            if self.stream.read_some(&mut byte).await? == 0 {
                return Err(http_error(400, "connection closed mid-request"));
            }
            self.total += 1;
            if self.total > self.config.max_headers_size {
                return Err(http_error(431, "request head too large"));
            }
            if byte[0] == b'\n' && line.last() == Some(&b'\r') {
                line.pop();
                break;
            }
            line.push(byte[0]);
            if line.len() > self.config.max_header_line {
                return Err(http_error(431, "header line too long"));
            }
        }
        String::from_utf8(line).map_err(|_| http_error(400, "header line is not valid text"))
    }
}

fn parse_request_line(line: &str) -> Result<(Method, Uri)> {
    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(http_error(400, "malformed request line"));
    };
    let method = Method::from_bytes(method.as_bytes())
        .ok_or_else(|| http_error(400, format!("unrecognized method {method:?}")))?;
    if version != "HTTP/1.1" {
        return Err(http_error(400, format!("unsupported version {version:?}")));
    }
    Ok((method, Uri::parse(target)))
}

fn parse_header_line(line: &str) -> Result<(String, String)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| http_error(400, "header line has no colon"))?;
    if name.is_empty() || name.trim() != name {
        return Err(http_error(400, "whitespace around header name"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

/// Reads and parses one request from the stream: request line, headers,
/// then exactly `Content-Length` body bytes.
pub(crate) async fn read_request(stream: &Stream, config: &ServerConfig) -> Result<Request> {
    let mut lines = LineReader {
        stream,
        config,
        total: 0,
    };

    let (method, uri) = parse_request_line(&lines.read_line().await?)?;

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let line = lines.read_line().await?;
        if line.is_empty() {
            break;
        }
        let (name, value) = parse_header_line(&line)?;
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .parse()
                .map_err(|_| http_error(400, format!("invalid Content-Length {value:?}")))?;
            if content_length > config.max_body_size {
                return Err(http_error(413, "request payload too large"));
            }
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            return Err(http_error(501, "transfer encodings are not implemented"));
        }
        headers.push((name, value));
    }

    let mut body = vec![0u8; content_length];
    stream
        .read_exact(&mut body)
        .await
        .map_err(truncated_body_error)?;

    Ok(Request {
        method,
        uri,
        headers,
        body,
    })
}

fn truncated_body_error(error: Error) -> Error {
    match error.canonical() {
        crate::status::Canonical::Exhausted => http_error(400, "request body shorter than Content-Length"),
        _ => error,
    }
}

/// Re-serializes a parsed request head with canonical whitespace: single
/// spaces in the request line, `name: value` headers, CRLF line endings.
#[cfg(test)]
pub(crate) fn serialize_head(request: &Request) -> String {
    use std::fmt::Write as _;

    let mut target = request.uri.path().to_owned();
    if !request.uri.query().is_empty() {
        target.push('?');
        target.push_str(request.uri.query());
    }
    let mut head = format!("{} {target} HTTP/1.1\r\n", request.method);
    for (name, value) in &request.headers {
        let _ = write!(head, "{name}: {value}\r\n");
    }
    head.push_str("\r\n");
    head
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_happy_path() {
        let (method, uri) = parse_request_line("GET /hello HTTP/1.1").expect("parse");
        assert_eq!(method, Method::Get);
        assert_eq!(uri.path(), "/hello");

        let (method, uri) = parse_request_line("POST /submit?x=1 HTTP/1.1").expect("parse");
        assert_eq!(method, Method::Post);
        assert_eq!(uri.path(), "/submit");
        assert_eq!(uri.query(), "x=1");
    }

    #[test]
    fn request_line_rejections() {
        let cases = [
            ("PUT /x HTTP/1.1", 400),
            ("GET /x HTTP/1.0", 400),
            ("GET /x", 400),
            ("GET  /x HTTP/1.1", 400),
            ("GET /x HTTP/1.1 extra", 400),
            ("", 400),
        ];
        for (line, expected) in cases {
            let error = parse_request_line(line).expect_err(line);
            assert_eq!(error.code(), i64::from(expected), "{line:?}");
        }
    }

    #[test]
    fn header_line_happy_path() {
        assert_eq!(
            parse_header_line("Host: example.test").expect("parse"),
            ("Host".to_owned(), "example.test".to_owned())
        );
        // OWS around the value is trimmed
        assert_eq!(
            parse_header_line("Accept:  text/plain  ").expect("parse"),
            ("Accept".to_owned(), "text/plain".to_owned())
        );
        // empty value is allowed
        assert_eq!(
            parse_header_line("X-Empty:").expect("parse"),
            ("X-Empty".to_owned(), String::new())
        );
    }

    #[test]
    fn header_line_rejections() {
        for line in ["no colon here", " Host: x", "Host : x", ": x"] {
            assert!(parse_header_line(line).is_err(), "{line:?}");
        }
    }

    #[test]
    fn parsed_head_reserializes_canonically() {
        let request = Request {
            method: Method::Get,
            uri: Uri::parse("/hello"),
            headers: vec![
                ("Host".to_owned(), "x".to_owned()),
                ("Accept".to_owned(), "text/plain".to_owned()),
            ],
            body: Vec::new(),
        };
        assert_eq!(
            serialize_head(&request),
            "GET /hello HTTP/1.1\r\nHost: x\r\nAccept: text/plain\r\n\r\n"
        );
    }

    #[test]
    fn reserialization_keeps_the_query() {
        let request = Request {
            method: Method::Post,
            uri: Uri::parse("/submit?x=1"),
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert_eq!(serialize_head(&request), "POST /submit?x=1 HTTP/1.1\r\n\r\n");
    }
}
