//! End-to-end HTTP/1.1 behavior over real sockets.

mod common;

use common::{read_available, spawn_server};
use skiff::http::{Response, Server, ServerConfig};
use std::io::Write;
use std::net::{SocketAddr, TcpStream};

fn demo_routes() -> Server {
    Server::new()
        .route("/hello", |_request, responder| async move {
            let _ = responder.send(Response::text("hi")).await;
        })
        .route("/echo", |request, responder| async move {
            let _ = responder
                .send(Response::new(200, "application/octet-stream", request.body))
                .await;
        })
}

fn tight_limit_routes() -> Server {
    Server::new()
        .with_config(ServerConfig::default().max_body_size(16))
        .route("/hello", |_request, responder| async move {
            let _ = responder.send(Response::text("hi")).await;
        })
}

fn roundtrip(address: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(address).expect("connect");
    stream.write_all(request).expect("send request");
    read_available(&mut stream)
}

#[test]
fn get_happy_path() {
    let address = spawn_server(demo_routes);
    let response = roundtrip(
        address,
        b"GET /hello HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 200 ok\r\n"), "{response}");
    assert!(response.contains("Content-Type: text/plain\r\n"));
    assert!(response.contains("Content-Length: 2\r\n"));
    assert!(response.ends_with("\r\n\r\nhi"));
}

#[test]
fn post_body_round_trips() {
    let address = spawn_server(demo_routes);
    let response = roundtrip(
        address,
        b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
    );
    assert!(response.starts_with("HTTP/1.1 200 ok\r\n"), "{response}");
    assert!(response.contains("Content-Length: 5\r\n"));
    assert!(response.ends_with("\r\n\r\nhello"));
}

#[test]
fn unknown_path_is_404() {
    let address = spawn_server(demo_routes);
    let response = roundtrip(address, b"GET /missing HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 not_found\r\n"), "{response}");
    assert!(response.contains("/missing"), "body names the error: {response}");
}

#[test]
fn oversize_header_line_is_431() {
    let address = spawn_server(demo_routes);
    let mut request = b"GET /hello HTTP/1.1\r\n".to_vec();
    request.extend(std::iter::repeat(b'a').take(2048));
    let response = roundtrip(address, &request);
    assert!(
        response.starts_with("HTTP/1.1 431 request_header_fields_too_large\r\n"),
        "{response}"
    );
}

#[test]
fn unrecognized_method_is_400() {
    let address = spawn_server(demo_routes);
    let response = roundtrip(address, b"DELETE /hello HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 bad_request\r\n"), "{response}");
}

#[test]
fn whitespace_around_header_name_is_400() {
    let address = spawn_server(demo_routes);
    let response = roundtrip(address, b"GET /hello HTTP/1.1\r\nHost : x\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 bad_request\r\n"), "{response}");
}

#[test]
fn transfer_encoding_is_501() {
    let address = spawn_server(demo_routes);
    let response = roundtrip(
        address,
        b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 501 not_implemented\r\n"), "{response}");
}

#[test]
fn oversize_content_length_is_413() {
    let address = spawn_server(tight_limit_routes);
    let response = roundtrip(
        address,
        b"POST /hello HTTP/1.1\r\nContent-Length: 64\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 413 payload_too_large\r\n"), "{response}");
}

#[test]
fn one_request_per_connection() {
    let address = spawn_server(demo_routes);
    let mut stream = TcpStream::connect(address).expect("connect");
    stream
        .write_all(b"GET /hello HTTP/1.1\r\nContent-Length: 0\r\n\r\n")
        .expect("first request");
    let response = read_available(&mut stream);
    assert!(response.ends_with("hi"), "{response}");

    // the server closed after one exchange; a second request goes nowhere
    let followup = stream.write_all(b"GET /hello HTTP/1.1\r\n\r\n");
    let closed = followup.is_err() || read_available(&mut stream).is_empty();
    assert!(closed, "connection must not serve a second request");
}
