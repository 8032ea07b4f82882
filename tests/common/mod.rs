//! Shared helpers for the end-to-end suites.
//!
//! The server runtime is single-threaded, so each test boots it on a
//! dedicated thread and talks to it with blocking std sockets.

use skiff::http::Server;
use skiff::runtime::Runtime;
use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc;
use std::thread;

/// Starts `routes()` on a fresh runtime thread bound to an ephemeral
/// loopback port and returns the bound address. The server thread is left
/// serving for the rest of the test process.
pub fn spawn_server(routes: fn() -> Server) -> SocketAddr {
    let (address_tx, address_rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = Runtime::new().expect("create runtime");
        let served = runtime.block_on(async move {
            let acceptor = skiff::net::bind("127.0.0.1", 0).expect("bind");
            let address = acceptor.local_addr().expect("local addr");
            address_tx.send(address).expect("announce address");
            routes().serve(acceptor).await
        });
        if let Ok(Err(error)) = served {
            panic!("serve failed: {error}");
        }
    });
    address_rx.recv().expect("server address")
}

/// Reads until EOF or a connection error, returning whatever arrived.
/// Servers answering a protocol violation may reset the connection right
/// after the response; the bytes already received still count.
pub fn read_available(stream: &mut TcpStream) -> String {
    let mut bytes = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(count) => bytes.extend_from_slice(&chunk[..count]),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
