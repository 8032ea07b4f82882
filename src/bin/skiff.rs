//! Engine binary: serves the built-in demo routes over HTTP and WebSocket.

use clap::Parser;
use skiff::http::{Response, Server};
use skiff::net::websocket::Opcode;
use skiff::runtime::Runtime;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Receive buffer for demo WebSocket frames.
const ECHO_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[command(name = "skiff", version, about = "Single-threaded HTTP/WebSocket engine")]
struct Args {
    /// Port to listen on, or host when a port follows.
    first: Option<String>,

    /// Port to listen on when a host is given.
    second: Option<u16>,
}

impl Args {
    /// `skiff` listens on 0.0.0.0:8000; `skiff PORT` overrides the port;
    /// `skiff HOST PORT` overrides both.
    fn host_port(self) -> Result<(String, u16), String> {
        match (self.first, self.second) {
            (None, _) => Ok(("0.0.0.0".to_owned(), 8000)),
            (Some(port), None) => port
                .parse()
                .map(|port| ("0.0.0.0".to_owned(), port))
                .map_err(|_| format!("invalid port {port:?}")),
            (Some(host), Some(port)) => Ok((host, port)),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (host, port) = match Args::parse().host_port() {
        Ok(pair) => pair,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("reactor initialization failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    let served = runtime.block_on(async move {
        let acceptor = skiff::net::bind(&host, port)?;
        tracing::info!(%host, port, "listening");
        demo_server().serve(acceptor).await
    });

    match served {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(error)) | Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn demo_server() -> Server {
    Server::new()
        .route("/hello", |_request, responder| async move {
            if let Err(error) = responder.send(Response::text("hi")).await {
                tracing::debug!(%error, "response failed");
            }
        })
        .route("/demo", |request, responder| async move {
            let socket = match responder.upgrade(&request).await {
                Ok(socket) => socket,
                Err(_) => return,
            };
            let mut buffer = vec![0u8; ECHO_BUFFER_SIZE];
            loop {
                match socket.recv(&mut buffer).await {
                    Ok((Opcode::Close, _)) => break,
                    Ok((opcode @ (Opcode::Text | Opcode::Binary), payload)) => {
                        if let Err(error) = socket.send(opcode, payload).await {
                            tracing::debug!(%error, "echo send failed");
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::debug!(%error, "websocket receive failed");
                        break;
                    }
                }
            }
        })
}
