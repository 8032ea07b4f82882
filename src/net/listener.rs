//! Listening socket and acceptor.

use crate::net::{addr, Stream};
use crate::runtime::reactor::{Direction, Registration};
use crate::status::Result;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::poll_fn;
use std::io;
use std::net::{self, SocketAddr};
use std::os::fd::AsRawFd;
use std::task::Poll;

/// Listen backlog. Small; the reactor drains accepts promptly.
const BACKLOG: i32 = 64;

/// Binds a listening socket on `host:port` and registers it with the
/// runtime running on this thread.
///
/// The socket is created in the resolved address family with address reuse
/// enabled and switched to non-blocking mode before it starts listening.
/// When the name resolves to several addresses, each is tried in order.
///
/// # Errors
///
/// Fails on resolution failure or when no resolved address accepts the
/// bind.
pub fn bind(host: &str, port: u16) -> Result<Acceptor> {
    let mut last_error = None;
    for address in addr::resolve(host, port)? {
        match bind_address(address) {
            Ok(acceptor) => return Ok(acceptor),
            Err(error) => {
                tracing::debug!(%address, %error, "bind attempt failed");
                last_error = Some(error);
            }
        }
    }
    // resolve() yields at least one address, so an error was recorded
    Err(last_error.unwrap_or_else(|| crate::status::not_available("bind failed")))
}

fn bind_address(address: SocketAddr) -> Result<Acceptor> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&address.into())?;
    socket.listen(BACKLOG)?;
    let inner: net::TcpListener = socket.into();
    let registration = Registration::new(inner.as_raw_fd())?;
    Ok(Acceptor {
        registration,
        inner,
    })
}

/// An owned listening endpoint; yields connected [`Stream`]s.
pub struct Acceptor {
    // declared before the socket so drop deregisters before the fd closes
    registration: Registration,
    inner: net::TcpListener,
}

impl Acceptor {
    /// Accepts the next connection, registered with the same runtime.
    ///
    /// # Errors
    ///
    /// Resolves with the system error when the accept fails.
    pub async fn accept(&self) -> Result<Stream> {
        let (stream, peer) = poll_fn(|cx| match self.inner.accept() {
            Ok(pair) => Poll::Ready(Ok(pair)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                match self.registration.await_ready(Direction::Read, cx) {
                    Ok(()) => Poll::Pending,
                    Err(error) => Poll::Ready(Err(error)),
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Err(error) => Poll::Ready(Err(error)),
        })
        .await?;
        tracing::debug!(%peer, "accepted connection");
        Stream::from_std(stream)
    }

    /// The bound local address; useful after binding port zero.
    ///
    /// # Errors
    ///
    /// Returns the system error.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }
}
