//! Non-blocking byte stream.

use crate::runtime::reactor::{Direction, Registration};
use crate::status::{self, Result};
use std::future::poll_fn;
use std::io::{self, Read, Write};
use std::net::{self, Shutdown, SocketAddr};
use std::os::fd::AsRawFd;
use std::task::{Context, Poll};

/// An owned, non-blocking TCP endpoint registered with the current runtime.
///
/// Operations take `&self`; per-direction waiter state lives in the reactor,
/// and within one stream reads and writes are independently serialized (one
/// waiter per direction at a time).
pub struct Stream {
    // declared before the socket so drop deregisters before the fd closes
    registration: Registration,
    inner: net::TcpStream,
}

impl Stream {
    /// Adopts a std stream: switches it to non-blocking mode and registers
    /// it with the runtime running on this thread.
    ///
    /// # Errors
    ///
    /// Fails if the socket cannot be made non-blocking or registered.
    pub fn from_std(inner: net::TcpStream) -> Result<Self> {
        inner.set_nonblocking(true)?;
        let registration = Registration::new(inner.as_raw_fd())?;
        Ok(Self {
            registration,
            inner,
        })
    }

    /// Reads once, resolving with the number of bytes placed at the front
    /// of `buffer`. Zero means the peer closed cleanly (or the buffer was
    /// empty).
    ///
    /// # Errors
    ///
    /// Resolves with the system error on failure.
    pub async fn read_some(&self, buffer: &mut [u8]) -> Result<usize> {
        poll_fn(|cx| self.poll_io(Direction::Read, cx, |stream| (&stream.inner).read(buffer))).await
    }

    /// Writes once, resolving with the number of bytes consumed from the
    /// front of `buffer`. A successful write of a non-empty buffer always
    /// makes progress.
    ///
    /// # Errors
    ///
    /// Resolves with the system error on failure.
    pub async fn write_some(&self, buffer: &[u8]) -> Result<usize> {
        poll_fn(|cx| self.poll_io(Direction::Write, cx, |stream| (&stream.inner).write(buffer)))
            .await
    }

    /// Reads until `buffer` is full.
    ///
    /// # Errors
    ///
    /// Resolves with an `exhausted` error when the peer closes before the
    /// buffer fills, or with the system error.
    pub async fn read_exact(&self, buffer: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buffer.len() {
            let count = self.read_some(&mut buffer[filled..]).await?;
            if count == 0 {
                return Err(status::exhausted(format!(
                    "peer closed after {filled} of {} bytes",
                    buffer.len()
                )));
            }
            filled += count;
        }
        Ok(())
    }

    /// Writes the whole buffer.
    ///
    /// # Errors
    ///
    /// Resolves with the system error; a closed peer surfaces as a broken
    /// pipe or reset from the write syscall.
    pub async fn write_all(&self, buffer: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < buffer.len() {
            written += self.write_some(&buffer[written..]).await?;
        }
        Ok(())
    }

    /// Shuts down both directions of the connection.
    ///
    /// # Errors
    ///
    /// Returns the system error when the socket rejects the shutdown.
    pub fn shutdown(&self) -> Result<()> {
        self.inner.shutdown(Shutdown::Both)?;
        Ok(())
    }

    /// Local address of the socket.
    ///
    /// # Errors
    ///
    /// Returns the system error.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Peer address of the socket.
    ///
    /// # Errors
    ///
    /// Returns the system error.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.peer_addr()?)
    }

    /// One non-blocking attempt: try the syscall, park a waiter and re-arm
    /// the one-shot subscription on `WouldBlock`, retry promptly on an
    /// interrupt.
    fn poll_io(
        &self,
        direction: Direction,
        cx: &mut Context<'_>,
        mut operation: impl FnMut(&Self) -> io::Result<usize>,
    ) -> Poll<Result<usize>> {
        match operation(self) {
            Ok(count) => Poll::Ready(Ok(count)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                match self.registration.await_ready(direction, cx) {
                    Ok(()) => Poll::Pending,
                    Err(error) => Poll::Ready(Err(error.into())),
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Err(error) => Poll::Ready(Err(error.into())),
        }
    }
}
