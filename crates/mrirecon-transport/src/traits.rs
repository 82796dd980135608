use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use crate::error::{Result, TransportError};

/// A blocking, all-or-nothing byte transport.
///
/// `write_exact` returns only after every byte was handed to the binding;
/// `read_exact` returns only after the whole buffer was filled. Partial
/// transfers surface as errors, never as short counts.
pub trait Transport {
    /// Write the whole buffer.
    fn write_exact(&mut self, buf: &[u8]) -> Result<()>;

    /// Fill the whole buffer.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_exact(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_exact(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }
}

/// Write all of `buf` to `writer`, retrying interrupted writes. A write that
/// would block or times out is an error.
pub(crate) fn write_all_to<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match writer.write(&buf[offset..]) {
            Ok(0) => {
                return Err(TransportError::Closed {
                    received: offset,
                    expected: buf.len(),
                })
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

/// Fill `buf` from `reader`. EOF before the buffer is full is `Closed`.
pub(crate) fn read_exact_from<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match reader.read(&mut buf[offset..]) {
            Ok(0) => {
                return Err(TransportError::Closed {
                    received: offset,
                    expected: buf.len(),
                })
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
    Ok(())
}

/// A connected socket stream.
///
/// Wraps either a TCP stream or, on Unix, a Unix domain stream.
pub struct Connection {
    inner: ConnectionInner,
}

enum ConnectionInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Transport for Connection {
    fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => write_all_to(stream, buf),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => write_all_to(stream, buf),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match &mut self.inner {
            ConnectionInner::Tcp(stream) => read_exact_from(stream, buf),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => read_exact_from(stream, buf),
        }
    }
}

impl Connection {
    /// Wrap a connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: ConnectionInner::Tcp(stream),
        }
    }

    /// Wrap a connected Unix domain stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ConnectionInner::Unix(stream),
        }
    }

    /// A connected pair of Unix streams, handy for in-process peers.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Shut down both directions of the stream.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream.shutdown(Shutdown::Both).map_err(Into::into),
            #[cfg(unix)]
            ConnectionInner::Unix(stream) => stream.shutdown(Shutdown::Both).map_err(Into::into),
        }
    }

    /// Human-readable peer address for logs.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            ConnectionInner::Tcp(stream) => stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "tcp:unknown".to_string()),
            #[cfg(unix)]
            ConnectionInner::Unix(_) => "unix".to_string(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            ConnectionInner::Tcp(_) => f.debug_struct("Connection").field("type", &"tcp").finish(),
            #[cfg(unix)]
            ConnectionInner::Unix(_) => {
                f.debug_struct("Connection").field("type", &"unix").finish()
            }
        }
    }
}
