use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Connection;

/// TCP listening socket.
///
/// Provides bind/accept for the reconstruction server and a `connect`
/// helper for clients.
pub struct TcpSocket {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TcpSocket {
    /// Bind and listen on `addr`. Port 0 picks an ephemeral port.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(%addr, "listening on tcp socket");

        Ok(Self { listener, addr })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Connection> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(Connection::from_tcp(stream))
    }

    /// Connect to a listening server (blocking).
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Connection> {
        let label = addr.to_string();
        let stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            addr: label.clone(),
            source,
        })?;
        debug!(addr = %label, "connected to tcp socket");
        Ok(Connection::from_tcp(stream))
    }

    /// The address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Raw descriptor of the listener, for closing it in forked children.
    #[cfg(unix)]
    pub fn as_raw_fd(&self) -> std::os::fd::RawFd {
        use std::os::fd::AsRawFd;
        self.listener.as_raw_fd()
    }
}

impl std::fmt::Debug for TcpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSocket").field("addr", &self.addr).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::traits::Transport;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[test]
    fn bind_accept_connect() {
        let socket = TcpSocket::bind(loopback()).unwrap();
        let addr = socket.local_addr();
        assert_ne!(addr.port(), 0);

        let client = std::thread::spawn(move || {
            let mut conn = TcpSocket::connect(addr).unwrap();
            conn.write_exact(b"hello").unwrap();
            let mut reply = [0u8; 2];
            conn.read_exact(&mut reply).unwrap();
            reply
        });

        let mut server = socket.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        server.write_exact(b"ok").unwrap();

        assert_eq!(&client.join().unwrap(), b"ok");
    }

    #[test]
    fn connect_refused_is_connect_error() {
        let addr = {
            let socket = TcpSocket::bind(loopback()).unwrap();
            socket.local_addr()
        };
        let err = TcpSocket::connect(addr).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    fn bind_conflict_is_bind_error() {
        let first = TcpSocket::bind(loopback()).unwrap();
        let err = TcpSocket::bind(first.local_addr()).unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
    }
}
