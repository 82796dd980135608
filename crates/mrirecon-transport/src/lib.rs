//! Blocking byte transports for the reconstruction protocol.
//!
//! Every binding implements [`Transport`]: `write_exact` and `read_exact`
//! either move the whole buffer or fail. Available bindings:
//! - TCP sockets ([`TcpSocket`], [`Connection`])
//! - Unix stream sockets ([`Connection::from_unix`])
//! - Files, pipes and stdio ([`FileTransport`])
//!
//! This is the lowest layer of mrirecon. The frame channel builds on it.

pub mod error;
pub mod file;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use file::FileTransport;
pub use tcp::TcpSocket;
pub use traits::{Connection, Transport};
