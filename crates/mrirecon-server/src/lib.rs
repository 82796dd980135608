//! Reconstruction server: one session per connection.
//!
//! A session receives a request, a data header and a measurement stream,
//! loads and configures the named pipeline, runs it and answers with an
//! acknowledgement and, on success, the reconstructed dataset.

pub mod config;
pub mod connector;
pub mod error;
pub mod listener;
pub mod session;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use connector::{ReconClient, ReconResponse};
pub use error::{ClientError, Result, ServerError, SessionError};
pub use listener::ReconServer;
pub use session::{ServerContext, Session, SessionReport, SessionState};
